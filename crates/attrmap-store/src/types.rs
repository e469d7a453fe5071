use serde::{Deserialize, Serialize};

/// Attribute name under which a `count(*)` select reports its result.
pub const COUNT_ATTRIBUTE: &str = "Count";

/// A single `(name, value)` pair of an item.
///
/// Multi-valued attributes are represented as several pairs sharing a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An item returned by a select: its key plus all of its attribute pairs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl Item {
    /// All values stored under `name`.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// Precondition for a conditional write: `attribute` must currently hold
/// exactly `expected`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    pub attribute: String,
    pub expected: String,
}

impl Precondition {
    pub fn equals(attribute: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            expected: expected.into(),
        }
    }
}

/// Read consistency requested from the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Reads reflect every write that completed before the read.
    #[default]
    Strong,
    /// Reads may lag recent writes.
    Eventual,
}

impl Consistency {
    pub fn is_strong(self) -> bool {
        matches!(self, Consistency::Strong)
    }
}

/// A select call: the query text plus an optional continuation token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectRequest {
    pub query: String,
    pub consistency: Consistency,
    pub next_token: Option<String>,
}

impl SelectRequest {
    pub fn new(query: impl Into<String>, consistency: Consistency) -> Self {
        Self {
            query: query.into(),
            consistency,
            next_token: None,
        }
    }

    pub fn with_next_token(mut self, token: Option<String>) -> Self {
        self.next_token = token;
        self
    }
}

/// One page of select results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectPage {
    pub items: Vec<Item>,
    /// Token for the next page; `None` when the result set is exhausted.
    pub next_token: Option<String>,
}
