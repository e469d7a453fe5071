use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Connective joining a condition to the ones before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    And,
    Or,
    Intersection,
}

impl BooleanOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BooleanOperator::And => "and",
            BooleanOperator::Or => "or",
            BooleanOperator::Intersection => "intersection",
        }
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BooleanOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(BooleanOperator::And),
            "or" => Ok(BooleanOperator::Or),
            "intersection" => Ok(BooleanOperator::Intersection),
            other => Err(format!("unknown boolean operator: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub attribute: String,
    pub direction: Direction,
}

/// A structured predicate with optional sort and limit.
///
/// Built fluently from a leading condition:
///
/// ```
/// use attrmap_query::{Condition, Direction, QueryExpression};
///
/// let expr = QueryExpression::where_(Condition::ge("price", 100))
///     .and(Condition::like("title", "Rust%"))
///     .order_by("price", Direction::Desc)
///     .limit(10);
/// assert_eq!(expr.conditions().count(), 2);
/// ```
///
/// The expression is only validated when compiled.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryExpression {
    first: Condition,
    rest: Vec<(BooleanOperator, Condition)>,
    sort: Option<Sort>,
    limit: u32,
}

impl QueryExpression {
    pub fn where_(condition: Condition) -> Self {
        Self {
            first: condition,
            rest: Vec::new(),
            sort: None,
            limit: 0,
        }
    }

    pub fn and(self, condition: Condition) -> Self {
        self.chain(BooleanOperator::And, condition)
    }

    pub fn or(self, condition: Condition) -> Self {
        self.chain(BooleanOperator::Or, condition)
    }

    pub fn intersection(self, condition: Condition) -> Self {
        self.chain(BooleanOperator::Intersection, condition)
    }

    pub fn chain(mut self, op: BooleanOperator, condition: Condition) -> Self {
        self.rest.push((op, condition));
        self
    }

    pub fn order_by(mut self, attribute: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some(Sort {
            attribute: attribute.into(),
            direction,
        });
        self
    }

    /// Cap the number of items per page. `0` leaves it to the store.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn first(&self) -> &Condition {
        &self.first
    }

    /// Chained conditions with their connectives, in order.
    pub fn chained(&self) -> &[(BooleanOperator, Condition)] {
        &self.rest
    }

    /// Every condition, leading one first.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, c)| c))
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn limit_value(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order_and_connectives() {
        let expr = QueryExpression::where_(Condition::eq("a", "1"))
            .or(Condition::eq("b", "2"))
            .intersection(Condition::is_null("c"));
        let attrs: Vec<_> = expr.conditions().map(|c| c.attribute.as_str()).collect();
        assert_eq!(attrs, vec!["a", "b", "c"]);
        let ops: Vec<_> = expr.chained().iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![BooleanOperator::Or, BooleanOperator::Intersection]);
        assert_eq!(expr.limit_value(), 0);
        assert!(expr.sort().is_none());
    }

    #[test]
    fn boolean_operator_parses() {
        assert_eq!("AND".parse::<BooleanOperator>().unwrap(), BooleanOperator::And);
        assert!("xor".parse::<BooleanOperator>().is_err());
    }
}
