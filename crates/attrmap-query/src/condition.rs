use std::fmt;
use std::str::FromStr;

use attrmap_types::ScalarValue;
use serde::{Deserialize, Serialize};

/// Pseudo-attribute naming the item key itself. Never quoted when rendered.
pub const KEY_ATTRIBUTE: &str = "itemName()";

/// Comparison operators supported by the select grammar.
///
/// `BETWEEN` and `IN` are not part of the supported subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 10] = [
        ComparisonOperator::Eq,
        ComparisonOperator::Ne,
        ComparisonOperator::Gt,
        ComparisonOperator::Ge,
        ComparisonOperator::Lt,
        ComparisonOperator::Le,
        ComparisonOperator::Like,
        ComparisonOperator::NotLike,
        ComparisonOperator::IsNull,
        ComparisonOperator::IsNotNull,
    ];

    /// The operator as it appears in a select statement.
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Like => "like",
            ComparisonOperator::NotLike => "not like",
            ComparisonOperator::IsNull => "is null",
            ComparisonOperator::IsNotNull => "is not null",
        }
    }

    /// `false` only for the null checks, which take no operand.
    pub fn takes_value(self) -> bool {
        !matches!(self, ComparisonOperator::IsNull | ComparisonOperator::IsNotNull)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        ComparisonOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| format!("unknown comparison operator: {s}"))
    }
}

/// One `attribute operator [value]` term of a query expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub operator: ComparisonOperator,
    pub value: Option<ScalarValue>,
}

impl Condition {
    pub fn new(
        attribute: impl Into<String>,
        operator: ComparisonOperator,
        value: Option<ScalarValue>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value,
        }
    }

    /// A condition on the record key.
    pub fn key(operator: ComparisonOperator, value: impl Into<ScalarValue>) -> Self {
        Self::new(KEY_ATTRIBUTE, operator, Some(value.into()))
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(attribute, ComparisonOperator::Eq, Some(value.into()))
    }

    pub fn ne(attribute: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(attribute, ComparisonOperator::Ne, Some(value.into()))
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(attribute, ComparisonOperator::Gt, Some(value.into()))
    }

    pub fn ge(attribute: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(attribute, ComparisonOperator::Ge, Some(value.into()))
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(attribute, ComparisonOperator::Lt, Some(value.into()))
    }

    pub fn le(attribute: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(attribute, ComparisonOperator::Le, Some(value.into()))
    }

    /// `%` in the pattern matches any run of characters.
    pub fn like(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            attribute,
            ComparisonOperator::Like,
            Some(ScalarValue::Text(pattern.into())),
        )
    }

    pub fn not_like(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            attribute,
            ComparisonOperator::NotLike,
            Some(ScalarValue::Text(pattern.into())),
        )
    }

    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, ComparisonOperator::IsNull, None)
    }

    pub fn is_not_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, ComparisonOperator::IsNotNull, None)
    }

    /// Returns `true` if this condition targets the record key.
    pub fn is_key(&self) -> bool {
        self.attribute == KEY_ATTRIBUTE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_names_parse_back() {
        for op in ComparisonOperator::ALL {
            assert_eq!(op.as_str().parse::<ComparisonOperator>().unwrap(), op);
        }
        assert_eq!(
            "NOT   LIKE".parse::<ComparisonOperator>().unwrap(),
            ComparisonOperator::NotLike
        );
        assert!("between".parse::<ComparisonOperator>().is_err());
    }

    #[test]
    fn null_checks_take_no_value() {
        assert!(!ComparisonOperator::IsNull.takes_value());
        assert!(!ComparisonOperator::IsNotNull.takes_value());
        assert!(ComparisonOperator::Like.takes_value());
        assert_eq!(Condition::is_null("isbn").value, None);
    }

    #[test]
    fn key_condition_uses_pseudo_attribute() {
        let c = Condition::key(ComparisonOperator::Eq, 7i64);
        assert!(c.is_key());
        assert_eq!(c.attribute, KEY_ATTRIBUTE);
        assert_eq!(c.value, Some(ScalarValue::Int64(7)));
    }
}
