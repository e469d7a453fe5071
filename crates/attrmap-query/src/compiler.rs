//! Renders [`QueryExpression`]s into select statements.
//!
//! Output shape:
//!
//! ```text
//! select * from `books` where `price` >= '0000000100' and `title` like 'Rust%'
//!     order by `price` desc limit 10
//! select count(*) from `books` where `isbn` is not null
//! ```

use attrmap_types::ScalarCodec;
use tracing::debug;

use crate::condition::{Condition, KEY_ATTRIBUTE};
use crate::error::{QueryError, QueryResult};
use crate::expression::{Direction, QueryExpression};
use crate::MAX_LIMIT;

/// Back-tick quote an attribute or domain name, doubling embedded back-ticks.
pub fn quote_name(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a value, doubling embedded quotes.
pub fn quote_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn render_attribute(attribute: &str) -> String {
    if attribute == KEY_ATTRIBUTE {
        KEY_ATTRIBUTE.to_string()
    } else {
        quote_name(attribute)
    }
}

/// Compiles query expressions for one domain naming scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCompiler {
    codec: ScalarCodec,
}

impl QueryCompiler {
    pub fn new(codec: ScalarCodec) -> Self {
        Self { codec }
    }

    /// `select * from <domain> [where ...] [order by ...] [limit n]`
    pub fn compile_select(
        &self,
        domain: &str,
        expression: Option<&QueryExpression>,
    ) -> QueryResult<String> {
        let mut query = format!("select * from {}", quote_name(domain));
        if let Some(expr) = expression {
            self.validate(expr)?;
            query.push_str(&self.render_where(expr)?);
            if let Some(sort) = expr.sort() {
                query.push_str(" order by ");
                query.push_str(&render_attribute(&sort.attribute));
                if sort.direction == Direction::Desc {
                    query.push_str(" desc");
                }
            }
            if expr.limit_value() > 0 {
                query.push_str(&format!(" limit {}", expr.limit_value()));
            }
        }
        debug!(%query, "compiled select");
        Ok(query)
    }

    /// `select * from <domain> limit <n>`: every item, `limit` per page.
    pub fn compile_scan(&self, domain: &str, limit: u32) -> QueryResult<String> {
        if limit as usize > MAX_LIMIT {
            return Err(QueryError::LimitOutOfRange(limit));
        }
        let mut query = format!("select * from {}", quote_name(domain));
        if limit > 0 {
            query.push_str(&format!(" limit {limit}"));
        }
        Ok(query)
    }

    /// `select count(*) from <domain> [where ...]`
    ///
    /// The sort is validated but not rendered; the limit is.
    pub fn compile_count(
        &self,
        domain: &str,
        expression: Option<&QueryExpression>,
    ) -> QueryResult<String> {
        let mut query = format!("select count(*) from {}", quote_name(domain));
        if let Some(expr) = expression {
            self.validate(expr)?;
            query.push_str(&self.render_where(expr)?);
            if expr.limit_value() > 0 {
                query.push_str(&format!(" limit {}", expr.limit_value()));
            }
        }
        debug!(%query, "compiled count");
        Ok(query)
    }

    fn validate(&self, expr: &QueryExpression) -> QueryResult<()> {
        if expr.limit_value() as usize > MAX_LIMIT {
            return Err(QueryError::LimitOutOfRange(expr.limit_value()));
        }
        if let Some(sort) = expr.sort() {
            let constrained = sort.attribute == KEY_ATTRIBUTE
                || expr.conditions().any(|c| c.attribute == sort.attribute);
            if !constrained {
                return Err(QueryError::InvalidCondition(format!(
                    "sort attribute {} does not appear in any condition",
                    sort.attribute
                )));
            }
        }
        Ok(())
    }

    fn render_where(&self, expr: &QueryExpression) -> QueryResult<String> {
        let mut clause = String::from(" where ");
        clause.push_str(&self.render_condition(expr.first())?);
        for (op, condition) in expr.chained() {
            clause.push(' ');
            clause.push_str(op.as_str());
            clause.push(' ');
            clause.push_str(&self.render_condition(condition)?);
        }
        Ok(clause)
    }

    fn render_condition(&self, condition: &Condition) -> QueryResult<String> {
        if condition.attribute.is_empty() {
            return Err(QueryError::InvalidCondition(
                "condition has an empty attribute name".into(),
            ));
        }
        let target = render_attribute(&condition.attribute);
        let op = condition.operator;
        match (&condition.value, op.takes_value()) {
            (None, false) => Ok(format!("{target} {op}")),
            (Some(value), true) => {
                let encoded = if condition.is_key() {
                    self.codec.encode_key(value)?
                } else {
                    self.codec.encode(value)?
                };
                Ok(format!("{target} {op} {}", quote_value(&encoded)))
            }
            (Some(_), false) => Err(QueryError::InvalidCondition(format!(
                "{} {op} takes no value",
                condition.attribute
            ))),
            (None, true) => Err(QueryError::InvalidCondition(format!(
                "{} {op} requires a value",
                condition.attribute
            ))),
        }
    }
}
