//! Query expressions and the select-statement compiler.
//!
//! A [`QueryExpression`] is a leading [`Condition`] followed by conditions
//! joined with `and`, `or` or `intersection`, plus an optional sort and
//! limit. [`QueryCompiler`] renders it into the store's select grammar,
//! encoding every value with the scalar codec so string comparison on the
//! store side matches typed comparison.
//!
//! Compilation rejects:
//! - a null check carrying a value, or any other operator without one
//! - a sort on an attribute that no condition constrains (the key
//!   pseudo-attribute [`KEY_ATTRIBUTE`] is always sortable)
//! - a limit above [`MAX_LIMIT`]

pub mod compiler;
pub mod condition;
pub mod error;
pub mod expression;

pub use compiler::{quote_name, quote_value, QueryCompiler};
pub use condition::{ComparisonOperator, Condition, KEY_ATTRIBUTE};
pub use error::{QueryError, QueryResult};
pub use expression::{BooleanOperator, Direction, QueryExpression, Sort};

/// Largest limit the store accepts for one select.
pub const MAX_LIMIT: usize = 2500;
