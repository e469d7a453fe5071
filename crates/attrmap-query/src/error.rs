use attrmap_types::CodecError;

/// Errors raised while building or compiling a query expression.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    /// A condition or sort is not valid for the store's grammar.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// `limit` lies outside `0..=2500`.
    #[error("limit {0} out of range (maximum {max})", max = crate::MAX_LIMIT)]
    LimitOutOfRange(u32),

    /// A condition value could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
