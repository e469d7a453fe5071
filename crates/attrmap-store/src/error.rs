/// Errors from key/attribute and object store operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The domain does not exist.
    #[error("no such domain: {0}")]
    NoSuchDomain(String),

    /// A conditional write was rejected because the expected value did not match.
    #[error("condition failed on {domain}/{item}: expected {attribute} = {expected:?}, found {actual:?}")]
    ConditionFailed {
        domain: String,
        item: String,
        attribute: String,
        expected: String,
        actual: Option<String>,
    },

    /// The requested object does not exist.
    #[error("no such object: {bucket}/{key}")]
    NoSuchObject { bucket: String, key: String },

    /// The select expression could not be parsed or evaluated.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The continuation token is unknown, already used, or belongs to another query.
    #[error("invalid continuation token: {0}")]
    InvalidCursor(String),

    /// The remote service could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
