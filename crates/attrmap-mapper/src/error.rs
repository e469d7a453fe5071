use attrmap_blob::{BlobError, BlobFailure};
use attrmap_query::QueryError;
use attrmap_store::StoreError;
use attrmap_types::{CodecError, ScalarType};

/// Errors surfaced by the record mapper.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MapperError {
    /// No descriptor was registered for the record type.
    #[error("no entity descriptor registered for {0}")]
    MissingDescriptor(String),

    #[error("type {0} cannot be used as a record key")]
    UnsupportedKeyType(ScalarType),

    /// A field holds a value of a type its declaration does not allow.
    #[error("field {field}: {reason}")]
    UnsupportedAttributeType { field: String, reason: String },

    #[error("malformed value: {0}")]
    MalformedValue(String),

    /// A scalar attribute came back with more than one value.
    #[error("attribute {attribute} is declared scalar but holds {count} values")]
    CardinalityMismatch { attribute: String, count: usize },

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The store rejected a conditional write: someone else wrote first.
    #[error("concurrent modification of {domain}/{key}: expected version {expected}")]
    ConcurrentModification {
        domain: String,
        key: String,
        expected: String,
    },

    #[error("{} blob transfer(s) failed", failures.len())]
    BlobTransferFailure { failures: Vec<BlobFailure> },

    #[error("no record {key} in {domain}")]
    NotFound { domain: String, key: String },

    /// The record type's domain has not been created.
    #[error("no such domain: {0}")]
    NoSuchDomain(String),

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("invalid descriptor for {entity}: {reason}")]
    InvalidDescriptor { entity: String, reason: String },

    /// The cursor was issued for a different query, or already used.
    #[error("cursor does not belong to this query: {0}")]
    CursorMismatch(String),

    #[error("domain {domain} still holds {count} item(s)")]
    DomainNotEmpty { domain: String, count: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MapperError {
    pub(crate) fn unsupported(field: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedAttributeType {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<CodecError> for MapperError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnsupportedKeyType(ty) => MapperError::UnsupportedKeyType(ty),
            other => MapperError::MalformedValue(other.to_string()),
        }
    }
}

impl From<QueryError> for MapperError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidCondition(reason) => MapperError::InvalidCondition(reason),
            QueryError::Codec(codec) => codec.into(),
            other => MapperError::InvalidCondition(other.to_string()),
        }
    }
}

impl From<BlobError> for MapperError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::Transfer { failures } => MapperError::BlobTransferFailure { failures },
            other => MapperError::MalformedValue(other.to_string()),
        }
    }
}

impl From<StoreError> for MapperError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConditionFailed {
                domain,
                item,
                expected,
                ..
            } => MapperError::ConcurrentModification {
                domain,
                key: item,
                expected,
            },
            StoreError::InvalidCursor(reason) => MapperError::CursorMismatch(reason),
            StoreError::NoSuchDomain(domain) => MapperError::NoSuchDomain(domain),
            other => MapperError::RemoteUnavailable(other.to_string()),
        }
    }
}

/// Result alias for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;
    use attrmap_blob::BlobOperation;

    #[test]
    fn condition_failure_becomes_concurrent_modification() {
        let err: MapperError = StoreError::ConditionFailed {
            domain: "books".into(),
            item: "0000000001".into(),
            attribute: "version".into(),
            expected: "5".into(),
            actual: Some("6".into()),
        }
        .into();
        assert_eq!(
            err,
            MapperError::ConcurrentModification {
                domain: "books".into(),
                key: "0000000001".into(),
                expected: "5".into()
            }
        );
    }

    #[test]
    fn store_failures_pass_through_as_unavailable() {
        let err: MapperError = StoreError::Unavailable("timeout".into()).into();
        assert!(matches!(err, MapperError::RemoteUnavailable(_)));
    }

    #[test]
    fn codec_key_error_keeps_its_type() {
        let err: MapperError = QueryError::Codec(CodecError::UnsupportedKeyType(ScalarType::Boolean)).into();
        assert_eq!(err, MapperError::UnsupportedKeyType(ScalarType::Boolean));
    }

    #[test]
    fn blob_batch_failure_keeps_every_entry() {
        let failures = vec![
            BlobFailure {
                bucket: "b".into(),
                key: "k1".into(),
                operation: BlobOperation::Upload,
                reason: "x".into(),
            },
            BlobFailure {
                bucket: "b".into(),
                key: "k2".into(),
                operation: BlobOperation::Upload,
                reason: "y".into(),
            },
        ];
        let err: MapperError = BlobError::Transfer {
            failures: failures.clone(),
        }
        .into();
        assert_eq!(err, MapperError::BlobTransferFailure { failures });
    }
}
