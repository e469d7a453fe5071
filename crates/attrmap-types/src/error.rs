use thiserror::Error;

use crate::scalar::ScalarType;

/// Errors produced while encoding or decoding scalar values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed {ty} value {value:?}: {reason}")]
    MalformedValue {
        ty: ScalarType,
        value: String,
        reason: String,
    },

    #[error("type {0} cannot be used as a record key")]
    UnsupportedKeyType(ScalarType),
}

impl CodecError {
    pub(crate) fn malformed(ty: ScalarType, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            ty,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
