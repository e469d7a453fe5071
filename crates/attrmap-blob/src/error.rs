use std::fmt;

use serde::{Deserialize, Serialize};

/// The transfer a failed blob task was performing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobOperation {
    Upload,
    Download,
    Delete,
}

impl fmt::Display for BlobOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlobOperation::Upload => "upload",
            BlobOperation::Download => "download",
            BlobOperation::Delete => "delete",
        })
    }
}

/// One failed transfer within a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobFailure {
    pub bucket: String,
    pub key: String,
    pub operation: BlobOperation,
    pub reason: String,
}

impl fmt::Display for BlobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}: {}", self.operation, self.bucket, self.key, self.reason)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BlobError {
    /// One or more transfers in a batch failed. Lists every failure.
    #[error("{} blob transfer(s) failed: {}", failures.len(), join(failures))]
    Transfer { failures: Vec<BlobFailure> },

    /// An inline reference string could not be parsed.
    #[error("invalid blob reference {value:?}: {reason}")]
    InvalidReference { value: String, reason: String },
}

fn join(failures: &[BlobFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
