use serde::{Deserialize, Serialize};

use crate::error::{BlobError, BlobResult};

/// Result of the transfer that produced a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferOutcome {
    Success,
    Failure,
}

/// Location of an offloaded payload, plus whether it was stored successfully.
///
/// Persisted only in its inline form, as the attribute value of the blob
/// field: compact JSON `{"bucket":..,"key":..,"success":..}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobReference {
    pub attribute: String,
    pub bucket: String,
    pub key: String,
    pub outcome: TransferOutcome,
}

#[derive(Serialize, Deserialize)]
struct InlineForm {
    bucket: String,
    key: String,
    success: bool,
}

impl BlobReference {
    pub fn new(
        attribute: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        outcome: TransferOutcome,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            bucket: bucket.into(),
            key: key.into(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == TransferOutcome::Success
    }

    /// Serialize to the inline attribute value.
    pub fn encode_inline(&self) -> String {
        let inline = InlineForm {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            success: self.is_success(),
        };
        // Serializing a struct of strings and a bool cannot fail.
        serde_json::to_string(&inline).unwrap_or_default()
    }

    /// Parse an inline attribute value stored under `attribute`.
    pub fn decode_inline(attribute: &str, value: &str) -> BlobResult<Self> {
        let inline: InlineForm =
            serde_json::from_str(value).map_err(|e| BlobError::InvalidReference {
                value: value.to_string(),
                reason: e.to_string(),
            })?;
        if inline.bucket.is_empty() || inline.key.is_empty() {
            return Err(BlobError::InvalidReference {
                value: value.to_string(),
                reason: "bucket and key must be non-empty".into(),
            });
        }
        let outcome = if inline.success {
            TransferOutcome::Success
        } else {
            TransferOutcome::Failure
        };
        Ok(Self::new(attribute, inline.bucket, inline.key, outcome))
    }
}
