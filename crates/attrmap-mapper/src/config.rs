use attrmap_store::Consistency;
use attrmap_types::DEFAULT_NUMBER_DIGITS;
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};

/// Configuration for a [`RecordMapper`](crate::RecordMapper).
///
/// Missing keys in a TOML document fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Read consistency requested for loads, selects and counts.
    pub consistency: Consistency,
    /// Maximum concurrent blob transfers per call.
    pub blob_pool_size: usize,
    /// Integer digits used when encoding numbers.
    pub number_digits: usize,
    /// Page size used by `select_all` when the expression sets no limit.
    pub page_size: u32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            consistency: Consistency::Strong,
            blob_pool_size: attrmap_blob::DEFAULT_POOL_SIZE,
            number_digits: DEFAULT_NUMBER_DIGITS,
            page_size: attrmap_query::MAX_LIMIT as u32,
        }
    }
}

impl MapperConfig {
    pub fn from_toml_str(input: &str) -> MapperResult<Self> {
        toml::from_str(input).map_err(|e| MapperError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> MapperResult<String> {
        toml::to_string(self).map_err(|e| MapperError::Config(e.to_string()))
    }
}

/// Per-call read options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Lazy blob fields (by field name) to download on this call.
    pub eager_blobs: Vec<String>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also download the lazy blob field `field`.
    pub fn fetch(mut self, field: impl Into<String>) -> Self {
        self.eager_blobs.push(field.into());
        self
    }

    pub fn wants(&self, field: &str) -> bool {
        self.eager_blobs.iter().any(|f| f == field)
    }
}
