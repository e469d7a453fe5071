use serde::{Deserialize, Serialize};

/// Payload type of a blob field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    /// UTF-8 text, stored as its bytes.
    Text,
    /// Raw bytes.
    Bytes,
}

/// When a blob field is downloaded on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Downloaded on every load/select.
    Eager,
    /// Left unresolved unless the caller asks for it on a given call.
    #[default]
    Lazy,
}

/// Declares a record field whose payload lives in the object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobSpec {
    /// Record field holding the payload.
    pub field: String,
    /// Attribute under which the inline reference is stored.
    pub attribute: String,
    pub bucket: String,
    #[serde(default)]
    pub key_prefix: String,
    pub content_type: String,
    pub kind: BlobKind,
    #[serde(default)]
    pub fetch: FetchPolicy,
}

impl BlobSpec {
    /// A blob field whose attribute name equals its field name.
    pub fn new(field: impl Into<String>, bucket: impl Into<String>, kind: BlobKind) -> Self {
        let field = field.into();
        let content_type = match kind {
            BlobKind::Text => "text/plain; charset=utf-8",
            BlobKind::Bytes => "application/octet-stream",
        };
        Self {
            attribute: field.clone(),
            field,
            bucket: bucket.into(),
            key_prefix: String::new(),
            content_type: content_type.to_string(),
            kind,
            fetch: FetchPolicy::Lazy,
        }
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn fetch(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }

    /// Object key for this field of the record with encoded key `record_key`.
    pub fn object_key(&self, record_key: &str) -> String {
        derive_object_key(&self.key_prefix, record_key, &self.attribute)
    }
}

/// `prefix/record_key/attribute`, with the prefix trimmed and a separating
/// `/` added only when the prefix is non-empty and lacks one.
pub fn derive_object_key(prefix: &str, record_key: &str, attribute: &str) -> String {
    let prefix = prefix.trim();
    let mut key = String::with_capacity(prefix.len() + record_key.len() + attribute.len() + 2);
    key.push_str(prefix);
    if !prefix.is_empty() && !prefix.ends_with('/') {
        key.push('/');
    }
    key.push_str(record_key);
    key.push('/');
    key.push_str(attribute);
    key
}
