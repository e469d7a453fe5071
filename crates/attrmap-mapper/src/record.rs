use std::collections::BTreeMap;

use attrmap_types::ScalarValue;

use crate::error::{MapperError, MapperResult};

/// The value of one record field as seen by the mapper.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// Absent. Saving clears the attribute.
    Null,
    Scalar(ScalarValue),
    /// Members of a set-valued field. Order is not significant.
    Set(Vec<ScalarValue>),
    /// Raw bytes of a blob field.
    Bytes(Vec<u8>),
    /// A lazy blob field that was not fetched. Saving leaves it untouched.
    Unloaded,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, |v| FieldValue::Scalar(v.into()))
    }
}

/// Field values of a record, keyed by field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// An application record the mapper can persist.
///
/// Field names must match the ones used in the record's
/// [`EntityDescriptor`](crate::EntityDescriptor).
pub trait Record: Sized + Send + Sync + 'static {
    /// Snapshot every mapped field.
    fn fields(&self) -> FieldMap;

    /// Rebuild a record from decoded fields. Missing fields are `Null`.
    fn from_fields(fields: FieldMap) -> MapperResult<Self>;

    /// Store a freshly minted version after a successful write.
    fn stamp_version(&mut self, field: &str, version: i64) -> MapperResult<()> {
        let mut fields = self.fields();
        fields.insert(field.to_string(), FieldValue::Scalar(ScalarValue::Int64(version)));
        *self = Self::from_fields(fields)?;
        Ok(())
    }
}

/// A lazily fetched blob field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LazyBlob<T> {
    /// No payload.
    #[default]
    Empty,
    /// Stored remotely but not fetched on the read that produced this record.
    Unloaded,
    Loaded(T),
}

impl<T> LazyBlob<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            LazyBlob::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unloaded(&self) -> bool {
        matches!(self, LazyBlob::Unloaded)
    }
}

impl<T: BlobPayload> LazyBlob<T> {
    pub fn to_field(&self) -> FieldValue {
        match self {
            LazyBlob::Empty => FieldValue::Null,
            LazyBlob::Unloaded => FieldValue::Unloaded,
            LazyBlob::Loaded(v) => v.to_field(),
        }
    }

    pub fn from_field(name: &str, value: FieldValue) -> MapperResult<Self> {
        match value {
            FieldValue::Null => Ok(LazyBlob::Empty),
            FieldValue::Unloaded => Ok(LazyBlob::Unloaded),
            other => T::from_field(name, other).map(LazyBlob::Loaded),
        }
    }
}

/// Payload types a blob field may hold.
pub trait BlobPayload: Sized {
    fn to_field(&self) -> FieldValue;
    fn from_field(name: &str, value: FieldValue) -> MapperResult<Self>;
}

impl BlobPayload for String {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(ScalarValue::Text(self.clone()))
    }

    fn from_field(name: &str, value: FieldValue) -> MapperResult<Self> {
        match value {
            FieldValue::Scalar(ScalarValue::Text(s)) => Ok(s),
            other => Err(mismatch(name, "text", &other)),
        }
    }
}

impl BlobPayload for Vec<u8> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Bytes(self.clone())
    }

    fn from_field(name: &str, value: FieldValue) -> MapperResult<Self> {
        match value {
            FieldValue::Bytes(b) => Ok(b),
            other => Err(mismatch(name, "bytes", &other)),
        }
    }
}

pub(crate) fn mismatch(field: &str, expected: &str, found: &FieldValue) -> MapperError {
    let found = match found {
        FieldValue::Null => "null".to_string(),
        FieldValue::Scalar(v) => v.scalar_type().to_string(),
        FieldValue::Set(_) => "set".to_string(),
        FieldValue::Bytes(_) => "bytes".to_string(),
        FieldValue::Unloaded => "unloaded blob".to_string(),
    };
    MapperError::unsupported(field, format!("expected {expected}, found {found}"))
}

/// Helpers for implementing [`Record::from_fields`].
///
/// Each takes the field out of the map; a missing entry reads as `Null`.
pub mod take {
    use std::collections::BTreeSet;

    use attrmap_types::ScalarValue;
    use chrono::{DateTime, FixedOffset};

    use super::{mismatch, BlobPayload, FieldMap, FieldValue, LazyBlob};
    use crate::error::MapperResult;

    fn take(fields: &mut FieldMap, name: &str) -> FieldValue {
        fields.remove(name).unwrap_or(FieldValue::Null)
    }

    macro_rules! scalar_taker {
        ($fn_name:ident, $ty:ty, $variant:ident, $label:literal) => {
            pub fn $fn_name(fields: &mut FieldMap, name: &str) -> MapperResult<Option<$ty>> {
                match take(fields, name) {
                    FieldValue::Null => Ok(None),
                    FieldValue::Scalar(ScalarValue::$variant(v)) => Ok(Some(v)),
                    other => Err(mismatch(name, $label, &other)),
                }
            }
        };
    }

    scalar_taker!(text, String, Text, "text");
    scalar_taker!(int32, i32, Int32, "int32");
    scalar_taker!(int64, i64, Int64, "int64");
    scalar_taker!(float32, f32, Float32, "float32");
    scalar_taker!(timestamp, DateTime<FixedOffset>, Timestamp, "timestamp");
    scalar_taker!(boolean, bool, Boolean, "boolean");

    /// A set of text members; `Null` reads as the empty set.
    pub fn text_set(fields: &mut FieldMap, name: &str) -> MapperResult<BTreeSet<String>> {
        match take(fields, name) {
            FieldValue::Null => Ok(BTreeSet::new()),
            FieldValue::Set(members) => members
                .into_iter()
                .map(|m| match m {
                    ScalarValue::Text(s) => Ok(s),
                    other => Err(mismatch(name, "text", &FieldValue::Scalar(other))),
                })
                .collect(),
            other => Err(mismatch(name, "set", &other)),
        }
    }

    /// A set of int32 members; `Null` reads as the empty set.
    pub fn int32_set(fields: &mut FieldMap, name: &str) -> MapperResult<BTreeSet<i32>> {
        match take(fields, name) {
            FieldValue::Null => Ok(BTreeSet::new()),
            FieldValue::Set(members) => members
                .into_iter()
                .map(|m| match m {
                    ScalarValue::Int32(v) => Ok(v),
                    other => Err(mismatch(name, "int32", &FieldValue::Scalar(other))),
                })
                .collect(),
            other => Err(mismatch(name, "set", &other)),
        }
    }

    /// An eagerly fetched blob: `Unloaded` is rejected.
    pub fn blob<T: BlobPayload>(fields: &mut FieldMap, name: &str) -> MapperResult<Option<T>> {
        match take(fields, name) {
            FieldValue::Null => Ok(None),
            other => T::from_field(name, other).map(Some),
        }
    }

    pub fn lazy_blob<T: BlobPayload>(fields: &mut FieldMap, name: &str) -> MapperResult<LazyBlob<T>> {
        LazyBlob::from_field(name, take(fields, name))
    }
}

/// Builds a set field from an iterator of members; empty becomes `Null`.
pub fn set_field<I, T>(members: I) -> FieldValue
where
    I: IntoIterator<Item = T>,
    T: Into<ScalarValue>,
{
    let members: Vec<ScalarValue> = members.into_iter().map(Into::into).collect();
    if members.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::Set(members)
    }
}
