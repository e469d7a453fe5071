use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The closed set of scalar attribute types.
///
/// Only `Text`, `Int32`, `Int64` and `Float32` may be used for a record key;
/// see [`ScalarType::is_key_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Text,
    Int32,
    Int64,
    Float32,
    Timestamp,
    Boolean,
}

impl ScalarType {
    /// All scalar types, in declaration order.
    pub const ALL: [ScalarType; 6] = [
        ScalarType::Text,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Float32,
        ScalarType::Timestamp,
        ScalarType::Boolean,
    ];

    /// Returns `true` if values of this type may serve as a record key.
    pub fn is_key_type(self) -> bool {
        matches!(
            self,
            ScalarType::Text | ScalarType::Int32 | ScalarType::Int64 | ScalarType::Float32
        )
    }

    /// Returns `true` for the zero-padded numeric types.
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::Int64 | ScalarType::Float32)
    }

    /// Lowercase name used in diagnostics and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float32 => "float32",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(ScalarType::Text),
            "int32" | "int" | "integer" => Ok(ScalarType::Int32),
            "int64" | "long" => Ok(ScalarType::Int64),
            "float32" | "float" => Ok(ScalarType::Float32),
            "timestamp" | "date" => Ok(ScalarType::Timestamp),
            "boolean" | "bool" => Ok(ScalarType::Boolean),
            other => Err(format!("unknown scalar type: {other}")),
        }
    }
}

/// A typed scalar value. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Text(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Timestamp(DateTime<FixedOffset>),
    Boolean(bool),
}

impl ScalarValue {
    /// The type tag of this value.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::Text(_) => ScalarType::Text,
            ScalarValue::Int32(_) => ScalarType::Int32,
            ScalarValue::Int64(_) => ScalarType::Int64,
            ScalarValue::Float32(_) => ScalarType::Float32,
            ScalarValue::Timestamp(_) => ScalarType::Timestamp,
            ScalarValue::Boolean(_) => ScalarType::Boolean,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int32(v) => Some(i64::from(*v)),
            ScalarValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Text(s) => f.write_str(s),
            ScalarValue::Int32(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float32(v) => write!(f, "{v}"),
            ScalarValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            ScalarValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int32(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f32> for ScalarValue {
    fn from(value: f32) -> Self {
        ScalarValue::Float32(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<DateTime<FixedOffset>> for ScalarValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        ScalarValue::Timestamp(value)
    }
}
