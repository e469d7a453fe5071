//! Foundation types for attrmap.
//!
//! The backing key/attribute store keeps every attribute as a string and
//! compares strings byte-wise. This crate defines the typed scalar values an
//! application record may hold and the codec that maps them to strings whose
//! lexicographic order matches the value order.
//!
//! # Key Types
//!
//! - [`ScalarType`]: the closed set of attribute types
//! - [`ScalarValue`]: a typed, immutable scalar
//! - [`ScalarCodec`]: encodes/decodes scalars to their store representation

pub mod codec;
pub mod error;
pub mod scalar;

pub use codec::{ScalarCodec, DEFAULT_NUMBER_DIGITS, TIMESTAMP_FORMAT};
pub use error::{CodecError, CodecResult};
pub use scalar::{ScalarType, ScalarValue};
