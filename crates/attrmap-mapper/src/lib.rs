//! Typed record mapper for attrmap.
//!
//! Maps plain Rust records onto a key/attribute store: one record per item,
//! one field per attribute (or per value, for set fields). Large fields are
//! offloaded to an object store and referenced inline. Versioned records are
//! written with optimistic concurrency.
//!
//! ```text
//! Record --fields()--> AttributeAssembler --attributes--> AttributeStore
//!                             |
//!                             +--uploads--> BlobEngine --> ObjectStore
//! ```
//!
//! A record type opts in by implementing [`Record`] and registering an
//! [`EntityDescriptor`] with the [`DescriptorRegistry`] handed to the
//! [`RecordMapper`].

pub mod assemble;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod mapper;
pub mod record;
pub mod version;

#[cfg(test)]
mod fixtures;

pub use assemble::{AttributeAssembler, EncodedRecord};
pub use config::{MapperConfig, ReadOptions};
pub use descriptor::{
    AttributeKind, AttributeSpec, DescriptorBuilder, DescriptorRegistry, EntityDescriptor,
    KeySpec, VersionSpec, DEFAULT_VERSION_ATTRIBUTE,
};
pub use error::{MapperError, MapperResult};
pub use mapper::{Cursor, Page, RecordMapper};
pub use record::{set_field, take, BlobPayload, FieldMap, FieldValue, LazyBlob, Record};
pub use version::{VersionClock, VersionGuard};

// Re-export the types needed to describe and query records
pub use attrmap_blob::{BlobKind, BlobSpec, FetchPolicy};
pub use attrmap_query::{ComparisonOperator, Condition, Direction, QueryExpression, KEY_ATTRIBUTE};
pub use attrmap_store::{AttributeStore, Consistency, ObjectStore};
pub use attrmap_types::{ScalarType, ScalarValue};
