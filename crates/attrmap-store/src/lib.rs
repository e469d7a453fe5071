//! Remote store interfaces for attrmap.
//!
//! attrmap talks to two collaborators through narrow, async interfaces:
//!
//! - [`AttributeStore`]: a schema-less key/attribute store (domains of
//!   items, each item a key plus a multiset of named string attributes,
//!   queried with a restricted select grammar)
//! - [`ObjectStore`]: a bucket/key blob store
//!
//! Retry, authentication and wire protocol belong to implementations of these
//! traits, not to the mapper.
//!
//! # Storage Backends
//!
//! - [`InMemoryAttributeStore`]: `BTreeMap`-based store that honours
//!   replace-on-put, conditional writes and the select grammar
//! - [`InMemoryObjectStore`]: `HashMap`-based object store
//!
//! Both are intended for tests and embedding.

pub mod error;
pub mod memory;
pub mod select;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::{
    InMemoryAttributeStore, InMemoryObjectStore, StoreOp, StoredObject, COUNT_ITEM,
    DEFAULT_PAGE_SIZE,
};
pub use select::MAX_LIMIT;
pub use traits::{AttributeStore, ObjectStore};
pub use types::{
    Attribute, Consistency, Item, Precondition, SelectPage, SelectRequest, COUNT_ATTRIBUTE,
};
