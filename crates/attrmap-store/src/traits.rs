//! The store interfaces consumed by the mapper.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::types::{Attribute, Consistency, Precondition, SelectPage, SelectRequest};

/// Schema-less key/attribute store.
///
/// Implementations must satisfy these invariants:
/// - `put_attributes` replaces, per attribute name present in the request,
///   every existing value of that name. Names absent from the request are
///   left untouched.
/// - A write carrying a [`Precondition`] is applied only if the named
///   attribute currently holds exactly the expected value; otherwise it fails
///   with [`StoreError::ConditionFailed`](crate::StoreError::ConditionFailed)
///   and leaves the item unchanged.
/// - An item with no remaining attributes no longer exists.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Create a domain. Creating an existing domain is a no-op.
    async fn create_domain(&self, domain: &str) -> StoreResult<()>;

    /// Delete a domain and every item in it.
    async fn delete_domain(&self, domain: &str) -> StoreResult<()>;

    /// Write attributes to an item, creating it if needed.
    async fn put_attributes(
        &self,
        domain: &str,
        item: &str,
        attributes: &[Attribute],
        precondition: Option<&Precondition>,
    ) -> StoreResult<()>;

    /// Remove every value of the named attributes from an item.
    async fn delete_attributes(&self, domain: &str, item: &str, names: &[String])
        -> StoreResult<()>;

    /// Remove an item entirely.
    async fn delete_item(
        &self,
        domain: &str,
        item: &str,
        precondition: Option<&Precondition>,
    ) -> StoreResult<()>;

    /// Read all attributes of an item. A missing item yields an empty list.
    async fn get_attributes(
        &self,
        domain: &str,
        item: &str,
        consistency: Consistency,
    ) -> StoreResult<Vec<Attribute>>;

    /// Run a select query, returning one page of results.
    async fn select(&self, request: &SelectRequest) -> StoreResult<SelectPage>;
}

/// Bucket/key object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, replacing any existing object at the same key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<()>;

    /// Fetch an object's bytes.
    ///
    /// Returns [`StoreError::NoSuchObject`](crate::StoreError::NoSuchObject)
    /// if nothing is stored at the key.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;
}
