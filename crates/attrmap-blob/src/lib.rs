//! Blob offload engine.
//!
//! Fields declared with a [`BlobSpec`] never travel through the attribute
//! store. Their payload is pushed to the object store under a deterministic
//! key (see [`derive_object_key`]) and the attribute stores only a compact
//! inline [`BlobReference`].
//!
//! [`BlobEngine`] runs the transfers for one call concurrently through a
//! bounded pool and joins them before returning. A failed batch reports
//! every failed `(bucket, key, operation)` at once.

pub mod engine;
pub mod error;
pub mod reference;
pub mod spec;

pub use engine::{BlobEngine, BlobUpload, DEFAULT_POOL_SIZE};
pub use error::{BlobError, BlobFailure, BlobOperation, BlobResult};
pub use reference::{BlobReference, TransferOutcome};
pub use spec::{derive_object_key, BlobKind, BlobSpec, FetchPolicy};
