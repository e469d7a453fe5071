use std::future::Future;
use std::sync::Arc;

use attrmap_store::{ObjectStore, StoreResult};
use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{BlobError, BlobFailure, BlobOperation, BlobResult};
use crate::reference::{BlobReference, TransferOutcome};

/// Default number of transfers allowed in flight at once.
pub const DEFAULT_POOL_SIZE: usize = 2;

/// A payload to push to the object store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobUpload {
    pub attribute: String,
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Runs blob transfers against an object store.
///
/// Every batch fans out one task per transfer, bounded by a semaphore of
/// `pool_size` permits, and is joined before the call returns. Batches fail
/// together: every task runs to completion and all failures are reported in
/// one [`BlobError::Transfer`].
pub struct BlobEngine<O> {
    store: Arc<O>,
    permits: Arc<Semaphore>,
    pool_size: usize,
}

impl<O> Clone for BlobEngine<O> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permits: Arc::clone(&self.permits),
            pool_size: self.pool_size,
        }
    }
}

impl<O: ObjectStore + 'static> BlobEngine<O> {
    /// Create an engine; `pool_size` is clamped to at least 1.
    pub fn new(store: Arc<O>, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            store,
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn store(&self) -> &Arc<O> {
        &self.store
    }

    /// Upload every payload. On success the references come back in input order.
    pub async fn upload_all(&self, uploads: Vec<BlobUpload>) -> BlobResult<Vec<BlobReference>> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = uploads.len(), "uploading blobs");
        let targets = uploads
            .iter()
            .map(|u| (u.bucket.clone(), u.key.clone()))
            .collect();
        let (results, failures) = self
            .run_batch(BlobOperation::Upload, targets, |index, store| {
                let upload = uploads[index].clone();
                async move {
                    store
                        .put_object(&upload.bucket, &upload.key, upload.data, &upload.content_type)
                        .await
                }
            })
            .await;
        if !failures.is_empty() {
            return Err(BlobError::Transfer { failures });
        }
        Ok(uploads
            .into_iter()
            .zip(results)
            .filter(|(_, result)| result.is_some())
            .map(|(u, _)| BlobReference::new(u.attribute, u.bucket, u.key, TransferOutcome::Success))
            .collect())
    }

    /// Download the payload behind each reference, in input order.
    ///
    /// A reference recording a failed upload counts as a failed download.
    pub async fn download_all(&self, references: &[BlobReference]) -> BlobResult<Vec<Bytes>> {
        if references.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = references.len(), "downloading blobs");
        let mut failures: Vec<BlobFailure> = references
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| BlobFailure {
                bucket: r.bucket.clone(),
                key: r.key.clone(),
                operation: BlobOperation::Download,
                reason: "reference records a failed upload".into(),
            })
            .collect();
        let fetchable: Vec<&BlobReference> = references.iter().filter(|r| r.is_success()).collect();
        let targets = fetchable
            .iter()
            .map(|r| (r.bucket.clone(), r.key.clone()))
            .collect();
        let (results, batch_failures) = self
            .run_batch(BlobOperation::Download, targets, |index, store| {
                let bucket = fetchable[index].bucket.clone();
                let key = fetchable[index].key.clone();
                async move { store.get_object(&bucket, &key).await }
            })
            .await;
        failures.extend(batch_failures);
        if !failures.is_empty() {
            return Err(BlobError::Transfer { failures });
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Delete an object, logging instead of failing.
    pub async fn delete_best_effort(&self, bucket: &str, key: &str) -> bool {
        match self.store.delete_object(bucket, key).await {
            Ok(()) => {
                debug!(bucket, key, "deleted blob");
                true
            }
            Err(e) => {
                warn!(bucket, key, error = %e, "failed to delete blob");
                false
            }
        }
    }

    /// Run one task per target, at most `pool_size` at a time, and wait for all.
    ///
    /// Returns per-target results (`None` where the task failed) and the
    /// failures ordered by target position.
    async fn run_batch<T, F, Fut>(
        &self,
        operation: BlobOperation,
        targets: Vec<(String, String)>,
        job: F,
    ) -> (Vec<Option<T>>, Vec<BlobFailure>)
    where
        T: Send + 'static,
        F: Fn(usize, Arc<O>) -> Fut,
        Fut: Future<Output = StoreResult<T>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for index in 0..targets.len() {
            let permits = Arc::clone(&self.permits);
            let work = job(index, Arc::clone(&self.store));
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, work.await)
            });
        }

        let mut results: Vec<Option<T>> = (0..targets.len()).map(|_| None).collect();
        let mut errors: Vec<Option<String>> = vec![None; targets.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(value))) => results[index] = Some(value),
                Ok((index, Err(e))) => errors[index] = Some(e.to_string()),
                Err(e) => warn!(%operation, error = %e, "blob task did not complete"),
            }
        }

        let failures: Vec<BlobFailure> = targets
            .into_iter()
            .enumerate()
            .filter(|(index, _)| results[*index].is_none())
            .map(|(index, (bucket, key))| BlobFailure {
                bucket,
                key,
                operation,
                reason: errors[index]
                    .take()
                    .unwrap_or_else(|| "task aborted".to_string()),
            })
            .collect();
        for failure in &failures {
            warn!(
                %operation,
                bucket = %failure.bucket,
                key = %failure.key,
                reason = %failure.reason,
                "blob transfer failed"
            );
        }
        (results, failures)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use attrmap_store::{InMemoryObjectStore, StoreError};

    use super::*;

    fn upload(bucket: &str, key: &str, data: &'static [u8]) -> BlobUpload {
        BlobUpload {
            attribute: key.rsplit('/').next().unwrap_or(key).to_string(),
            bucket: bucket.into(),
            key: key.into(),
            content_type: "text/plain".into(),
            data: Bytes::from_static(data),
        }
    }

    // -----------------------------------------------------------------------
    // Upload / download
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn uploads_then_downloads_in_order() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = BlobEngine::new(Arc::clone(&store), 2);
        let refs = engine
            .upload_all(vec![
                upload("b", "p/1/review", b"hello"),
                upload("b", "p/1/cover", b"\x00\x01"),
                upload("c", "p/1/notes", b"n"),
            ])
            .await
            .unwrap();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(BlobReference::is_success));
        assert_eq!(refs[1].attribute, "cover");
        assert_eq!(store.len(), 3);

        let data = engine.download_all(&refs).await.unwrap();
        assert_eq!(data[0], Bytes::from_static(b"hello"));
        assert_eq!(data[2], Bytes::from_static(b"n"));
    }

    #[tokio::test]
    async fn failures_are_collected_not_short_circuited() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.reject_bucket("bad");
        let engine = BlobEngine::new(Arc::clone(&store), 1);
        let err = engine
            .upload_all(vec![
                upload("bad", "k1", b"x"),
                upload("good", "k2", b"y"),
                upload("bad", "k3", b"z"),
            ])
            .await
            .unwrap_err();
        match err {
            BlobError::Transfer { failures } => {
                let keys: Vec<_> = failures.iter().map(|f| f.key.as_str()).collect();
                assert_eq!(keys, vec!["k1", "k3"]);
                assert!(failures.iter().all(|f| f.operation == BlobOperation::Upload));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // the healthy upload still ran
        assert!(store.object("good", "k2").is_some());
    }

    #[tokio::test]
    async fn download_reports_missing_and_failed_references() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = BlobEngine::new(store, 2);
        let refs = vec![
            BlobReference::new("a", "b", "missing", TransferOutcome::Success),
            BlobReference::new("c", "b", "broken", TransferOutcome::Failure),
        ];
        let err = engine.download_all(&refs).await.unwrap_err();
        match err {
            BlobError::Transfer { failures } => {
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().any(|f| f.key == "missing"));
                assert!(failures.iter().any(|f| f.key == "broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_best_effort_never_fails() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = BlobEngine::new(Arc::clone(&store), 2);
        assert!(engine.delete_best_effort("b", "nothing-here").await);
        store.reject_bucket("b");
        assert!(!engine.delete_best_effort("b", "k").await);
    }

    // -----------------------------------------------------------------------
    // Pool bound
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct SlowStore {
        inflight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for SlowStore {
        async fn put_object(
            &self,
            _bucket: &str,
            _key: &str,
            _data: Bytes,
            _content_type: &str,
        ) -> StoreResult<()> {
            let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
            Err(StoreError::NoSuchObject {
                bucket: bucket.into(),
                key: key.into(),
            })
        }

        async fn delete_object(&self, _bucket: &str, _key: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_pool_size() {
        let store = Arc::new(SlowStore::default());
        let engine = BlobEngine::new(Arc::clone(&store), 2);
        let uploads = (0..8)
            .map(|i| BlobUpload {
                attribute: "a".into(),
                bucket: "b".into(),
                key: format!("k{i}"),
                content_type: "text/plain".into(),
                data: Bytes::new(),
            })
            .collect();
        engine.upload_all(uploads).await.unwrap();
        assert!(store.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(store.inflight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pool_size_is_at_least_one() {
        let engine = BlobEngine::new(Arc::new(InMemoryObjectStore::new()), 0);
        assert_eq!(engine.pool_size(), 1);
    }
}
