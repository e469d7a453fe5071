use std::sync::Arc;

use attrmap_blob::{BlobEngine, BlobReference, FetchPolicy};
use attrmap_query::{ComparisonOperator, Condition, QueryCompiler, QueryExpression};
use attrmap_store::{Attribute, AttributeStore, Item, ObjectStore, SelectRequest, COUNT_ATTRIBUTE};
use attrmap_types::{ScalarCodec, ScalarValue};
use tracing::{debug, info, warn};

use crate::assemble::{blob_field, Assembled, AttributeAssembler, Disassembled, EncodedRecord, PendingBlob};
use crate::config::{MapperConfig, ReadOptions};
use crate::descriptor::{DescriptorRegistry, EntityDescriptor};
use crate::error::{MapperError, MapperResult};
use crate::record::{FieldValue, Record};
use crate::version::{VersionClock, VersionGuard};

/// Continuation point of a paged select, bound to the query that issued it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    query: String,
    token: String,
}

impl Cursor {
    /// The compiled query this cursor continues.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// One page of decoded records.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// Pass back to `select` for the next page; `None` on the last page.
    pub cursor: Option<Cursor>,
}

impl<R> Page<R> {
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Maps typed records onto a key/attribute store, offloading blob fields to
/// an object store.
///
/// Holds no per-query state: pagination is carried by the [`Cursor`] each
/// [`Page`] returns, so one mapper can be shared across tasks.
pub struct RecordMapper<A, O> {
    store: Arc<A>,
    blobs: BlobEngine<O>,
    registry: DescriptorRegistry,
    config: MapperConfig,
    assembler: AttributeAssembler,
    compiler: QueryCompiler,
    clock: &'static VersionClock,
}

impl<A: AttributeStore, O: ObjectStore + 'static> RecordMapper<A, O> {
    pub fn new(
        store: Arc<A>,
        objects: Arc<O>,
        registry: DescriptorRegistry,
        config: MapperConfig,
    ) -> Self {
        let codec = ScalarCodec::new(config.number_digits);
        Self {
            store,
            blobs: BlobEngine::new(objects, config.blob_pool_size),
            registry,
            assembler: AttributeAssembler::new(codec),
            compiler: QueryCompiler::new(codec),
            config,
            clock: VersionClock::global(),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<A> {
        &self.store
    }

    pub fn objects(&self) -> &Arc<O> {
        self.blobs.store()
    }

    pub fn descriptor<R: Record>(&self) -> MapperResult<Arc<EntityDescriptor>> {
        self.registry.get::<R>()
    }

    // ---- Domain lifecycle ----

    pub async fn create_domain<R: Record>(&self) -> MapperResult<()> {
        let descriptor = self.descriptor::<R>()?;
        self.store.create_domain(descriptor.domain()).await?;
        info!(domain = descriptor.domain(), "created domain");
        Ok(())
    }

    /// Delete the domain of `R` if it holds no items. A missing domain is a no-op.
    pub async fn drop_domain_if_empty<R: Record>(&self) -> MapperResult<()> {
        let descriptor = self.descriptor::<R>()?;
        let domain = descriptor.domain();
        let count = match self.count::<R>(None).await {
            Ok(count) => count,
            Err(MapperError::NoSuchDomain(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        if count > 0 {
            return Err(MapperError::DomainNotEmpty {
                domain: domain.to_string(),
                count,
            });
        }
        self.store.delete_domain(domain).await?;
        info!(domain, "dropped empty domain");
        Ok(())
    }

    // ---- Write path ----

    /// Persist a record.
    ///
    /// Order of effects: blob uploads (all joined), one put carrying the
    /// version precondition, removal of cleared attributes, then deletion of
    /// objects behind cleared blob fields. If any upload fails nothing is
    /// written to the attribute store. On success a versioned record's
    /// version field holds the newly stamped value.
    pub async fn save<R: Record>(&self, record: &mut R) -> MapperResult<()> {
        let descriptor = self.descriptor::<R>()?;
        let domain = descriptor.domain();
        let fields = record.fields();

        let Assembled {
            record: EncodedRecord {
                key,
                mut attributes,
                delete_set,
            },
            uploads,
            cleared_blobs,
        } = self.assembler.assemble(&descriptor, &fields)?;
        let guard = VersionGuard::observe(&descriptor, &fields)?;
        let precondition = guard.precondition();

        let references = self.blobs.upload_all(uploads).await?;
        attributes.extend(
            references
                .iter()
                .map(|r| Attribute::new(r.attribute.clone(), r.encode_inline())),
        );

        let new_version = guard.is_versioned().then(|| self.clock.mint());
        if let Some(stamp) = new_version.and_then(|v| guard.stamp(v)) {
            attributes.push(stamp);
        }

        if !attributes.is_empty() || precondition.is_some() {
            self.store
                .put_attributes(domain, &key, &attributes, precondition.as_ref())
                .await?;
        }
        if let (Some(version), Some(spec)) = (new_version, descriptor.version()) {
            record.stamp_version(&spec.field, version)?;
        }

        if !delete_set.is_empty() {
            self.store.delete_attributes(domain, &key, &delete_set).await?;
        }
        for (bucket, object_key) in &cleared_blobs {
            self.blobs.delete_best_effort(bucket, object_key).await;
        }

        info!(
            domain,
            key = %key,
            attributes = attributes.len(),
            cleared = delete_set.len(),
            version = ?new_version,
            "saved record"
        );
        Ok(())
    }

    /// Delete a record and, best-effort, the objects behind its blob fields.
    ///
    /// Conditional on the observed version when the record type is versioned.
    pub async fn delete<R: Record>(&self, record: &R) -> MapperResult<()> {
        let descriptor = self.descriptor::<R>()?;
        let domain = descriptor.domain();
        let fields = record.fields();
        let key = self.assembler.encode_key(&descriptor, &fields)?;
        let guard = VersionGuard::observe(&descriptor, &fields)?;

        let mut objects = Vec::new();
        if !descriptor.blobs().is_empty() {
            let current = self
                .store
                .get_attributes(domain, &key, self.config.consistency)
                .await?;
            for spec in descriptor.blobs() {
                for attr in current.iter().filter(|a| a.name == spec.attribute) {
                    match BlobReference::decode_inline(&spec.attribute, &attr.value) {
                        Ok(reference) => objects.push(reference),
                        Err(e) => warn!(domain, key = %key, error = %e, "skipping unreadable blob reference"),
                    }
                }
            }
        }

        self.store
            .delete_item(domain, &key, guard.precondition().as_ref())
            .await?;
        for reference in &objects {
            self.blobs
                .delete_best_effort(&reference.bucket, &reference.key)
                .await;
        }
        info!(domain, key = %key, blobs = objects.len(), "deleted record");
        Ok(())
    }

    // ---- Read path ----

    /// Load the record with the given key.
    pub async fn load<R: Record>(
        &self,
        key: impl Into<ScalarValue>,
        options: &ReadOptions,
    ) -> MapperResult<R> {
        let descriptor = self.descriptor::<R>()?;
        let key = key.into();
        let encoded = self.assembler.encode_key_value(&descriptor, &key)?;
        let expression = QueryExpression::where_(Condition::key(ComparisonOperator::Eq, key));
        let query = self
            .compiler
            .compile_select(descriptor.domain(), Some(&expression))?;
        let page = self
            .store
            .select(&SelectRequest::new(query, self.config.consistency))
            .await?;
        let item = page
            .items
            .into_iter()
            .next()
            .ok_or_else(|| MapperError::NotFound {
                domain: descriptor.domain().to_string(),
                key: encoded,
            })?;
        self.decode(&descriptor, &item, options).await
    }

    /// Fetch one page of records matching `expression`.
    ///
    /// Pass `None` for the first page and the returned cursor for each next
    /// one. A cursor issued for a different expression fails with
    /// [`MapperError::CursorMismatch`].
    pub async fn select<R: Record>(
        &self,
        expression: &QueryExpression,
        cursor: Option<Cursor>,
        options: &ReadOptions,
    ) -> MapperResult<Page<R>> {
        let descriptor = self.descriptor::<R>()?;
        let query = self
            .compiler
            .compile_select(descriptor.domain(), Some(expression))?;
        self.fetch_page(&descriptor, query, cursor, options).await
    }

    /// Every record matching `expression` (or every record, for `None`),
    /// draining all pages.
    pub async fn select_all<R: Record>(
        &self,
        expression: Option<&QueryExpression>,
        options: &ReadOptions,
    ) -> MapperResult<Vec<R>> {
        let descriptor = self.descriptor::<R>()?;
        let domain = descriptor.domain();
        let query = match expression {
            Some(expr) if expr.limit_value() == 0 => {
                let paged = expr.clone().limit(self.config.page_size);
                self.compiler.compile_select(domain, Some(&paged))?
            }
            Some(expr) => self.compiler.compile_select(domain, Some(expr))?,
            None => self.compiler.compile_scan(domain, self.config.page_size)?,
        };

        let mut records = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .fetch_page::<R>(&descriptor, query.clone(), cursor, options)
                .await?;
            records.extend(page.records);
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(domain, count = records.len(), "selected all records");
        Ok(records)
    }

    /// Number of records matching `expression` (or all records, for `None`).
    pub async fn count<R: Record>(&self, expression: Option<&QueryExpression>) -> MapperResult<u64> {
        let descriptor = self.descriptor::<R>()?;
        let query = self.compiler.compile_count(descriptor.domain(), expression)?;
        let mut total = 0u64;
        let mut token = None;
        loop {
            let page = self
                .store
                .select(&SelectRequest::new(query.clone(), self.config.consistency).with_next_token(token))
                .await?;
            for item in &page.items {
                for raw in item.values(COUNT_ATTRIBUTE) {
                    total += raw.parse::<u64>().map_err(|_| {
                        MapperError::MalformedValue(format!("count attribute holds {raw:?}"))
                    })?;
                }
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(total)
    }

    pub async fn count_all<R: Record>(&self) -> MapperResult<u64> {
        self.count::<R>(None).await
    }

    async fn fetch_page<R: Record>(
        &self,
        descriptor: &EntityDescriptor,
        query: String,
        cursor: Option<Cursor>,
        options: &ReadOptions,
    ) -> MapperResult<Page<R>> {
        let token = match cursor {
            Some(c) if c.query != query => {
                return Err(MapperError::CursorMismatch(format!(
                    "cursor was issued for `{}`, not `{query}`",
                    c.query
                )))
            }
            Some(c) => Some(c.token),
            None => None,
        };
        let page = self
            .store
            .select(&SelectRequest::new(query.clone(), self.config.consistency).with_next_token(token))
            .await?;

        let mut records = Vec::with_capacity(page.items.len());
        for item in &page.items {
            records.push(self.decode(descriptor, item, options).await?);
        }
        debug!(
            domain = descriptor.domain(),
            count = records.len(),
            more = page.next_token.is_some(),
            "fetched page"
        );
        Ok(Page {
            records,
            cursor: page.next_token.map(|token| Cursor { query, token }),
        })
    }

    /// Reverse-map one item, downloading eager blob fields.
    async fn decode<R: Record>(
        &self,
        descriptor: &EntityDescriptor,
        item: &Item,
        options: &ReadOptions,
    ) -> MapperResult<R> {
        let Disassembled { mut fields, blobs } =
            self.assembler
                .disassemble(descriptor, &item.name, &item.attributes)?;

        let (eager, lazy): (Vec<PendingBlob>, Vec<PendingBlob>) = blobs
            .into_iter()
            .partition(|b| b.spec.fetch == FetchPolicy::Eager || options.wants(&b.spec.field));
        for pending in lazy {
            fields.insert(pending.spec.field, FieldValue::Unloaded);
        }

        let references: Vec<BlobReference> = eager.iter().map(|b| b.reference.clone()).collect();
        let payloads = self.blobs.download_all(&references).await?;
        for (pending, data) in eager.iter().zip(payloads) {
            fields.insert(pending.spec.field.clone(), blob_field(&pending.spec, data)?);
        }

        R::from_fields(fields)
    }
}
