use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::select::{Projection, SelectStatement};
use crate::traits::{AttributeStore, ObjectStore};
use crate::types::{Attribute, Consistency, Item, Precondition, SelectPage, SelectRequest, COUNT_ATTRIBUTE};

/// Page size used when a select carries no `limit`.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Item name under which a `count(*)` select reports its result.
pub const COUNT_ITEM: &str = "Domain";

type Domain = BTreeMap<String, Vec<Attribute>>;

/// A call recorded by [`InMemoryAttributeStore`], in the order it arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOp {
    CreateDomain {
        domain: String,
    },
    DeleteDomain {
        domain: String,
    },
    PutAttributes {
        domain: String,
        item: String,
        names: Vec<String>,
        conditional: bool,
    },
    DeleteAttributes {
        domain: String,
        item: String,
        names: Vec<String>,
    },
    DeleteItem {
        domain: String,
        item: String,
        conditional: bool,
    },
    GetAttributes {
        domain: String,
        item: String,
    },
    Select {
        query: String,
        next_token: Option<String>,
    },
}

struct PendingPage {
    query: String,
    offset: usize,
}

/// In-memory attribute store.
///
/// Intended for tests and embedding. Items are kept in name order, so a select
/// without `order by` returns items sorted by key. Every call is appended to a
/// journal readable through [`operations`](Self::operations), and the store can
/// be switched to refuse all calls with [`set_unavailable`](Self::set_unavailable).
pub struct InMemoryAttributeStore {
    domains: RwLock<BTreeMap<String, Domain>>,
    pending: Mutex<HashMap<String, PendingPage>>,
    next_token: AtomicU64,
    journal: Mutex<Vec<StoreOp>>,
    unavailable: AtomicBool,
}

impl InMemoryAttributeStore {
    /// Create a new store with no domains.
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(BTreeMap::new()),
            pending: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            journal: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create a store with the given domains already present.
    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.domains.write().expect("lock poisoned");
            for domain in domains {
                map.entry(domain.into()).or_default();
            }
        }
        store
    }

    /// Returns `true` if the domain exists.
    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.read().expect("lock poisoned").contains_key(domain)
    }

    /// Number of items in a domain (0 if the domain is missing).
    pub fn item_count(&self, domain: &str) -> usize {
        self.domains
            .read()
            .expect("lock poisoned")
            .get(domain)
            .map_or(0, BTreeMap::len)
    }

    /// Attributes of an item, sorted by name then value.
    pub fn item(&self, domain: &str, item: &str) -> Option<Vec<Attribute>> {
        let map = self.domains.read().expect("lock poisoned");
        let mut attrs = map.get(domain)?.get(item)?.clone();
        attrs.sort();
        Some(attrs)
    }

    /// Every call made so far.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.journal.lock().expect("lock poisoned").clone()
    }

    /// Forget the recorded calls.
    pub fn clear_operations(&self) {
        self.journal.lock().expect("lock poisoned").clear();
    }

    /// When set, every call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("attribute store offline".into()));
        }
        Ok(())
    }

    fn record(&self, op: StoreOp) {
        self.journal.lock().expect("lock poisoned").push(op);
    }

    fn issue_token(&self, query: &str, offset: usize) -> String {
        let token = format!("tok-{}", self.next_token.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().expect("lock poisoned").insert(
            token.clone(),
            PendingPage {
                query: query.to_string(),
                offset,
            },
        );
        token
    }

    /// Tokens are single-use and bound to the query that produced them.
    fn redeem_token(&self, token: &str, query: &str) -> StoreResult<usize> {
        let mut pending = self.pending.lock().expect("lock poisoned");
        match pending.get(token) {
            Some(page) if page.query == query => {
                let offset = page.offset;
                pending.remove(token);
                Ok(offset)
            }
            Some(_) => Err(StoreError::InvalidCursor(format!(
                "token {token} belongs to a different query"
            ))),
            None => Err(StoreError::InvalidCursor(format!("unknown token {token}"))),
        }
    }
}

impl Default for InMemoryAttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryAttributeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let domains = self.domains.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryAttributeStore")
            .field("domain_count", &domains)
            .finish()
    }
}

fn check_precondition(
    domain: &str,
    item: &str,
    attributes: Option<&Vec<Attribute>>,
    precondition: &Precondition,
) -> StoreResult<()> {
    let values: Vec<&str> = attributes
        .map(|attrs| {
            attrs
                .iter()
                .filter(|a| a.name == precondition.attribute)
                .map(|a| a.value.as_str())
                .collect()
        })
        .unwrap_or_default();
    if values.len() == 1 && values[0] == precondition.expected {
        return Ok(());
    }
    Err(StoreError::ConditionFailed {
        domain: domain.to_string(),
        item: item.to_string(),
        attribute: precondition.attribute.clone(),
        expected: precondition.expected.clone(),
        actual: values.first().map(|v| v.to_string()),
    })
}

fn no_such_domain(domain: &str) -> StoreError {
    StoreError::NoSuchDomain(domain.to_string())
}

#[async_trait]
impl AttributeStore for InMemoryAttributeStore {
    async fn create_domain(&self, domain: &str) -> StoreResult<()> {
        self.check_available()?;
        self.domains
            .write()
            .expect("lock poisoned")
            .entry(domain.to_string())
            .or_default();
        self.record(StoreOp::CreateDomain {
            domain: domain.to_string(),
        });
        Ok(())
    }

    async fn delete_domain(&self, domain: &str) -> StoreResult<()> {
        self.check_available()?;
        self.domains.write().expect("lock poisoned").remove(domain);
        self.record(StoreOp::DeleteDomain {
            domain: domain.to_string(),
        });
        Ok(())
    }

    async fn put_attributes(
        &self,
        domain: &str,
        item: &str,
        attributes: &[Attribute],
        precondition: Option<&Precondition>,
    ) -> StoreResult<()> {
        self.check_available()?;
        let names: BTreeSet<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
        {
            let mut map = self.domains.write().expect("lock poisoned");
            let items = map.get_mut(domain).ok_or_else(|| no_such_domain(domain))?;
            if let Some(pre) = precondition {
                check_precondition(domain, item, items.get(item), pre)?;
            }
            let entry = items.entry(item.to_string()).or_default();
            entry.retain(|a| !names.contains(a.name.as_str()));
            for attr in attributes {
                if !entry.contains(attr) {
                    entry.push(attr.clone());
                }
            }
            let empty = entry.is_empty();
            if empty {
                items.remove(item);
            }
        }
        debug!(domain, item, attributes = attributes.len(), "put attributes");
        self.record(StoreOp::PutAttributes {
            domain: domain.to_string(),
            item: item.to_string(),
            names: names.into_iter().map(str::to_string).collect(),
            conditional: precondition.is_some(),
        });
        Ok(())
    }

    async fn delete_attributes(
        &self,
        domain: &str,
        item: &str,
        names: &[String],
    ) -> StoreResult<()> {
        self.check_available()?;
        {
            let mut map = self.domains.write().expect("lock poisoned");
            let items = map.get_mut(domain).ok_or_else(|| no_such_domain(domain))?;
            if let Some(entry) = items.get_mut(item) {
                entry.retain(|a| !names.contains(&a.name));
                let empty = entry.is_empty();
                if empty {
                    items.remove(item);
                }
            }
        }
        debug!(domain, item, names = names.len(), "delete attributes");
        self.record(StoreOp::DeleteAttributes {
            domain: domain.to_string(),
            item: item.to_string(),
            names: names.to_vec(),
        });
        Ok(())
    }

    async fn delete_item(
        &self,
        domain: &str,
        item: &str,
        precondition: Option<&Precondition>,
    ) -> StoreResult<()> {
        self.check_available()?;
        {
            let mut map = self.domains.write().expect("lock poisoned");
            let items = map.get_mut(domain).ok_or_else(|| no_such_domain(domain))?;
            if let Some(pre) = precondition {
                check_precondition(domain, item, items.get(item), pre)?;
            }
            items.remove(item);
        }
        debug!(domain, item, "delete item");
        self.record(StoreOp::DeleteItem {
            domain: domain.to_string(),
            item: item.to_string(),
            conditional: precondition.is_some(),
        });
        Ok(())
    }

    async fn get_attributes(
        &self,
        domain: &str,
        item: &str,
        _consistency: Consistency,
    ) -> StoreResult<Vec<Attribute>> {
        self.check_available()?;
        let attrs = {
            let map = self.domains.read().expect("lock poisoned");
            let items = map.get(domain).ok_or_else(|| no_such_domain(domain))?;
            items.get(item).cloned().unwrap_or_default()
        };
        self.record(StoreOp::GetAttributes {
            domain: domain.to_string(),
            item: item.to_string(),
        });
        Ok(attrs)
    }

    async fn select(&self, request: &SelectRequest) -> StoreResult<SelectPage> {
        self.check_available()?;
        self.record(StoreOp::Select {
            query: request.query.clone(),
            next_token: request.next_token.clone(),
        });
        let statement = SelectStatement::parse(&request.query)?;

        let mut matched: Vec<Item> = {
            let map = self.domains.read().expect("lock poisoned");
            let items = map
                .get(&statement.domain)
                .ok_or_else(|| no_such_domain(&statement.domain))?;
            items
                .iter()
                .map(|(name, attrs)| Item {
                    name: name.clone(),
                    attributes: attrs.clone(),
                })
                .filter(|item| statement.matches(item))
                .collect()
        };

        if statement.projection == Projection::Count {
            let count = statement
                .limit
                .map_or(matched.len(), |limit| matched.len().min(limit));
            return Ok(SelectPage {
                items: vec![Item {
                    name: COUNT_ITEM.to_string(),
                    attributes: vec![Attribute::new(COUNT_ATTRIBUTE, count.to_string())],
                }],
                next_token: None,
            });
        }

        let offset = match &request.next_token {
            Some(token) => self.redeem_token(token, &request.query)?,
            None => 0,
        };
        statement.sort(&mut matched);
        let page_size = statement.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let total = matched.len();
        let items: Vec<Item> = matched.into_iter().skip(offset).take(page_size).collect();
        let consumed = offset + items.len();
        let next_token = (consumed < total).then(|| self.issue_token(&request.query, consumed));

        debug!(
            domain = %statement.domain,
            returned = items.len(),
            more = next_token.is_some(),
            "select"
        );
        Ok(SelectPage { items, next_token })
    }
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

/// An object held by [`InMemoryObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Buckets are implicit. A bucket can be
/// marked as rejecting with [`reject_bucket`](Self::reject_bucket), after which
/// every call touching it fails with [`StoreError::Unavailable`].
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    rejected: RwLock<HashSet<String>>,
}

impl InMemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            rejected: RwLock::new(HashSet::new()),
        }
    }

    /// Number of objects across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no object is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// The object at `bucket/key`, if any.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Sorted keys of every object in a bucket.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Make every call on `bucket` fail until [`accept_bucket`](Self::accept_bucket).
    pub fn reject_bucket(&self, bucket: &str) {
        self.rejected
            .write()
            .expect("lock poisoned")
            .insert(bucket.to_string());
    }

    pub fn accept_bucket(&self, bucket: &str) {
        self.rejected.write().expect("lock poisoned").remove(bucket);
    }

    fn check_bucket(&self, bucket: &str) -> StoreResult<()> {
        if self.rejected.read().expect("lock poisoned").contains(bucket) {
            return Err(StoreError::Unavailable(format!("bucket {bucket} rejected the request")));
        }
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        self.check_bucket(bucket)?;
        debug!(bucket, key, size = data.len(), "put object");
        self.objects.write().expect("lock poisoned").insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        self.check_bucket(bucket)?;
        self.object(bucket, key)
            .map(|obj| obj.data)
            .ok_or_else(|| StoreError::NoSuchObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.check_bucket(bucket)?;
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
