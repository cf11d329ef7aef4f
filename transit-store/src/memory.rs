//! In-memory document store for development and testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use transit_core::store::{
    DocPath, Document, DocumentStore, FieldUpdates, PendingWrite, Query, StoreError, StoreResult,
    StoreTransaction, WriteMode,
};

#[derive(Debug, Clone)]
struct StoredDoc {
    data: Value,
    version: u64,
}

#[derive(Default)]
struct Inner {
    docs: RwLock<HashMap<DocPath, StoredDoc>>,
    versions: AtomicU64,
}

impl Inner {
    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Versioned documents behind one lock. Transactions are optimistic: reads
/// record the version they saw (0 for an absent document) and commit fails
/// with [`StoreError::Conflict`] if any of them moved.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
    ordered_queries: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_ordered_queries(true)
    }

    /// `ordered_queries = false` behaves like a backend without the indexes
    /// needed to sort server-side: ordered queries are refused.
    pub fn with_ordered_queries(ordered_queries: bool) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            ordered_queries,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn apply(&self, path: &DocPath, write: PendingWrite) -> StoreResult<()> {
        let mut docs = self.inner.docs.write().await;
        let next = write.apply(path, docs.get(path).map(|d| &d.data))?;
        match next {
            Some(data) => {
                let version = self.inner.next_version();
                docs.insert(path.clone(), StoredDoc { data, version });
            }
            None => {
                docs.remove(path);
            }
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let docs = self.inner.docs.read().await;
        Ok(docs.get(path).map(|d| Document {
            path: path.clone(),
            data: d.data.clone(),
            version: d.version,
        }))
    }

    async fn set(&self, path: &DocPath, data: Value, mode: WriteMode) -> StoreResult<()> {
        self.apply(path, PendingWrite::Set(data, mode)).await
    }

    async fn update(&self, path: &DocPath, fields: FieldUpdates) -> StoreResult<()> {
        self.apply(path, PendingWrite::Update(fields)).await
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.apply(path, PendingWrite::Delete).await
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        if query.order_by.is_some() && !self.ordered_queries {
            return Err(StoreError::Backend(format!(
                "ordered query on {} requires an index",
                query.collection
            )));
        }

        let docs = self.inner.docs.read().await;
        let mut results: Vec<Document> = docs
            .iter()
            .filter(|(path, doc)| path.collection == query.collection && query.matches(&doc.data))
            .map(|(path, doc)| Document {
                path: path.clone(),
                data: doc.data.clone(),
                version: doc.version,
            })
            .collect();

        // Insertion order is not kept by the map; give unordered results a stable order.
        results.sort_by(|a, b| a.path.id.cmp(&b.path.id));
        query.sort_documents(&mut results);
        Ok(results)
    }

    async fn supports_ordering(&self, _query: &Query) -> bool {
        self.ordered_queries
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }
}

pub struct MemoryTransaction {
    store: InMemoryStore,
    reads: HashMap<DocPath, u64>,
    writes: Vec<(DocPath, PendingWrite)>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, path: &DocPath) -> StoreResult<Option<Document>> {
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite(path.to_string()));
        }

        let doc = self.store.get(path).await?;
        let version = doc.as_ref().map(|d| d.version).unwrap_or(0);
        self.reads.entry(path.clone()).or_insert(version);
        Ok(doc)
    }

    fn set(&mut self, path: &DocPath, data: Value, mode: WriteMode) {
        self.writes.push((path.clone(), PendingWrite::Set(data, mode)));
    }

    fn update(&mut self, path: &DocPath, fields: FieldUpdates) {
        self.writes.push((path.clone(), PendingWrite::Update(fields)));
    }

    fn delete(&mut self, path: &DocPath) {
        self.writes.push((path.clone(), PendingWrite::Delete));
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let inner = &self.store.inner;
        let mut docs = inner.docs.write().await;

        for (path, seen) in &self.reads {
            let current = docs.get(path).map(|d| d.version).unwrap_or(0);
            if current != *seen {
                debug!(path = %path, seen, current, "Read version moved, aborting commit");
                return Err(StoreError::Conflict(path.to_string()));
            }
        }

        // Stage everything first so a failing write leaves the store untouched.
        let mut staged: HashMap<DocPath, Option<Value>> = HashMap::new();
        for (path, write) in &self.writes {
            let current = match staged.get(path) {
                Some(value) => value.clone(),
                None => docs.get(path).map(|d| d.data.clone()),
            };
            let next = write.apply(path, current.as_ref())?;
            staged.insert(path.clone(), next);
        }

        for (path, next) in staged {
            match next {
                Some(data) => {
                    let version = inner.next_version();
                    docs.insert(path, StoredDoc { data, version });
                }
                None => {
                    docs.remove(&path);
                }
            }
        }
        Ok(())
    }
}
