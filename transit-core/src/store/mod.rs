//! Contract of the transactional document store the engine runs against.
//!
//! Documents are schema-less JSON values addressed by `collection/id`.
//! Typed records are decoded at this boundary so a malformed stored document
//! surfaces as [`StoreError::Malformed`] instead of propagating loose JSON.

pub mod query;
pub mod value;

pub use query::{Direction, Filter, FilterOp, OrderBy, Query};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::warn;

pub mod collections {
    pub const USERS: &str = "users";
    pub const SEAT_AVAILABILITY: &str = "seatAvailability";
    pub const TRIPS: &str = "trips";
    pub const BOOKINGS: &str = "bookings";
    pub const ROUTINES: &str = "routines";
    pub const DAILY_SCHEDULES: &str = "dailySchedules";
    pub const HIRE_REQUESTS: &str = "hireRequests";
    pub const ROUTE_REQUESTS: &str = "routeRequests";
    pub const ROUTES: &str = "routes";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Transaction conflict on {0}")]
    Conflict(String),

    #[error("Read of {0} after a buffered write; transactions must read before writing")]
    ReadAfterWrite(String),

    #[error("Malformed document {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: &str, id: impl Into<String>) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Fresh random id for a document created without a natural key.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone)]
pub struct Document {
    pub path: DocPath,
    pub data: Value,
    /// Monotonic per-store write stamp, used for optimistic conflict detection.
    pub version: u64,
}

impl Document {
    pub fn id(&self) -> &str {
        &self.path.id
    }

    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| StoreError::Malformed {
            path: self.path.to_string(),
            reason: e.to_string(),
        })
    }
}

pub fn encode<T: Serialize>(path: &DocPath, record: &T) -> StoreResult<Value> {
    serde_json::to_value(record).map_err(|e| StoreError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the whole document.
    Overwrite,
    /// Deep-merge object fields into the existing document, creating it if absent.
    Merge,
}

/// Dotted field path (`busDetails.status` style) paired with its new value.
pub type FieldUpdates = Vec<(String, Value)>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    async fn set(&self, path: &DocPath, data: Value, mode: WriteMode) -> StoreResult<()>;

    /// Apply field-path updates to an existing document; `NotFound` if absent.
    async fn update(&self, path: &DocPath, fields: FieldUpdates) -> StoreResult<()>;

    async fn delete(&self, path: &DocPath) -> StoreResult<()>;

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Capability probe: can the backend order this query server-side
    /// (i.e. does a suitable index exist)?
    async fn supports_ordering(&self, query: &Query) -> bool;

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Run `query` honouring its `order_by`. Uses server-side ordering when
    /// the backend supports it, otherwise fetches unordered and sorts in memory.
    async fn query_ordered(&self, query: &Query) -> StoreResult<Vec<Document>> {
        if query.order_by.is_none() || self.supports_ordering(query).await {
            return self.query(query).await;
        }

        warn!(
            collection = %query.collection,
            "No index for ordered query, falling back to in-memory sort"
        );
        let mut docs = self.query(&query.without_order()).await?;
        query.sort_documents(&mut docs);
        Ok(docs)
    }
}

/// One optimistic transaction. All reads must happen before the first write;
/// writes are buffered and applied atomically by `commit`, which fails with
/// [`StoreError::Conflict`] if any document read here changed in the meantime.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, path: &DocPath) -> StoreResult<Option<Document>>;

    fn set(&mut self, path: &DocPath, data: Value, mode: WriteMode);

    fn update(&mut self, path: &DocPath, fields: FieldUpdates);

    fn delete(&mut self, path: &DocPath);

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// A write buffered by a transaction until commit.
#[derive(Debug, Clone)]
pub enum PendingWrite {
    Set(Value, WriteMode),
    Update(FieldUpdates),
    Delete,
}

impl PendingWrite {
    /// Result of applying this write on top of `current`. `None` means the
    /// document no longer exists afterwards.
    pub fn apply(&self, path: &DocPath, current: Option<&Value>) -> StoreResult<Option<Value>> {
        match self {
            Self::Set(data, WriteMode::Overwrite) => Ok(Some(data.clone())),
            Self::Set(data, WriteMode::Merge) => {
                let mut merged = current.cloned().unwrap_or_else(|| Value::Object(Default::default()));
                value::merge(&mut merged, data);
                Ok(Some(merged))
            }
            Self::Update(fields) => {
                let mut updated = current
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
                for (field, new_value) in fields {
                    value::set_field(&mut updated, field, new_value.clone());
                }
                Ok(Some(updated))
            }
            Self::Delete => Ok(None),
        }
    }
}
