//! PostgreSQL-backed document store.
//!
//! All documents live in one `documents` table keyed by `(collection, id)`
//! with the body as JSONB. Transactions run at SERIALIZABLE isolation and
//! additionally re-check the versions they read before writing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Arguments, Pool, Postgres, Transaction};
use tracing::{debug, info};

use transit_core::store::{
    value, Direction, DocPath, Document, DocumentStore, FieldUpdates, Filter, FilterOp, OrderBy, PendingWrite,
    Query, StoreError, StoreResult, StoreTransaction, WriteMode,
};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Value>,
    version: i64,
}

impl DocumentRow {
    fn into_document(self, collection: &str) -> Document {
        Document {
            path: DocPath::new(collection, self.id),
            data: self.data.0,
            version: self.version as u64,
        }
    }
}

/// Serialization failures and deadlocks mean another transaction won.
fn map_db_error(path: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return StoreError::Conflict(path.to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

/// Leading shape of an RFC 3339 timestamp; guards the `timestamptz` casts.
const TIMESTAMP_PATTERN: &str = r"'^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}'";

fn comparison(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Gte => ">=",
        FilterOp::Lte => "<=",
        FilterOp::Lt => "<",
    }
}

// Serialized timestamps vary in fractional digits, so JSONB string order is
// not chronological. Timestamp bounds compare as `timestamptz` instead.
fn filter_sql(filter: &Filter, path_param: usize) -> String {
    let (k, m) = (path_param, path_param + 1);
    let op = comparison(filter.op);
    match filter.value.as_str().and_then(value::as_timestamp) {
        Some(_) => format!(
            " AND CASE WHEN data #>> ${k}::text[] ~ {TIMESTAMP_PATTERN} \
             THEN (data #>> ${k}::text[])::timestamptz {op} (${m}::jsonb #>> '{{}}')::timestamptz ELSE false END"
        ),
        None => format!(" AND data #> ${k}::text[] {op} ${m}::jsonb"),
    }
}

fn order_sql(order: &OrderBy, path_param: usize) -> String {
    let k = path_param;
    let direction = match order.direction {
        Direction::Asc => "ASC NULLS FIRST",
        Direction::Desc => "DESC NULLS LAST",
    };
    format!(
        " ORDER BY CASE WHEN data #>> ${k}::text[] ~ {TIMESTAMP_PATTERN} \
         THEN (data #>> ${k}::text[])::timestamptz END {direction}, data #> ${k}::text[] {direction}, id"
    )
}

fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

const SELECT_ONE: &str = "SELECT id, data, version FROM documents WHERE collection = $1 AND id = $2";
const SELECT_ONE_FOR_UPDATE: &str =
    "SELECT id, data, version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE";
const UPSERT: &str = "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) \
     ON CONFLICT (collection, id) DO UPDATE \
     SET data = EXCLUDED.data, version = nextval('document_versions'), updated_at = NOW()";
const DELETE: &str = "DELETE FROM documents WHERE collection = $1 AND id = $2";

async fn fetch_row(
    conn: &mut sqlx::PgConnection,
    sql: &str,
    path: &DocPath,
) -> StoreResult<Option<DocumentRow>> {
    sqlx::query_as::<_, DocumentRow>(sql)
        .bind(&path.collection)
        .bind(&path.id)
        .fetch_optional(conn)
        .await
        .map_err(|e| map_db_error(&path.to_string(), e))
}

async fn write_row(conn: &mut sqlx::PgConnection, path: &DocPath, next: Option<Value>) -> StoreResult<()> {
    let result = match next {
        Some(data) => {
            sqlx::query(UPSERT)
                .bind(&path.collection)
                .bind(&path.id)
                .bind(Json(data))
                .execute(conn)
                .await
        }
        None => {
            sqlx::query(DELETE)
                .bind(&path.collection)
                .bind(&path.id)
                .execute(conn)
                .await
        }
    };
    result.map(|_| ()).map_err(|e| map_db_error(&path.to_string(), e))
}

pub struct PgDocumentStore {
    client: DbClient,
}

impl PgDocumentStore {
    pub fn new(client: DbClient) -> Self {
        Self { client }
    }

    async fn begin_serializable(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .client
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(tx)
    }

    /// Single-document read-modify-write for non-transactional writes.
    async fn apply(&self, path: &DocPath, write: PendingWrite) -> StoreResult<()> {
        let mut tx = self.begin_serializable().await?;
        let current = fetch_row(&mut tx, SELECT_ONE_FOR_UPDATE, path).await?;
        let next = write.apply(path, current.as_ref().map(|row| &row.data.0))?;
        write_row(&mut tx, path, next).await?;
        tx.commit().await.map_err(|e| map_db_error(&path.to_string(), e))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let mut conn = self
            .client
            .pool
            .acquire()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let row = fetch_row(&mut conn, SELECT_ONE, path).await?;
        Ok(row.map(|r| r.into_document(&path.collection)))
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
        let mut sql = String::from("SELECT id, data, version FROM documents WHERE collection = $1");
        let mut args = PgArguments::default();
        let bind_err = |e: Box<dyn std::error::Error + Send + Sync>| StoreError::Backend(e.to_string());
        args.add(&query.collection).map_err(bind_err)?;
        let mut n = 1;

        for filter in &query.filters {
            sql.push_str(&filter_sql(filter, n + 1));
            args.add(field_path(&filter.field)).map_err(bind_err)?;
            args.add(Json(filter.value.clone())).map_err(bind_err)?;
            n += 2;
        }

        match &query.order_by {
            Some(order) => {
                sql.push_str(&order_sql(order, n + 1));
                args.add(field_path(&order.field)).map_err(bind_err)?;
            }
            None => sql.push_str(" ORDER BY id"),
        }

        debug!(collection = %query.collection, filters = query.filters.len(), "Running document query");
        let rows = sqlx::query_as_with::<_, DocumentRow, _>(&sql, args)
            .fetch_all(&self.client.pool)
            .await
            .map_err(|e| map_db_error(&query.collection, e))?;

        Ok(rows.into_iter().map(|r| r.into_document(&query.collection)).collect())
    }

    async fn supports_ordering(&self, _query: &Query) -> bool {
        // Any JSONB path can be sorted on; large collections only get slower.
        true
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.begin_serializable().await?;
        Ok(Box::new(PgTransaction {
            tx,
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
    /// Version and body of every document read, `None` if it was absent.
    reads: HashMap<DocPath, Option<(u64, Value)>>,
    writes: Vec<(DocPath, PendingWrite)>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn get(&mut self, path: &DocPath) -> StoreResult<Option<Document>> {
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite(path.to_string()));
        }

        let row = fetch_row(&mut self.tx, SELECT_ONE, path).await?;
        let doc = row.map(|r| r.into_document(&path.collection));
        self.reads
            .entry(path.clone())
            .or_insert_with(|| doc.as_ref().map(|d| (d.version, d.data.clone())));
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
        let PgTransaction { mut tx, reads, writes } = *self;

        for (path, seen) in &reads {
            let current = fetch_row(&mut tx, SELECT_ONE_FOR_UPDATE, path).await?;
            let current_version = current.map(|r| r.version as u64);
            if current_version != seen.as_ref().map(|(v, _)| *v) {
                debug!(path = %path, "Read version moved, aborting commit");
                return Err(StoreError::Conflict(path.to_string()));
            }
        }

        let mut staged: HashMap<DocPath, Option<Value>> = HashMap::new();
        for (path, write) in &writes {
            let current = match staged.get(path) {
                Some(value) => value.clone(),
                None => match reads.get(path) {
                    Some(seen) => seen.as_ref().map(|(_, data)| data.clone()),
                    None => fetch_row(&mut tx, SELECT_ONE_FOR_UPDATE, path).await?.map(|r| r.data.0),
                },
            };
            let next = write.apply(path, current.as_ref())?;
            staged.insert(path.clone(), next);
        }

        for (path, next) in staged {
            write_row(&mut tx, &path, next).await?;
        }

        tx.commit().await.map_err(|e| map_db_error("commit", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_splits_dots() {
        assert_eq!(field_path("busDetails.status"), vec!["busDetails".to_string(), "status".to_string()]);
        assert_eq!(field_path("route"), vec!["route".to_string()]);
    }

    #[test]
    fn test_timestamp_filters_compare_as_timestamptz() {
        let query = Query::new("trips")
            .gte("departureTime", "2024-12-25T00:00:00Z")
            .lt("departureTime", "2024-12-26T00:00:00.5Z");

        let lower = filter_sql(&query.filters[0], 2);
        assert!(lower.contains("(data #>> $2::text[])::timestamptz >= ($3::jsonb #>> '{}')::timestamptz"));
        let upper = filter_sql(&query.filters[1], 4);
        assert!(upper.contains("(data #>> $4::text[])::timestamptz < ($5::jsonb #>> '{}')::timestamptz"));
        assert!(upper.contains("ELSE false END"));
    }

    #[test]
    fn test_plain_filters_compare_as_jsonb() {
        let query = Query::new("trips").eq("busId", "bus1").gte("availableSeats", 3);

        assert_eq!(filter_sql(&query.filters[0], 2), " AND data #> $2::text[] = $3::jsonb");
        assert_eq!(filter_sql(&query.filters[1], 4), " AND data #> $4::text[] >= $5::jsonb");
    }

    #[test]
    fn test_ordering_prefers_timestamp_key() {
        let query = Query::new("trips").order_by("departureTime", Direction::Desc);
        let sql = order_sql(query.order_by.as_ref().unwrap(), 2);

        assert!(sql.starts_with(" ORDER BY CASE WHEN data #>> $2::text[] ~ "));
        assert!(sql.contains("THEN (data #>> $2::text[])::timestamptz END DESC NULLS LAST"));
        assert!(sql.ends_with("data #> $2::text[] DESC NULLS LAST, id"));
    }
}
