pub mod app_config;
pub mod database;
pub mod memory;

pub use app_config::{Config, LayoutConfig, StoreBackend};
pub use database::{DbClient, PgDocumentStore};
pub use memory::InMemoryStore;

use std::sync::Arc;
use tracing::info;
use transit_core::models::CanonicalRoutes;
use transit_core::store::{collections, DocPath, DocumentStore, WriteMode};

/// Build the document store selected by `[store] backend`.
pub async fn connect(config: &app_config::StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreSetupError> {
    match config.backend {
        StoreBackend::Memory => {
            info!(ordered_queries = config.ordered_queries, "Using in-memory document store");
            Ok(Arc::new(InMemoryStore::with_ordered_queries(config.ordered_queries)))
        }
        StoreBackend::Postgres => {
            let url = config
                .url
                .as_deref()
                .ok_or(StoreSetupError::MissingUrl)?;
            let client = DbClient::new(url, config.max_connections).await?;
            client.migrate().await?;
            Ok(Arc::new(PgDocumentStore::new(client)))
        }
    }
}

/// Make sure every configured route name is in the canonical route list.
pub async fn seed_routes(store: &dyn DocumentStore, seed: &[String]) -> Result<usize, transit_core::StoreError> {
    let path = DocPath::new(collections::ROUTES, CanonicalRoutes::DOC_ID);
    let mut canonical = match store.get(&path).await? {
        Some(doc) => doc.decode::<CanonicalRoutes>()?,
        None => CanonicalRoutes::default(),
    };

    let mut added = 0;
    for name in seed {
        if !canonical.contains(name) {
            canonical.routes.push(name.trim().to_string());
            added += 1;
        }
    }

    if added > 0 {
        canonical.updated_at = Some(chrono::Utc::now());
        let data = transit_core::store::encode(&path, &canonical)?;
        store.set(&path, data, WriteMode::Overwrite).await?;
        info!(added, "Seeded canonical routes");
    }
    Ok(added)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreSetupError {
    #[error("store.url must be set for the postgres backend")]
    MissingUrl,

    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_routes_is_idempotent() {
        let store = InMemoryStore::new();
        let seed = vec!["Colombo to Kandy".to_string(), "Colombo to Galle".to_string()];

        assert_eq!(seed_routes(&store, &seed).await.unwrap(), 2);
        assert_eq!(seed_routes(&store, &seed).await.unwrap(), 0);

        let doc = store
            .get(&DocPath::new(collections::ROUTES, CanonicalRoutes::DOC_ID))
            .await
            .unwrap()
            .unwrap();
        let routes: CanonicalRoutes = doc.decode().unwrap();
        assert_eq!(routes.routes.len(), 2);
    }

    #[tokio::test]
    async fn test_postgres_backend_needs_url() {
        let config = app_config::StoreConfig {
            backend: StoreBackend::Postgres,
            url: None,
            max_connections: 1,
            ordered_queries: true,
        };
        assert!(matches!(connect(&config).await, Err(StoreSetupError::MissingUrl)));
    }
}
