use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use transit_core::models::{CanonicalRoutes, RouteRequest, RouteRequestStatus};
use transit_core::store::{collections, encode, new_document_id, Direction, DocPath, DocumentStore, Query, WriteMode};
use transit_core::{EngineError, EngineResult};

/// The canonical route names and drivers' requests to extend them.
pub struct RouteCatalog {
    store: Arc<dyn DocumentStore>,
}

impl RouteCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn canonical_path() -> DocPath {
        DocPath::new(collections::ROUTES, CanonicalRoutes::DOC_ID)
    }

    fn request_path(request_id: &str) -> DocPath {
        DocPath::new(collections::ROUTE_REQUESTS, request_id)
    }

    async fn canonical(&self) -> EngineResult<CanonicalRoutes> {
        match self.store.get(&Self::canonical_path()).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Ok(CanonicalRoutes::default()),
        }
    }

    pub async fn list_routes(&self) -> EngineResult<Vec<String>> {
        Ok(self.canonical().await?.routes)
    }

    pub async fn submit_route_request(&self, driver_id: &str, route_name: &str) -> EngineResult<RouteRequest> {
        let route_name = route_name.trim();
        if route_name.is_empty() {
            return Err(EngineError::ValidationError("Route name is required".to_string()));
        }
        if self.canonical().await?.contains(route_name) {
            return Err(EngineError::ValidationError(format!("Route already exists: {}", route_name)));
        }

        let request = RouteRequest {
            id: new_document_id(),
            driver_id: driver_id.to_string(),
            route_name: route_name.to_string(),
            status: RouteRequestStatus::Pending,
            rejection_reason: None,
            created_at: Utc::now(),
            reviewed_at: None,
        };
        let path = Self::request_path(&request.id);
        self.store.set(&path, encode(&path, &request)?, WriteMode::Overwrite).await?;
        info!(request_id = %request.id, driver_id, route_name, "Route request submitted");
        Ok(request)
    }

    /// Pending requests, oldest first.
    pub async fn list_pending_route_requests(&self) -> EngineResult<Vec<RouteRequest>> {
        let query = Query::new(collections::ROUTE_REQUESTS)
            .eq("status", json!(RouteRequestStatus::Pending))
            .order_by("createdAt", Direction::Asc);
        let docs = self.store.query_ordered(&query).await?;
        docs.iter()
            .map(|d| d.decode::<RouteRequest>().map_err(EngineError::from))
            .collect()
    }

    /// Add the requested name to the canonical list and close the request,
    /// both in one transaction.
    pub async fn approve_route_request(&self, request_id: &str) -> EngineResult<RouteRequest> {
        let request_path = Self::request_path(request_id);
        let canonical_path = Self::canonical_path();

        let mut txn = self.store.begin().await?;
        let mut request = Self::pending(txn.get(&request_path).await?.map(|d| d.decode()).transpose()?, request_id)?;
        let mut canonical: CanonicalRoutes = txn
            .get(&canonical_path)
            .await?
            .map(|d| d.decode())
            .transpose()?
            .unwrap_or_default();

        if canonical.contains(&request.route_name) {
            return Err(EngineError::ValidationError(format!(
                "Route already exists: {}",
                request.route_name
            )));
        }

        let now = Utc::now();
        canonical.routes.push(request.route_name.clone());
        canonical.updated_at = Some(now);
        request.status = RouteRequestStatus::Approved;
        request.reviewed_at = Some(now);

        txn.set(&canonical_path, encode(&canonical_path, &canonical)?, WriteMode::Overwrite);
        txn.set(&request_path, encode(&request_path, &request)?, WriteMode::Overwrite);
        txn.commit().await?;

        info!(request_id, route_name = %request.route_name, "Route request approved");
        Ok(request)
    }

    pub async fn reject_route_request(&self, request_id: &str, reason: Option<&str>) -> EngineResult<RouteRequest> {
        let path = Self::request_path(request_id);
        let mut txn = self.store.begin().await?;
        let mut request = Self::pending(txn.get(&path).await?.map(|d| d.decode()).transpose()?, request_id)?;

        request.status = RouteRequestStatus::Rejected;
        request.rejection_reason = Some(
            reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or("No reason provided")
                .to_string(),
        );
        request.reviewed_at = Some(Utc::now());

        txn.set(&path, encode(&path, &request)?, WriteMode::Overwrite);
        txn.commit().await?;
        info!(request_id, "Route request rejected");
        Ok(request)
    }

    fn pending(request: Option<RouteRequest>, request_id: &str) -> EngineResult<RouteRequest> {
        let request =
            request.ok_or_else(|| EngineError::NotFound(format!("Route request not found: {}", request_id)))?;
        if request.status != RouteRequestStatus::Pending {
            return Err(EngineError::ValidationError(format!(
                "Route request {} has already been reviewed",
                request_id
            )));
        }
        Ok(request)
    }
}
