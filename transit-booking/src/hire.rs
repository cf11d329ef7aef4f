//! Private hire negotiation between a passenger and a driver.
//!
//! The status is deliberately not a strict state machine: any status may be
//! set from any other, and the quoted price and driver notes are recorded
//! whenever they are supplied.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use transit_core::models::{HireParty, HireRequest, HireStatus, NewHireRequest};
use transit_core::store::{
    collections, encode, new_document_id, Direction, DocPath, DocumentStore, FieldUpdates, Query, WriteMode,
};
use transit_core::{EngineError, EngineResult};

pub struct HireNegotiation {
    store: Arc<dyn DocumentStore>,
}

impl HireNegotiation {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn path(request_id: &str) -> DocPath {
        DocPath::new(collections::HIRE_REQUESTS, request_id)
    }

    pub async fn create_hire_request(&self, new_request: NewHireRequest) -> EngineResult<HireRequest> {
        let bus = self
            .store
            .get(&DocPath::new(collections::USERS, &new_request.bus_id))
            .await?;
        if bus.is_none() {
            return Err(EngineError::NotFound(format!("Bus not found: {}", new_request.bus_id)));
        }
        if new_request.passenger_count == 0 {
            return Err(EngineError::ValidationError("Passenger count must be at least 1".to_string()));
        }
        transit_shared::parse_travel_date(&new_request.travel_date)?;

        let request = new_request.into_request(new_document_id());
        let path = Self::path(&request.id);
        self.store.set(&path, encode(&path, &request)?, WriteMode::Overwrite).await?;
        info!(request_id = %request.id, bus_id = %request.bus_id, "Hire request created");
        Ok(request)
    }

    pub async fn get_hire_request(&self, request_id: &str) -> EngineResult<HireRequest> {
        let doc = self
            .store
            .get(&Self::path(request_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Hire request not found: {}", request_id)))?;
        Ok(doc.decode()?)
    }

    /// Requests made by a passenger, or addressed to a driver's bus; newest first.
    pub async fn list_hire_requests(&self, user_id: &str, party: HireParty) -> EngineResult<Vec<HireRequest>> {
        let field = match party {
            HireParty::Passenger => "userId",
            HireParty::Driver => "busId",
        };
        let query = Query::new(collections::HIRE_REQUESTS)
            .eq(field, user_id)
            .order_by("createdAt", Direction::Desc);
        let docs = self.store.query_ordered(&query).await?;
        docs.iter()
            .map(|d| d.decode::<HireRequest>().map_err(EngineError::from))
            .collect()
    }

    pub async fn update_hire_request_status(
        &self,
        request_id: &str,
        status: HireStatus,
        final_price: Option<f64>,
        driver_notes: Option<&str>,
    ) -> EngineResult<HireRequest> {
        let path = Self::path(request_id);
        if self.store.get(&path).await?.is_none() {
            return Err(EngineError::NotFound(format!("Hire request not found: {}", request_id)));
        }
        if final_price.is_some_and(|p| p < 0.0) {
            return Err(EngineError::ValidationError("Final price must not be negative".to_string()));
        }

        let now = Utc::now();
        let mut fields: FieldUpdates = vec![("status".into(), json!(status)), ("updatedAt".into(), json!(now))];
        if let Some(stamp) = status.timestamp_field() {
            fields.push((stamp.into(), json!(now)));
        }
        if let Some(price) = final_price {
            fields.push(("finalPrice".into(), json!(price)));
        }
        if let Some(notes) = driver_notes.filter(|n| !n.is_empty()) {
            fields.push(("driverNotes".into(), json!(notes)));
        }

        self.store.update(&path, fields).await?;
        info!(request_id, status = ?status, "Hire request status updated");
        self.get_hire_request(request_id).await
    }
}
