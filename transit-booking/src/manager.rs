use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use transit_core::models::{Booking, BookingStatus};
use transit_core::store::{collections, Direction, DocPath, DocumentStore, Query};
use transit_core::{EngineError, EngineResult};

/// Reads over committed bookings and their status changes.
pub struct BookingManager {
    store: Arc<dyn DocumentStore>,
}

impl BookingManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn path(booking_id: &str) -> DocPath {
        DocPath::new(collections::BOOKINGS, booking_id)
    }

    pub async fn get_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        let doc = self
            .store
            .get(&Self::path(booking_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Booking not found: {}", booking_id)))?;
        Ok(doc.decode()?)
    }

    async fn list_newest_first(&self, field: &str, value: &str) -> EngineResult<Vec<Booking>> {
        let query = Query::new(collections::BOOKINGS)
            .eq(field, value)
            .order_by("createdAt", Direction::Desc);
        let docs = self.store.query_ordered(&query).await?;
        docs.iter()
            .map(|d| d.decode::<Booking>().map_err(EngineError::from))
            .collect()
    }

    pub async fn list_passenger_bookings(&self, user_id: &str) -> EngineResult<Vec<Booking>> {
        self.list_newest_first("userId", user_id).await
    }

    /// Bookings made on the driver's bus.
    pub async fn list_driver_bookings(&self, driver_id: &str) -> EngineResult<Vec<Booking>> {
        self.list_newest_first("busId", driver_id).await
    }

    /// Record a status change. Seats held by the booking are not released.
    pub async fn update_booking_status(&self, booking_id: &str, status: BookingStatus) -> EngineResult<Booking> {
        let path = Self::path(booking_id);
        if self.store.get(&path).await?.is_none() {
            return Err(EngineError::NotFound(format!("Booking not found: {}", booking_id)));
        }

        let now = Utc::now();
        let stamp = match status {
            BookingStatus::Confirmed => "confirmedAt",
            BookingStatus::Cancelled => "cancelledAt",
        };
        self.store
            .update(
                &path,
                vec![
                    ("status".into(), json!(status)),
                    ("updatedAt".into(), json!(now)),
                    (stamp.into(), json!(now)),
                ],
            )
            .await?;
        info!(booking_id, status = ?status, "Booking status updated");
        self.get_booking(booking_id).await
    }
}
