use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use transit_core::models::{BusPricing, RegistrationStatus, User};
use transit_core::store::{collections, DocPath, DocumentStore, Query};
use transit_core::{EngineError, EngineResult};

/// Driver bus registrations and their admin review.
///
/// A bus is the `busDetails` of a driver's user document; the bus id is the
/// driver's user id.
pub struct BusRegistry {
    store: Arc<dyn DocumentStore>,
}

impl BusRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn user_path(user_id: &str) -> DocPath {
        DocPath::new(collections::USERS, user_id)
    }

    async fn user(&self, user_id: &str, missing: &str) -> EngineResult<User> {
        let doc = self
            .store
            .get(&Self::user_path(user_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("{}: {}", missing, user_id)))?;
        Ok(doc.decode()?)
    }

    /// The driver record carrying the bus. NotFound if absent or not a bus.
    pub async fn get_bus(&self, bus_id: &str) -> EngineResult<User> {
        let user = self.user(bus_id, "Bus not found").await?;
        if user.bus_details.is_none() {
            return Err(EngineError::NotFound(format!("Bus not found: {}", bus_id)));
        }
        Ok(user)
    }

    async fn drivers_with_status(&self, status: RegistrationStatus) -> EngineResult<Vec<User>> {
        let query = Query::new(collections::USERS)
            .eq("userType", "driver")
            .eq("busDetails.status", json!(status));
        let docs = self.store.query(&query).await?;
        docs.iter()
            .map(|d| d.decode::<User>().map_err(EngineError::from))
            .filter(|u| u.as_ref().map_or(true, |u| u.bus_details.is_some()))
            .collect()
    }

    pub async fn list_pending_registrations(&self) -> EngineResult<Vec<User>> {
        self.drivers_with_status(RegistrationStatus::Pending).await
    }

    pub async fn list_approved_buses(&self) -> EngineResult<Vec<User>> {
        self.drivers_with_status(RegistrationStatus::Approved).await
    }

    async fn registration(&self, user_id: &str) -> EngineResult<User> {
        let user = self.user(user_id, "User not found").await?;
        if user.bus_details.is_none() {
            return Err(EngineError::NotFound(format!("Bus details not found for user {}", user_id)));
        }
        Ok(user)
    }

    pub async fn approve_registration(&self, user_id: &str) -> EngineResult<()> {
        self.registration(user_id).await?;
        self.store
            .update(
                &Self::user_path(user_id),
                vec![
                    ("busDetails.status".into(), json!(RegistrationStatus::Approved)),
                    ("busDetails.approvedAt".into(), json!(Utc::now())),
                ],
            )
            .await?;
        info!(user_id, "Bus registration approved");
        Ok(())
    }

    pub async fn reject_registration(&self, user_id: &str, reason: Option<&str>) -> EngineResult<()> {
        self.registration(user_id).await?;
        let reason = reason.filter(|r| !r.trim().is_empty()).unwrap_or("No reason provided");
        self.store
            .update(
                &Self::user_path(user_id),
                vec![
                    ("busDetails.status".into(), json!(RegistrationStatus::Rejected)),
                    ("busDetails.rejectedAt".into(), json!(Utc::now())),
                    ("busDetails.rejectionReason".into(), json!(reason)),
                ],
            )
            .await?;
        info!(user_id, reason, "Bus registration rejected");
        Ok(())
    }

    pub async fn update_pricing(&self, driver_id: &str, pricing: BusPricing) -> EngineResult<BusPricing> {
        self.user(driver_id, "Driver not found").await?;
        if pricing.default_price_per_person < 0.0 || pricing.booking_commission < 0.0 {
            return Err(EngineError::ValidationError("Prices must not be negative".to_string()));
        }

        let pricing = BusPricing {
            updated_at: Some(Utc::now()),
            ..pricing
        };
        self.store
            .update(
                &Self::user_path(driver_id),
                vec![("busDetails.pricing".into(), json!(pricing))],
            )
            .await?;
        info!(driver_id, "Bus pricing updated");
        Ok(pricing)
    }

    /// Stored pricing, or zeros when the driver never set any.
    pub async fn get_pricing(&self, driver_id: &str) -> EngineResult<BusPricing> {
        let user = self.user(driver_id, "Driver not found").await?;
        Ok(user.bus_details.and_then(|bus| bus.pricing).unwrap_or_default())
    }
}
