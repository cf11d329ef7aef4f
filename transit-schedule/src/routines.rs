//! Recurring weekly routines and their admin approval.
//!
//! A routine is created `pending_approval` and moves exactly once, to
//! `approved` or `rejected`. Approval and rejection read and write the
//! routine in one transaction so two reviewers cannot both decide it.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use transit_core::models::{Routine, RoutineChanges, RoutineDraft, RoutineStatus};
use transit_core::store::{
    collections, encode, new_document_id, Direction, DocPath, DocumentStore, FieldUpdates, Query, WriteMode,
};
use transit_core::{EngineError, EngineResult};

pub struct RoutineManager {
    store: Arc<dyn DocumentStore>,
}

impl RoutineManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn path(routine_id: &str) -> DocPath {
        DocPath::new(collections::ROUTINES, routine_id)
    }

    fn not_found(routine_id: &str) -> EngineError {
        EngineError::NotFound(format!("Routine not found: {}", routine_id))
    }

    pub async fn create_routine(&self, draft: RoutineDraft) -> EngineResult<Routine> {
        if draft.route.trim().is_empty() {
            return Err(EngineError::ValidationError("Route is required".to_string()));
        }
        if draft.days_of_week.is_empty() {
            return Err(EngineError::ValidationError("Select at least one day of the week".to_string()));
        }
        if draft.time_slot.end_time <= draft.time_slot.start_time {
            return Err(EngineError::ValidationError("End time must be after start time".to_string()));
        }
        if draft.price_per_person < 0.0 || draft.booking_commission < 0.0 {
            return Err(EngineError::ValidationError("Prices must not be negative".to_string()));
        }

        let routine = draft.into_routine(new_document_id());
        let path = Self::path(&routine.id);
        self.store.set(&path, encode(&path, &routine)?, WriteMode::Overwrite).await?;
        info!(routine_id = %routine.id, driver_id = %routine.driver_id, route = %routine.route, "Routine submitted");
        Ok(routine)
    }

    pub async fn get_routine(&self, routine_id: &str) -> EngineResult<Routine> {
        let doc = self
            .store
            .get(&Self::path(routine_id))
            .await?
            .ok_or_else(|| Self::not_found(routine_id))?;
        Ok(doc.decode()?)
    }

    /// Apply the supplied field changes. The approval status is left as is.
    pub async fn update_routine(&self, routine_id: &str, changes: RoutineChanges) -> EngineResult<Routine> {
        let path = Self::path(routine_id);
        if self.store.get(&path).await?.is_none() {
            return Err(Self::not_found(routine_id));
        }
        if let Some(slot) = &changes.time_slot {
            if slot.end_time <= slot.start_time {
                return Err(EngineError::ValidationError("End time must be after start time".to_string()));
            }
        }

        self.store.update(&path, changes.into_field_updates()).await?;
        info!(routine_id, "Routine updated");
        self.get_routine(routine_id).await
    }

    pub async fn delete_routine(&self, routine_id: &str) -> EngineResult<()> {
        let path = Self::path(routine_id);
        if self.store.get(&path).await?.is_none() {
            return Err(Self::not_found(routine_id));
        }
        self.store.delete(&path).await?;
        info!(routine_id, "Routine deleted");
        Ok(())
    }

    pub async fn approve_routine(&self, routine_id: &str) -> EngineResult<Routine> {
        let now = Utc::now();
        self.decide(
            routine_id,
            vec![
                ("status".into(), json!(RoutineStatus::Approved)),
                ("approvedAt".into(), json!(now)),
                ("updatedAt".into(), json!(now)),
            ],
        )
        .await?;
        info!(routine_id, "Routine approved");
        self.get_routine(routine_id).await
    }

    pub async fn reject_routine(&self, routine_id: &str, reason: &str) -> EngineResult<Routine> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::ValidationError("A rejection reason is required".to_string()));
        }

        let now = Utc::now();
        self.decide(
            routine_id,
            vec![
                ("status".into(), json!(RoutineStatus::Rejected)),
                ("rejectionReason".into(), json!(reason)),
                ("rejectedAt".into(), json!(now)),
                ("updatedAt".into(), json!(now)),
            ],
        )
        .await?;
        info!(routine_id, reason, "Routine rejected");
        self.get_routine(routine_id).await
    }

    async fn decide(&self, routine_id: &str, fields: FieldUpdates) -> EngineResult<()> {
        let path = Self::path(routine_id);
        let mut txn = self.store.begin().await?;
        let routine: Routine = txn
            .get(&path)
            .await?
            .ok_or_else(|| Self::not_found(routine_id))?
            .decode()?;

        if routine.status != RoutineStatus::PendingApproval {
            return Err(EngineError::ValidationError(format!(
                "Routine {} has already been reviewed",
                routine_id
            )));
        }

        txn.update(&path, fields);
        txn.commit().await?;
        Ok(())
    }

    async fn list(&self, query: Query) -> EngineResult<Vec<Routine>> {
        let docs = self.store.query_ordered(&query).await?;
        docs.iter()
            .map(|d| d.decode::<Routine>().map_err(EngineError::from))
            .collect()
    }

    /// All of a driver's routines whatever their status, newest first.
    pub async fn list_routines_by_driver(&self, driver_id: &str) -> EngineResult<Vec<Routine>> {
        self.list(
            Query::new(collections::ROUTINES)
                .eq("driverId", driver_id)
                .order_by("createdAt", Direction::Desc),
        )
        .await
    }

    /// Approved routines of a bus, oldest first.
    pub async fn list_routines_by_bus(&self, bus_id: &str) -> EngineResult<Vec<Routine>> {
        self.list(
            Query::new(collections::ROUTINES)
                .eq("busId", bus_id)
                .eq("status", json!(RoutineStatus::Approved))
                .order_by("createdAt", Direction::Asc),
        )
        .await
    }

    pub async fn list_pending_routines(&self) -> EngineResult<Vec<Routine>> {
        self.list(
            Query::new(collections::ROUTINES)
                .eq("status", json!(RoutineStatus::PendingApproval))
                .order_by("createdAt", Direction::Desc),
        )
        .await
    }

    /// Approved routines of a driver, in no particular order.
    pub async fn approved_routines_of_driver(&self, driver_id: &str) -> EngineResult<Vec<Routine>> {
        self.list(
            Query::new(collections::ROUTINES)
                .eq("driverId", driver_id)
                .eq("status", json!(RoutineStatus::Approved)),
        )
        .await
    }

    pub async fn approved_routines(&self) -> EngineResult<Vec<Routine>> {
        self.list(Query::new(collections::ROUTINES).eq("status", json!(RoutineStatus::Approved)))
            .await
    }
}
