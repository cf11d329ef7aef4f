//! Per-date status of routines.
//!
//! A routine has no stored override for most dates; those read back as
//! `available`. Status changes are recorded as given, in any order.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use transit_core::models::{daily_schedule_id, DailySchedule, RoutineAvailability, ScheduledRoutine};
use transit_core::store::{collections, DocPath, DocumentStore, WriteMode};
use transit_core::{EngineError, EngineResult};
use transit_shared::{parse_travel_date, Weekday};

use crate::routines::RoutineManager;

pub struct DailyScheduleService {
    store: Arc<dyn DocumentStore>,
    routines: RoutineManager,
}

impl DailyScheduleService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            routines: RoutineManager::new(store.clone()),
            store,
        }
    }

    fn path(routine_id: &str, date: &str) -> DocPath {
        DocPath::new(collections::DAILY_SCHEDULES, daily_schedule_id(routine_id, date))
    }

    /// The stored override for `date`, or the implicit `available` one.
    pub async fn daily_status(&self, routine_id: &str, date: &str) -> EngineResult<DailySchedule> {
        match self.store.get(&Self::path(routine_id, date)).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Ok(DailySchedule::default_for(routine_id, date)),
        }
    }

    /// The driver's approved routines running on `date`, each with its status
    /// for that date, ordered by start time.
    pub async fn get_today_schedule(&self, driver_id: &str, date: &str) -> EngineResult<Vec<ScheduledRoutine>> {
        let day = Weekday::of(parse_travel_date(date)?);
        let running: Vec<_> = self
            .routines
            .approved_routines_of_driver(driver_id)
            .await?
            .into_iter()
            .filter(|r| r.runs_on(day))
            .collect();
        debug!(driver_id, date, %day, routines = running.len(), "Loading daily overrides");

        let statuses = try_join_all(running.iter().map(|r| self.daily_status(&r.id, date))).await?;

        let mut schedule: Vec<ScheduledRoutine> = running
            .into_iter()
            .zip(statuses)
            .map(|(routine, daily_status)| ScheduledRoutine { routine, daily_status })
            .collect();
        schedule.sort_by(|a, b| a.routine.time_slot.start_time.cmp(&b.routine.time_slot.start_time));
        Ok(schedule)
    }

    /// Upsert the routine's status for `date`. Moving to `started` or
    /// `completed` stamps the matching timestamp.
    pub async fn update_daily_status(
        &self,
        routine_id: &str,
        date: &str,
        availability: RoutineAvailability,
        notes: Option<&str>,
    ) -> EngineResult<DailySchedule> {
        parse_travel_date(date)?;
        if self.store.get(&RoutineManager::path(routine_id)).await?.is_none() {
            return Err(EngineError::NotFound(format!("Routine not found: {}", routine_id)));
        }

        let now = Utc::now();
        let mut patch = Map::new();
        patch.insert("routineId".into(), json!(routine_id));
        patch.insert("date".into(), json!(date));
        patch.insert("availability".into(), json!(availability));
        patch.insert("updatedAt".into(), json!(now));
        if let Some(notes) = notes {
            patch.insert("notes".into(), json!(notes));
        }
        match availability {
            RoutineAvailability::Started => {
                patch.insert("startedAt".into(), json!(now));
            }
            RoutineAvailability::Completed => {
                patch.insert("completedAt".into(), json!(now));
            }
            RoutineAvailability::Available | RoutineAvailability::Unavailable => {}
        }

        self.store
            .set(&Self::path(routine_id, date), Value::Object(patch), WriteMode::Merge)
            .await?;
        info!(routine_id, date, availability = ?availability, "Daily routine status updated");
        self.daily_status(routine_id, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_core::models::{RoutineDraft, TimeSlot};
    use transit_shared::ClockTime;
    use transit_store::InMemoryStore;

    async fn approved_routine(store: &Arc<InMemoryStore>) -> String {
        let manager = RoutineManager::new(store.clone());
        let routine = manager
            .create_routine(RoutineDraft {
                bus_id: "drv-1".into(),
                driver_id: "drv-1".into(),
                routine_name: "Morning".into(),
                route: "Colombo to Kandy".into(),
                time_slot: TimeSlot {
                    start_time: ClockTime::parse("06:00").unwrap(),
                    end_time: ClockTime::parse("09:00").unwrap(),
                },
                price_per_person: 850.0,
                booking_commission: 0.0,
                days_of_week: vec![Weekday::Wednesday],
            })
            .await
            .unwrap();
        manager.approve_routine(&routine.id).await.unwrap();
        routine.id
    }

    #[tokio::test]
    async fn test_status_updates_stamp_and_merge() {
        let store = Arc::new(InMemoryStore::new());
        let id = approved_routine(&store).await;
        let daily = DailyScheduleService::new(store.clone());

        let fresh = daily.daily_status(&id, "2024-12-25").await.unwrap();
        assert_eq!(fresh.availability, RoutineAvailability::Available);

        let started = daily
            .update_daily_status(&id, "2024-12-25", RoutineAvailability::Started, Some("Left on time"))
            .await
            .unwrap();
        assert!(started.started_at.is_some());
        assert!(started.completed_at.is_none());

        let completed = daily
            .update_daily_status(&id, "2024-12-25", RoutineAvailability::Completed, None)
            .await
            .unwrap();
        assert_eq!(completed.availability, RoutineAvailability::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.started_at, started.started_at);
        assert_eq!(completed.notes.as_deref(), Some("Left on time"));
    }

    #[tokio::test]
    async fn test_completed_without_started_is_accepted() {
        let store = Arc::new(InMemoryStore::new());
        let id = approved_routine(&store).await;
        let daily = DailyScheduleService::new(store.clone());

        let done = daily
            .update_daily_status(&id, "2024-12-26", RoutineAvailability::Completed, None)
            .await
            .unwrap();
        assert!(done.started_at.is_none());
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_for_unknown_routine() {
        let daily = DailyScheduleService::new(Arc::new(InMemoryStore::new()));
        let err = daily
            .update_daily_status("ghost", "2024-12-25", RoutineAvailability::Started, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
