use crate::store::FieldUpdates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use transit_shared::{ClockTime, Weekday};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutineStatus {
    PendingApproval,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutineAvailability {
    Available,
    Started,
    Completed,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

/// A driver's recurring weekly departure on a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub bus_id: String,
    pub driver_id: String,
    pub routine_name: String,
    pub route: String,
    pub time_slot: TimeSlot,
    pub price_per_person: f64,
    #[serde(default)]
    pub booking_commission: f64,
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    pub status: RoutineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Routine {
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days_of_week.contains(&day)
    }
}

/// Input for a new routine; it starts out awaiting approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDraft {
    pub bus_id: String,
    pub driver_id: String,
    pub routine_name: String,
    pub route: String,
    pub time_slot: TimeSlot,
    pub price_per_person: f64,
    pub booking_commission: f64,
    pub days_of_week: Vec<Weekday>,
}

impl RoutineDraft {
    pub fn into_routine(self, id: String) -> Routine {
        Routine {
            id,
            bus_id: self.bus_id,
            driver_id: self.driver_id,
            routine_name: self.routine_name,
            route: self.route,
            time_slot: self.time_slot,
            price_per_person: self.price_per_person,
            booking_commission: self.booking_commission,
            days_of_week: self.days_of_week,
            status: RoutineStatus::PendingApproval,
            rejection_reason: None,
            approved_at: None,
            rejected_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Partial update of a routine's editable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineChanges {
    pub routine_name: Option<String>,
    pub route: Option<String>,
    pub time_slot: Option<TimeSlot>,
    pub price_per_person: Option<f64>,
    pub booking_commission: Option<f64>,
    pub days_of_week: Option<Vec<Weekday>>,
}

impl RoutineChanges {
    pub fn into_field_updates(self) -> FieldUpdates {
        let mut fields: FieldUpdates = Vec::new();
        if let Some(name) = self.routine_name {
            fields.push(("routineName".into(), json!(name)));
        }
        if let Some(route) = self.route {
            fields.push(("route".into(), json!(route)));
        }
        if let Some(slot) = self.time_slot {
            fields.push(("timeSlot".into(), json!(slot)));
        }
        if let Some(price) = self.price_per_person {
            fields.push(("pricePerPerson".into(), json!(price)));
        }
        if let Some(commission) = self.booking_commission {
            fields.push(("bookingCommission".into(), json!(commission)));
        }
        if let Some(days) = self.days_of_week {
            fields.push(("daysOfWeek".into(), json!(days)));
        }
        fields.push(("updatedAt".into(), json!(Utc::now())));
        fields
    }
}

pub fn daily_schedule_id(routine_id: &str, date: &str) -> String {
    format!("{}_{}", routine_id, date)
}

/// Per-date override of a routine. No stored override means `available`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySchedule {
    pub routine_id: String,
    pub date: String,
    pub availability: RoutineAvailability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DailySchedule {
    pub fn default_for(routine_id: &str, date: &str) -> Self {
        Self {
            routine_id: routine_id.to_string(),
            date: date.to_string(),
            availability: RoutineAvailability::Available,
            notes: None,
            started_at: None,
            completed_at: None,
            updated_at: None,
        }
    }
}

/// A routine together with its status for one particular date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRoutine {
    #[serde(flatten)]
    pub routine: Routine,
    pub daily_status: DailySchedule,
}
