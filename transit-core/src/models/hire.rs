use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HireStatus {
    Requested,
    PriceQuoted,
    PriceAccepted,
    Confirmed,
    Rejected,
    Completed,
}

/// Which side of a hire negotiation is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HireParty {
    Passenger,
    Driver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHireRequest {
    pub user_id: String,
    pub bus_id: String,
    pub from: String,
    pub to: String,
    pub travel_date: String,
    pub passenger_count: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HireRequest {
    pub id: String,
    pub user_id: String,
    pub bus_id: String,
    pub from: String,
    pub to: String,
    pub travel_date: String,
    pub passenger_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: HireStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewHireRequest {
    pub fn into_request(self, id: String) -> HireRequest {
        let now = Utc::now();
        HireRequest {
            id,
            user_id: self.user_id,
            bus_id: self.bus_id,
            from: self.from,
            to: self.to,
            travel_date: self.travel_date,
            passenger_count: self.passenger_count,
            notes: self.notes,
            status: HireStatus::Requested,
            final_price: None,
            driver_notes: None,
            created_at: now,
            updated_at: now,
            responded_at: None,
            accepted_at: None,
            completed_at: None,
        }
    }
}

impl HireStatus {
    /// Timestamp field stamped when a request moves into this status.
    pub fn timestamp_field(&self) -> Option<&'static str> {
        match self {
            Self::PriceQuoted => Some("respondedAt"),
            Self::PriceAccepted => Some("acceptedAt"),
            Self::Completed => Some("completedAt"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_timestamps() {
        assert_eq!(HireStatus::PriceQuoted.timestamp_field(), Some("respondedAt"));
        assert_eq!(HireStatus::PriceAccepted.timestamp_field(), Some("acceptedAt"));
        assert_eq!(HireStatus::Completed.timestamp_field(), Some("completedAt"));
        assert_eq!(HireStatus::Confirmed.timestamp_field(), None);
        assert_eq!(HireStatus::Rejected.timestamp_field(), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_value(HireStatus::PriceAccepted).unwrap(), "price_accepted");
    }
}
