use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Booked,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    Regular,
    Premium,
    Wheelchair,
    PrivateHire,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatEntry {
    pub seat_number: String,
    pub status: SeatStatus,
    #[serde(default)]
    pub booked_by: Option<String>,
    #[serde(default)]
    pub booked_at: Option<DateTime<Utc>>,
    pub price: f64,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
}

impl SeatEntry {
    pub fn is_booked(&self) -> bool {
        self.status == SeatStatus::Booked
    }
}

/// Document id of the seat map for a bus on a travel date.
pub fn availability_id(bus_id: &str, travel_date: &str) -> String {
    format!("{}_{}", bus_id, travel_date)
}

/// Seat map of one bus on one travel date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub bus_id: String,
    pub travel_date: String,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub seats: BTreeMap<String, SeatEntry>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_private_hire: bool,
    #[serde(default)]
    pub hired_by: Option<String>,
}

impl SeatAvailability {
    pub fn id(&self) -> String {
        availability_id(&self.bus_id, &self.travel_date)
    }

    pub fn is_booked(&self, seat_id: &str) -> bool {
        self.seats.get(seat_id).is_some_and(SeatEntry::is_booked)
    }

    /// Seat numbers (falling back to ids) of the requested seats that are already taken.
    pub fn taken<'a>(&self, seat_ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        seat_ids
            .into_iter()
            .filter_map(|id| self.seats.get(id).filter(|s| s.is_booked()).map(|s| s.seat_number.clone()))
            .collect()
    }

    pub fn booked_count(&self) -> usize {
        self.seats.values().filter(|s| s.is_booked()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seat_map_document() {
        let doc = json!({
            "busId": "bus1",
            "travelDate": "2024-12-25",
            "seats": {
                "seat-1-1": {
                    "seatNumber": "1A", "status": "booked", "bookedBy": "u1", "price": 1020, "type": "premium"
                },
                "seat-1-2": {"seatNumber": "1B", "status": "available", "price": 1020, "type": "premium"}
            }
        });
        let map: SeatAvailability = serde_json::from_value(doc).unwrap();
        assert_eq!(map.id(), "bus1_2024-12-25");
        assert!(map.is_booked("seat-1-1"));
        assert!(!map.is_booked("seat-1-2"));
        assert!(!map.is_booked("seat-9-9"));
        assert_eq!(map.taken(["seat-1-1", "seat-1-2"]), vec!["1A".to_string()]);
        assert!(!map.is_private_hire);
    }

    #[test]
    fn test_seat_type_wire_names() {
        assert_eq!(serde_json::to_value(SeatType::PrivateHire).unwrap(), json!("private_hire"));
        let entry = SeatEntry {
            seat_number: "3A".into(),
            status: SeatStatus::Available,
            booked_by: None,
            booked_at: None,
            price: 850.0,
            seat_type: SeatType::Wheelchair,
        };
        assert_eq!(serde_json::to_value(&entry).unwrap()["type"], "wheelchair");
    }
}
