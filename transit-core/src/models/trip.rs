use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Cancelled,
    Completed,
}

/// A single scheduled departure of a `trip_available` bus.
///
/// Invariant: `booked_seats <= available_seats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub bus_id: String,
    pub from: String,
    pub to: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: f64,
    pub available_seats: u32,
    #[serde(default)]
    pub booked_seats: u32,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn remaining(&self) -> u32 {
        self.available_seats.saturating_sub(self.booked_seats)
    }

    pub fn has_capacity_for(&self, seats: u32) -> bool {
        self.remaining() >= seats
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub bus_id: String,
    pub from: String,
    pub to: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: f64,
    pub available_seats: u32,
}

impl NewTrip {
    pub fn into_trip(self, id: String) -> Trip {
        Trip {
            id,
            bus_id: self.bus_id,
            from: self.from,
            to: self.to,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price: self.price,
            available_seats: self.available_seats,
            booked_seats: 0,
            status: TripStatus::Active,
            created_at: Utc::now(),
        }
    }
}
