#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use transit_booking::BookingOrchestrator;
use transit_core::models::{BookingRequest, SeatSelection, SeatType};
use transit_core::store::{collections, DocPath, DocumentStore, Query, WriteMode};
use transit_shared::RetryConfig;
use transit_store::{InMemoryStore, LayoutConfig};

/// 2024-12-25 is a Wednesday.
pub const TRAVEL_DATE: &str = "2024-12-25";

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 20,
        initial_delay: Duration::from_millis(1),
        backoff_multiplier: 1.5,
        max_delay: Duration::from_millis(10),
    }
}

pub fn orchestrator(store: &Arc<InMemoryStore>) -> BookingOrchestrator {
    BookingOrchestrator::new(store.clone(), LayoutConfig::default(), fast_retry())
}

pub async fn seed_driver(store: &InMemoryStore, id: &str, bus_type: &str, seats: u32, operating_days: &[&str]) {
    store
        .set(
            &DocPath::new(collections::USERS, id),
            json!({
                "id": id,
                "email": format!("{}@example.com", id),
                "displayName": format!("Driver {}", id),
                "userType": "driver",
                "createdAt": "2024-11-01T08:00:00Z",
                "busDetails": {
                    "busName": "Express",
                    "busNumber": "NB-1234",
                    "numberOfSeats": seats,
                    "busType": bus_type,
                    "route": "Colombo to Kandy",
                    "operatingDays": operating_days,
                    "status": "approved"
                }
            }),
            WriteMode::Overwrite,
        )
        .await
        .unwrap();
}

pub async fn seed_passenger(store: &InMemoryStore, id: &str, bookings: &[&str]) {
    store
        .set(
            &DocPath::new(collections::USERS, id),
            json!({
                "id": id,
                "email": format!("{}@example.com", id),
                "displayName": "Kamala",
                "userType": "passenger",
                "bookings": bookings,
                "createdAt": "2024-11-01T08:00:00Z"
            }),
            WriteMode::Overwrite,
        )
        .await
        .unwrap();
}

pub fn seat(id: &str) -> SeatSelection {
    // seat-{row}-{n}
    let mut parts = id.trim_start_matches("seat-").split('-');
    let row = parts.next().unwrap_or("0");
    let n: u32 = parts.next().and_then(|n| n.parse().ok()).unwrap_or(1);
    let letter = char::from_u32('A' as u32 + n - 1).unwrap();
    SeatSelection {
        seat_id: id.to_string(),
        seat_number: format!("{}{}", row, letter),
        price: 850.0,
        seat_type: SeatType::Regular,
    }
}

pub fn regular_request(user_id: &str, bus_id: &str, seats: &[&str]) -> BookingRequest {
    BookingRequest {
        user_id: user_id.to_string(),
        bus_id: bus_id.to_string(),
        seats: seats.iter().map(|s| seat(s)).collect(),
        total_price: 850.0 * seats.len() as f64,
        travel_date: TRAVEL_DATE.to_string(),
        route: "Colombo to Kandy".to_string(),
        trip_id: None,
        is_trip_booking: false,
        is_private_hire: false,
    }
}

pub async fn booking_count(store: &InMemoryStore) -> usize {
    store.query(&Query::new(collections::BOOKINGS)).await.unwrap().len()
}
