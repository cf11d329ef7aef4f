use std::sync::Arc;

use chrono::{Duration, NaiveTime};
use serde_json::json;
use tracing::info;

use transit_core::models::{BusMode, NewTrip, Trip, User};
use transit_core::store::{collections, encode, new_document_id, Direction, DocPath, DocumentStore, Query, WriteMode};
use transit_core::{EngineError, EngineResult};

pub struct TripService {
    store: Arc<dyn DocumentStore>,
}

impl TripService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn path(trip_id: &str) -> DocPath {
        DocPath::new(collections::TRIPS, trip_id)
    }

    pub async fn create_trip(&self, new_trip: NewTrip) -> EngineResult<Trip> {
        let bus_doc = self
            .store
            .get(&DocPath::new(collections::USERS, &new_trip.bus_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Bus not found: {}", new_trip.bus_id)))?;
        let bus: User = bus_doc.decode()?;

        let trip_mode = bus.bus_details.as_ref().map(|b| b.bus_type) == Some(BusMode::TripAvailable);
        if !trip_mode {
            return Err(EngineError::ValidationError("Bus is not available for trips".to_string()));
        }
        if new_trip.available_seats == 0 {
            return Err(EngineError::ValidationError("A trip needs at least one seat".to_string()));
        }
        if new_trip.arrival_time < new_trip.departure_time {
            return Err(EngineError::ValidationError("Trip arrives before it departs".to_string()));
        }

        let trip = new_trip.into_trip(new_document_id());
        let path = Self::path(&trip.id);
        self.store.set(&path, encode(&path, &trip)?, WriteMode::Overwrite).await?;
        info!(trip_id = %trip.id, bus_id = %trip.bus_id, seats = trip.available_seats, "Trip created");
        Ok(trip)
    }

    pub async fn get_trip(&self, trip_id: &str) -> EngineResult<Trip> {
        let doc = self
            .store
            .get(&Self::path(trip_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Trip not found: {}", trip_id)))?;
        Ok(doc.decode()?)
    }

    /// Trips of a bus ordered by departure, optionally only those departing
    /// on `date` (UTC calendar day).
    pub async fn list_bus_trips(&self, bus_id: &str, date: Option<&str>) -> EngineResult<Vec<Trip>> {
        let mut query = Query::new(collections::TRIPS).eq("busId", bus_id);

        if let Some(date) = date {
            let day = transit_shared::parse_travel_date(date)?;
            let start = day.and_time(NaiveTime::MIN).and_utc();
            let end = start + Duration::days(1);
            query = query.gte("departureTime", json!(start)).lt("departureTime", json!(end));
        }

        let docs = self
            .store
            .query_ordered(&query.order_by("departureTime", Direction::Asc))
            .await?;
        docs.iter()
            .map(|d| d.decode::<Trip>().map_err(EngineError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use transit_store::InMemoryStore;

    async fn seed_bus(store: &InMemoryStore, id: &str, bus_type: &str) {
        store
            .set(
                &DocPath::new(collections::USERS, id),
                json!({
                    "id": id,
                    "userType": "driver",
                    "createdAt": "2024-11-01T08:00:00Z",
                    "busDetails": {
                        "busName": "Coach",
                        "busNumber": "WP-1",
                        "numberOfSeats": 30,
                        "busType": bus_type,
                        "status": "approved"
                    }
                }),
                WriteMode::Overwrite,
            )
            .await
            .unwrap();
    }

    fn new_trip(bus_id: &str, day: u32, hour: u32) -> NewTrip {
        let departure = Utc.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap();
        NewTrip {
            bus_id: bus_id.into(),
            from: "Colombo".into(),
            to: "Galle".into(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(3),
            price: 1500.0,
            available_seats: 30,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_trips() {
        let store = Arc::new(InMemoryStore::new());
        seed_bus(&store, "bus-t", "trip_available").await;
        let trips = TripService::new(store);

        trips.create_trip(new_trip("bus-t", 25, 15)).await.unwrap();
        trips.create_trip(new_trip("bus-t", 25, 6)).await.unwrap();
        trips.create_trip(new_trip("bus-t", 26, 6)).await.unwrap();

        let on_day = trips.list_bus_trips("bus-t", Some("2024-12-25")).await.unwrap();
        assert_eq!(on_day.len(), 2);
        assert!(on_day[0].departure_time < on_day[1].departure_time);
        assert!(on_day.iter().all(|t| t.booked_seats == 0));

        assert_eq!(trips.list_bus_trips("bus-t", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_day_listing_keeps_late_sub_second_departures() {
        let store = Arc::new(InMemoryStore::new());
        seed_bus(&store, "bus-t", "trip_available").await;
        let trips = TripService::new(store);

        let mut late = new_trip("bus-t", 25, 23);
        late.departure_time = late.departure_time + Duration::minutes(59) + Duration::milliseconds(59_999);
        trips.create_trip(late).await.unwrap();
        trips.create_trip(new_trip("bus-t", 26, 0)).await.unwrap();
        trips.create_trip(new_trip("bus-t", 25, 0)).await.unwrap();

        let on_day = trips.list_bus_trips("bus-t", Some("2024-12-25")).await.unwrap();
        assert_eq!(on_day.len(), 2);
        assert_eq!(on_day[0].departure_time, Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap());
        assert_eq!(on_day[1].departure_time.timestamp_subsec_millis(), 999);
    }

    #[tokio::test]
    async fn test_create_trip_requires_trip_mode_bus() {
        let store = Arc::new(InMemoryStore::new());
        seed_bus(&store, "bus-r", "regular_route").await;
        let trips = TripService::new(store);

        let err = trips.create_trip(new_trip("bus-r", 25, 8)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = trips.create_trip(new_trip("nobody", 25, 8)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
