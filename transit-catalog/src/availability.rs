use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use transit_core::models::{availability_id, SeatAvailability, SeatEntry, SeatSelection, SeatStatus, User};
use transit_core::store::{collections, encode, DocPath, DocumentStore, StoreTransaction, WriteMode};
use transit_core::{EngineError, EngineResult};
use transit_store::LayoutConfig;

use crate::layout;

/// Reads and writes the per-(bus, date) seat map.
///
/// Writes only happen through a [`StoreTransaction`] so that the caller's
/// reads and these writes commit or fail together.
pub struct AvailabilityRepository {
    store: Arc<dyn DocumentStore>,
    layout: LayoutConfig,
}

impl AvailabilityRepository {
    pub fn new(store: Arc<dyn DocumentStore>, layout: LayoutConfig) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn path(bus_id: &str, travel_date: &str) -> DocPath {
        DocPath::new(collections::SEAT_AVAILABILITY, availability_id(bus_id, travel_date))
    }

    /// The stored seat map, if any booking has been made for this (bus, date).
    pub async fn find(&self, bus_id: &str, travel_date: &str) -> EngineResult<Option<SeatAvailability>> {
        let doc = self.store.get(&Self::path(bus_id, travel_date)).await?;
        Ok(doc.map(|d| d.decode()).transpose()?)
    }

    /// The stored seat map, or the default layout when nothing is stored.
    pub async fn get_availability(&self, bus_id: &str, travel_date: &str) -> EngineResult<SeatAvailability> {
        transit_shared::parse_travel_date(travel_date)?;
        if let Some(stored) = self.find(bus_id, travel_date).await? {
            return Ok(stored);
        }

        let capacity = self.capacity_of(bus_id).await?;
        debug!(bus_id, travel_date, capacity, "No stored seat map, serving default layout");
        Ok(layout::default_availability(bus_id, travel_date, capacity, &self.layout))
    }

    /// Seat count of the bus, or the configured default when the bus declares none.
    async fn capacity_of(&self, bus_id: &str) -> EngineResult<u32> {
        let doc = self.store.get(&DocPath::new(collections::USERS, bus_id)).await?;
        let declared = match doc {
            Some(doc) => doc
                .decode::<User>()?
                .bus_details
                .map(|bus| bus.number_of_seats)
                .filter(|seats| *seats > 0),
            None => None,
        };
        Ok(declared.unwrap_or(self.layout.default_capacity))
    }

    /// Transactional read of the stored seat map.
    pub async fn read_in_txn(
        txn: &mut dyn StoreTransaction,
        bus_id: &str,
        travel_date: &str,
    ) -> EngineResult<Option<SeatAvailability>> {
        let doc = txn.get(&Self::path(bus_id, travel_date)).await?;
        Ok(doc.map(|d| d.decode()).transpose()?)
    }

    /// Mark `seats` booked by `booked_by`, merging them into the stored map
    /// and leaving every other seat untouched. `current` is the map as read in
    /// the same transaction; every requested seat must still be available there.
    #[allow(clippy::too_many_arguments)]
    pub fn reserve(
        txn: &mut dyn StoreTransaction,
        current: Option<&SeatAvailability>,
        bus_id: &str,
        travel_date: &str,
        route: &str,
        seats: &[SeatSelection],
        booked_by: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if let Some(current) = current {
            let taken = current.taken(seats.iter().map(|s| s.seat_id.as_str()));
            if !taken.is_empty() {
                return Err(EngineError::ValidationError(format!(
                    "Seat {} is no longer available",
                    taken.join(", ")
                )));
            }
        }

        let updates: BTreeMap<String, SeatEntry> = seats
            .iter()
            .map(|s| {
                let entry = SeatEntry {
                    seat_number: s.seat_number.clone(),
                    status: SeatStatus::Booked,
                    booked_by: Some(booked_by.to_string()),
                    booked_at: Some(now),
                    price: s.price,
                    seat_type: s.seat_type,
                };
                (s.seat_id.clone(), entry)
            })
            .collect();

        let path = Self::path(bus_id, travel_date);
        let patch = json!({
            "busId": bus_id,
            "travelDate": travel_date,
            "route": route,
            "seats": encode(&path, &updates)?,
            "lastUpdated": now,
        });
        txn.set(&path, patch, WriteMode::Merge);
        Ok(())
    }

    /// Replace the whole seat map with every seat booked by `hirer`.
    #[allow(clippy::too_many_arguments)]
    pub fn overwrite_for_hire(
        &self,
        txn: &mut dyn StoreTransaction,
        bus_id: &str,
        travel_date: &str,
        route: &str,
        capacity: u32,
        total_price: f64,
        hirer: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if capacity == 0 {
            return Err(EngineError::ValidationError(format!("Bus {} has no seats to hire", bus_id)));
        }

        let availability = SeatAvailability {
            bus_id: bus_id.to_string(),
            travel_date: travel_date.to_string(),
            route: Some(route.to_string()),
            seats: layout::private_hire_seats(capacity, &self.layout, total_price, hirer, now),
            last_updated: Some(now),
            is_private_hire: true,
            hired_by: Some(hirer.to_string()),
        };
        let path = Self::path(bus_id, travel_date);
        txn.set(&path, encode(&path, &availability)?, WriteMode::Overwrite);
        Ok(())
    }

    /// Drop the stored seat map; the default layout is served again afterwards.
    pub async fn clear_availability(&self, bus_id: &str, travel_date: &str) -> EngineResult<()> {
        self.store.delete(&Self::path(bus_id, travel_date)).await?;
        info!(bus_id, travel_date, "Seat availability cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_core::models::SeatType;
    use transit_store::InMemoryStore;

    fn selection(id: &str, number: &str) -> SeatSelection {
        SeatSelection {
            seat_id: id.into(),
            seat_number: number.into(),
            price: 850.0,
            seat_type: SeatType::Regular,
        }
    }

    #[tokio::test]
    async fn test_reserve_merges_and_rejects_taken_seats() {
        let store = Arc::new(InMemoryStore::new());
        let repo = AvailabilityRepository::new(store.clone(), LayoutConfig::default());
        let now = Utc::now();

        let mut txn = store.begin().await.unwrap();
        let current = AvailabilityRepository::read_in_txn(txn.as_mut(), "bus1", "2024-12-25").await.unwrap();
        assert!(current.is_none());
        AvailabilityRepository::reserve(
            txn.as_mut(),
            None,
            "bus1",
            "2024-12-25",
            "Colombo to Kandy",
            &[selection("seat-2-1", "2A")],
            "u1",
            now,
        )
        .unwrap();
        txn.commit().await.unwrap();

        let mut txn = store.begin().await.unwrap();
        let current = AvailabilityRepository::read_in_txn(txn.as_mut(), "bus1", "2024-12-25").await.unwrap();
        AvailabilityRepository::reserve(
            txn.as_mut(),
            current.as_ref(),
            "bus1",
            "2024-12-25",
            "Colombo to Kandy",
            &[selection("seat-2-2", "2B")],
            "u2",
            now,
        )
        .unwrap();
        txn.commit().await.unwrap();

        let map = repo.find("bus1", "2024-12-25").await.unwrap().unwrap();
        assert_eq!(map.booked_count(), 2);
        assert_eq!(map.seats["seat-2-1"].booked_by.as_deref(), Some("u1"));

        let mut txn = store.begin().await.unwrap();
        let current = AvailabilityRepository::read_in_txn(txn.as_mut(), "bus1", "2024-12-25").await.unwrap();
        let err = AvailabilityRepository::reserve(
            txn.as_mut(),
            current.as_ref(),
            "bus1",
            "2024-12-25",
            "Colombo to Kandy",
            &[selection("seat-2-3", "2C"), selection("seat-2-1", "2A")],
            "u3",
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(ref msg) if msg.contains("2A")));
    }

    #[tokio::test]
    async fn test_default_layout_until_stored_then_after_clear() {
        let store = Arc::new(InMemoryStore::new());
        let repo = AvailabilityRepository::new(store.clone(), LayoutConfig::default());

        let map = repo.get_availability("unknown-bus", "2024-12-25").await.unwrap();
        assert_eq!(map.seats.len(), 54);
        assert!(repo.find("unknown-bus", "2024-12-25").await.unwrap().is_none());

        let mut txn = store.begin().await.unwrap();
        repo.overwrite_for_hire(txn.as_mut(), "unknown-bus", "2024-12-25", "A to B", 20, 2000.0, "u1", Utc::now())
            .unwrap();
        txn.commit().await.unwrap();

        let map = repo.get_availability("unknown-bus", "2024-12-25").await.unwrap();
        assert!(map.is_private_hire);
        assert_eq!(map.booked_count(), 20);

        repo.clear_availability("unknown-bus", "2024-12-25").await.unwrap();
        let map = repo.get_availability("unknown-bus", "2024-12-25").await.unwrap();
        assert_eq!(map.booked_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_date_is_validation_error() {
        let repo = AvailabilityRepository::new(Arc::new(InMemoryStore::new()), LayoutConfig::default());
        let err = repo.get_availability("bus1", "25-12-2024").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
