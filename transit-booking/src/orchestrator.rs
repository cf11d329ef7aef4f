//! Seat booking across the three booking modes.
//!
//! A request is validated against committed state first (no side effects),
//! then executed as one store transaction. Every read of state that gates a
//! write happens inside that transaction, so two bookings racing for the same
//! seats or trip capacity conflict at commit and only one of them lands. A
//! commit conflict is retried from scratch with backoff.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use transit_catalog::AvailabilityRepository;
use transit_core::identity::Identity;
use transit_core::models::{Booking, BookingMode, BookingRequest, SeatAvailability, Trip, TripStatus, User};
use transit_core::store::{collections, encode, new_document_id, DocPath, DocumentStore, StoreTransaction, WriteMode};
use transit_core::{EngineError, EngineResult};
use transit_shared::{parse_travel_date, retry_with_backoff, RetryConfig, Weekday};
use transit_store::LayoutConfig;

/// Only the booking list of a profile matters here; the rest of the profile
/// is left as stored.
#[derive(Deserialize)]
struct BookingList {
    #[serde(default)]
    bookings: Vec<String>,
}

pub struct BookingOrchestrator {
    store: Arc<dyn DocumentStore>,
    availability: AvailabilityRepository,
    retry: RetryConfig,
}

impl BookingOrchestrator {
    pub fn new(store: Arc<dyn DocumentStore>, layout: LayoutConfig, retry: RetryConfig) -> Self {
        Self {
            availability: AvailabilityRepository::new(store.clone(), layout),
            store,
            retry,
        }
    }

    /// Book on behalf of an authenticated caller, who must be the booking's user.
    pub async fn book_seats_for(&self, identity: &Identity, request: BookingRequest) -> EngineResult<Booking> {
        if identity.user_id != request.user_id {
            warn!(
                caller = %identity.user_id,
                declared = %request.user_id,
                "Booking user does not match authenticated caller"
            );
            return Err(EngineError::ValidationError(
                "Booking user does not match the authenticated user".to_string(),
            ));
        }
        self.book_seats(request).await
    }

    pub async fn book_seats(&self, request: BookingRequest) -> EngineResult<Booking> {
        info!(
            user_id = %request.user_id,
            bus_id = %request.bus_id,
            travel_date = %request.travel_date,
            seats = request.seats.len(),
            mode = ?request.mode(),
            "Starting seat booking"
        );

        self.validate(&request).await?;

        // Same id on every attempt, so a retried booking never leaves two records.
        let booking_id = new_document_id();
        let result = retry_with_backoff(
            &self.retry,
            || self.try_book(&booking_id, &request),
            EngineError::is_transient,
            "book_seats",
        )
        .await;

        match &result {
            Ok(booking) => info!(booking_id = %booking.id, user_id = %booking.user_id, "Seats booked"),
            Err(err) => {
                warn!(user_id = %request.user_id, bus_id = %request.bus_id, error = %err, "Seat booking failed")
            }
        }
        result
    }

    /// Fail-fast checks against committed state. Nothing here gates a write;
    /// the transaction re-reads whatever it depends on.
    async fn validate(&self, request: &BookingRequest) -> EngineResult<()> {
        let date = parse_travel_date(&request.travel_date)?;

        if request.mode() != BookingMode::PrivateHire && request.seats.is_empty() {
            return Err(EngineError::ValidationError("No seats selected".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = request.seats.iter().find(|s| !seen.insert(s.seat_id.as_str())) {
            return Err(EngineError::ValidationError(format!("Seat {} selected twice", dup.seat_number)));
        }
        if request.total_price < 0.0 {
            return Err(EngineError::ValidationError("Total price must not be negative".to_string()));
        }

        let bus = self
            .store
            .get(&DocPath::new(collections::USERS, &request.bus_id))
            .await?
            .map(|doc| doc.decode::<User>())
            .transpose()?
            .and_then(|user| user.bus_details)
            .ok_or_else(|| EngineError::NotFound(format!("Bus not found: {}", request.bus_id)))?;

        let day = Weekday::of(date);
        if !bus.operates_on(day) {
            return Err(EngineError::ValidationError(format!(
                "This bus does not operate on {}. Operating days: {}",
                day,
                bus.allowed_days()
            )));
        }

        if let Some(stored) = self.availability.find(&request.bus_id, &request.travel_date).await? {
            check_seats_free(&stored, request)?;
        }
        Ok(())
    }

    async fn try_book(&self, booking_id: &str, request: &BookingRequest) -> EngineResult<Booking> {
        let mut txn = self.store.begin().await?;
        let now = Utc::now();

        let user_path = DocPath::new(collections::USERS, &request.user_id);
        let profile = txn.get(&user_path).await?;

        match request.mode() {
            BookingMode::PrivateHire => {
                debug!(bus_id = %request.bus_id, "Booking whole bus");
                let capacity = self.bus_capacity(txn.as_mut(), &request.bus_id).await?;
                let current =
                    AvailabilityRepository::read_in_txn(txn.as_mut(), &request.bus_id, &request.travel_date).await?;
                if let Some(current) = &current {
                    check_seats_free(current, request)?;
                }
                self.availability.overwrite_for_hire(
                    txn.as_mut(),
                    &request.bus_id,
                    &request.travel_date,
                    &request.route,
                    capacity,
                    request.total_price,
                    &request.user_id,
                    now,
                )?;
            }
            BookingMode::Trip { trip_id } => {
                debug!(trip_id, "Booking against trip capacity");
                let trip_path = DocPath::new(collections::TRIPS, trip_id);
                let trip: Trip = txn
                    .get(&trip_path)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("Trip not found: {}", trip_id)))?
                    .decode()?;

                if trip.bus_id != request.bus_id {
                    return Err(EngineError::ValidationError(format!(
                        "Trip {} does not belong to bus {}",
                        trip_id, request.bus_id
                    )));
                }
                if trip.status != TripStatus::Active {
                    return Err(EngineError::ValidationError(format!("Trip {} is not open for booking", trip_id)));
                }
                let requested = request.seats.len() as u32;
                if !trip.has_capacity_for(requested) {
                    return Err(EngineError::ValidationError(format!(
                        "Not enough seats available on this trip: requested {}, remaining {}",
                        requested,
                        trip.remaining()
                    )));
                }
                txn.update(&trip_path, vec![("bookedSeats".into(), json!(trip.booked_seats + requested))]);
            }
            BookingMode::Regular => {
                let current =
                    AvailabilityRepository::read_in_txn(txn.as_mut(), &request.bus_id, &request.travel_date).await?;
                AvailabilityRepository::reserve(
                    txn.as_mut(),
                    current.as_ref(),
                    &request.bus_id,
                    &request.travel_date,
                    &request.route,
                    &request.seats,
                    &request.user_id,
                    now,
                )?;
            }
        }

        let booking = Booking::confirmed(booking_id.to_string(), request);
        let booking_path = DocPath::new(collections::BOOKINGS, booking_id);
        txn.set(&booking_path, encode(&booking_path, &booking)?, WriteMode::Overwrite);

        match profile {
            Some(doc) => {
                let mut list: BookingList = doc.decode()?;
                if !list.bookings.iter().any(|id| id == booking_id) {
                    list.bookings.push(booking_id.to_string());
                }
                txn.update(&user_path, vec![("bookings".into(), json!(list.bookings))]);
            }
            None => {
                debug!(user_id = %request.user_id, "No profile yet, creating passenger profile");
                let stub = User::passenger_stub(&request.user_id, booking_id);
                txn.set(&user_path, encode(&user_path, &stub)?, WriteMode::Overwrite);
            }
        }

        txn.commit().await?;
        Ok(booking)
    }

    async fn bus_capacity(&self, txn: &mut dyn StoreTransaction, bus_id: &str) -> EngineResult<u32> {
        txn.get(&DocPath::new(collections::USERS, bus_id))
            .await?
            .map(|doc| doc.decode::<User>())
            .transpose()?
            .and_then(|user| user.bus_details)
            .map(|bus| bus.number_of_seats)
            .ok_or_else(|| EngineError::NotFound(format!("Bus not found: {}", bus_id)))
    }
}

/// A private hire needs every seat free; other modes need the requested ones free.
fn check_seats_free(stored: &SeatAvailability, request: &BookingRequest) -> EngineResult<()> {
    if request.mode() == BookingMode::PrivateHire {
        let booked = stored.booked_count();
        if booked > 0 {
            return Err(EngineError::ValidationError(format!(
                "Bus already has {} booked seat(s) on {}",
                booked, request.travel_date
            )));
        }
        return Ok(());
    }

    let taken = stored.taken(request.seat_ids());
    if let Some(first) = taken.first() {
        return Err(EngineError::ValidationError(format!("Seat {} is no longer available", first)));
    }
    Ok(())
}
