//! Read-only passenger search over approved buses, their trips, and
//! approved routines.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use transit_catalog::{AvailabilityRepository, BusRegistry, TripService};
use transit_core::models::{BusDetails, BusMode, Routine, RoutineAvailability, Trip, TripStatus, User};
use transit_core::store::{collections, DocPath, DocumentStore};
use transit_core::EngineResult;
use transit_schedule::{DailyScheduleService, RoutineManager};
use transit_shared::{parse_travel_date, Masked, Weekday};
use transit_store::LayoutConfig;

use crate::route::route_matches;

/// Display fields shown for regular-route buses. The times and price are
/// fixed placeholders, not derived from schedules or pricing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDisplay {
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub price: f64,
    pub available_seats: u32,
}

impl RouteDisplay {
    fn placeholder(available_seats: u32) -> Self {
        Self {
            departure_time: "08:30 AM".to_string(),
            arrival_time: "12:45 PM".to_string(),
            duration: "4h 15m".to_string(),
            price: 850.0,
            available_seats,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMatch {
    pub bus_id: String,
    pub bus_name: String,
    pub bus_number: String,
    pub route: String,
    pub number_of_seats: u32,
    pub bus_type: BusMode,
    pub driver_name: String,
    pub driver_email: Masked<String>,
    pub is_trip_booking: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_trips: Vec<Trip>,
    #[serde(flatten)]
    pub display: Option<RouteDisplay>,
}

impl BusMatch {
    fn new(driver: &User, bus: &BusDetails) -> Self {
        Self {
            bus_id: driver.id.clone(),
            bus_name: bus.bus_name.clone(),
            bus_number: bus.bus_number.clone(),
            route: bus.route_text().to_string(),
            number_of_seats: bus.number_of_seats,
            bus_type: bus.bus_type,
            driver_name: driver.display_name.clone(),
            driver_email: driver.email.clone(),
            is_trip_booking: bus.bus_type == BusMode::TripAvailable,
            available_trips: Vec::new(),
            display: None,
        }
    }
}

/// An approved routine offered on the searched date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMatch {
    #[serde(flatten)]
    pub routine: Routine,
    pub daily_availability: RoutineAvailability,
    pub bus_details: Option<BusDetails>,
    pub driver_name: String,
    pub driver_email: Option<Masked<String>>,
}

pub struct BusSearch {
    store: Arc<dyn DocumentStore>,
    buses: BusRegistry,
    trips: TripService,
    availability: AvailabilityRepository,
    routines: RoutineManager,
    daily: DailyScheduleService,
}

impl BusSearch {
    pub fn new(store: Arc<dyn DocumentStore>, layout: LayoutConfig) -> Self {
        Self {
            buses: BusRegistry::new(store.clone()),
            trips: TripService::new(store.clone()),
            availability: AvailabilityRepository::new(store.clone(), layout),
            routines: RoutineManager::new(store.clone()),
            daily: DailyScheduleService::new(store.clone()),
            store,
        }
    }

    /// Approved buses whose route matches the filters. Trip-mode buses are
    /// listed only while they have open trips (on `date`, if given).
    pub async fn search_buses(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        date: Option<&str>,
    ) -> EngineResult<Vec<BusMatch>> {
        if let Some(date) = date {
            parse_travel_date(date)?;
        }

        let mut matches = Vec::new();
        for driver in self.buses.list_approved_buses().await? {
            let Some(bus) = driver.bus_details.as_ref() else {
                continue;
            };
            if bus.route.is_none() || !route_matches(bus.route_text(), from, to) {
                continue;
            }

            let mut found = BusMatch::new(&driver, bus);
            match bus.bus_type {
                BusMode::TripAvailable => {
                    found.available_trips = self.open_trips(&driver.id, date).await?;
                    if found.available_trips.is_empty() {
                        debug!(bus_id = %driver.id, "Trip bus has no open trips, skipping");
                        continue;
                    }
                }
                BusMode::RegularRoute => {
                    let free = self.free_seats(&driver.id, bus.number_of_seats, date).await?;
                    found.display = Some(RouteDisplay::placeholder(free));
                }
            }
            matches.push(found);
        }

        info!(from = ?from, to = ?to, date = ?date, results = matches.len(), "Bus search");
        Ok(matches)
    }

    async fn open_trips(&self, bus_id: &str, date: Option<&str>) -> EngineResult<Vec<Trip>> {
        let trips = self.trips.list_bus_trips(bus_id, date).await?;
        Ok(trips
            .into_iter()
            .filter(|t| t.status == TripStatus::Active && t.remaining() > 0)
            .collect())
    }

    /// Unbooked seats on `date`; the full capacity when no date is given.
    async fn free_seats(&self, bus_id: &str, capacity: u32, date: Option<&str>) -> EngineResult<u32> {
        let Some(date) = date else {
            return Ok(capacity);
        };
        let booked = match self.availability.find(bus_id, date).await? {
            Some(map) => map.booked_count() as u32,
            None => 0,
        };
        Ok(capacity.saturating_sub(booked))
    }

    /// Approved routines running on `date` whose route contains, or is
    /// contained in, `route`. Routines marked unavailable for the date are
    /// left out. Ordered by start time.
    pub async fn search_buses_with_schedules(&self, route: &str, date: &str) -> EngineResult<Vec<ScheduleMatch>> {
        let day = Weekday::of(parse_travel_date(date)?);
        let wanted = route.trim().to_lowercase();

        let candidates: Vec<Routine> = self
            .routines
            .approved_routines()
            .await?
            .into_iter()
            .filter(|r| {
                let own = r.route.to_lowercase();
                (own.contains(&wanted) || wanted.contains(&own)) && r.runs_on(day)
            })
            .collect();

        let statuses = try_join_all(candidates.iter().map(|r| self.daily.daily_status(&r.id, date))).await?;
        let offered: Vec<(Routine, RoutineAvailability)> = candidates
            .into_iter()
            .zip(statuses)
            .map(|(routine, status)| (routine, status.availability))
            .filter(|(_, availability)| *availability != RoutineAvailability::Unavailable)
            .collect();

        let drivers = try_join_all(offered.iter().map(|(r, _)| self.driver(&r.driver_id))).await?;

        let mut matches: Vec<ScheduleMatch> = offered
            .into_iter()
            .zip(drivers)
            .map(|((routine, daily_availability), driver)| ScheduleMatch {
                routine,
                daily_availability,
                driver_name: driver
                    .as_ref()
                    .map(|d| d.display_name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "Unknown Driver".to_string()),
                driver_email: driver.as_ref().map(|d| d.email.clone()),
                bus_details: driver.and_then(|d| d.bus_details),
            })
            .collect();
        matches.sort_by(|a, b| a.routine.time_slot.start_time.cmp(&b.routine.time_slot.start_time));

        info!(route, date, %day, results = matches.len(), "Schedule search");
        Ok(matches)
    }

    async fn driver(&self, driver_id: &str) -> EngineResult<Option<User>> {
        let doc = self.store.get(&DocPath::new(collections::USERS, driver_id)).await?;
        Ok(doc.map(|d| d.decode()).transpose()?)
    }
}
