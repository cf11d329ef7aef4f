use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use transit_catalog::TripService;
use transit_core::models::{NewTrip, RoutineAvailability, RoutineDraft, TimeSlot};
use transit_core::store::{collections, DocPath, DocumentStore, WriteMode};
use transit_schedule::{DailyScheduleService, RoutineManager};
use transit_search::BusSearch;
use transit_shared::{ClockTime, Weekday};
use transit_store::{InMemoryStore, LayoutConfig};

/// 2024-12-25 is a Wednesday.
const DATE: &str = "2024-12-25";

async fn seed_bus(store: &InMemoryStore, id: &str, route: &str, bus_type: &str, status: &str) {
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
                    "busName": format!("Bus {}", id),
                    "busNumber": "NB-1234",
                    "numberOfSeats": 40,
                    "busType": bus_type,
                    "route": route,
                    "status": status
                }
            }),
            WriteMode::Overwrite,
        )
        .await
        .unwrap();
}

async fn seed_buses(store: &InMemoryStore) {
    seed_bus(store, "kandy", "Colombo to Kandy", "regular_route", "approved").await;
    seed_bus(store, "galle", "Colombo - Galle", "regular_route", "approved").await;
    seed_bus(store, "jaffna", "Kandy to Jaffna", "regular_route", "approved").await;
    seed_bus(store, "pending", "Colombo to Kandy", "regular_route", "pending").await;
}

fn ids(matches: &[transit_search::BusMatch]) -> Vec<&str> {
    let mut ids: Vec<&str> = matches.iter().map(|m| m.bus_id.as_str()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_no_filters_returns_every_approved_bus() {
    let store = Arc::new(InMemoryStore::new());
    seed_buses(&store).await;
    let search = BusSearch::new(store.clone(), LayoutConfig::default());

    let found = search.search_buses(None, None, None).await.unwrap();
    assert_eq!(ids(&found), vec!["galle", "jaffna", "kandy"]);
}

#[tokio::test]
async fn test_single_and_double_filters() {
    let store = Arc::new(InMemoryStore::new());
    seed_buses(&store).await;
    let search = BusSearch::new(store.clone(), LayoutConfig::default());

    let from_colombo = search.search_buses(Some("Colombo"), None, None).await.unwrap();
    assert_eq!(ids(&from_colombo), vec!["galle", "kandy"]);

    // A lone filter matches anywhere in the route text.
    let kandy = search.search_buses(None, Some("kandy"), None).await.unwrap();
    assert_eq!(ids(&kandy), vec!["jaffna", "kandy"]);

    let exact = search.search_buses(Some("Colombo"), Some("Kandy"), None).await.unwrap();
    assert_eq!(ids(&exact), vec!["kandy"]);

    let none = search.search_buses(Some("Colombo"), Some("Jaffna"), None).await.unwrap();
    assert!(none.is_empty());

    let galle = search.search_buses(Some("colombo"), Some("GALLE"), None).await.unwrap();
    assert_eq!(ids(&galle), vec!["galle"]);
}

#[tokio::test]
async fn test_regular_buses_carry_placeholder_display() {
    let store = Arc::new(InMemoryStore::new());
    seed_buses(&store).await;
    let search = BusSearch::new(store.clone(), LayoutConfig::default());

    let found = search.search_buses(Some("Colombo"), Some("Kandy"), Some(DATE)).await.unwrap();
    let display = found[0].display.as_ref().unwrap();
    assert_eq!(display.departure_time, "08:30 AM");
    assert_eq!(display.duration, "4h 15m");
    assert_eq!(display.price, 850.0);
    assert_eq!(display.available_seats, 40);
    assert!(!found[0].is_trip_booking);

    let value = serde_json::to_value(&found[0]).unwrap();
    assert_eq!(value["arrivalTime"], "12:45 PM");
    assert_eq!(value["driverEmail"], "kandy@example.com");

    let err = search.search_buses(None, None, Some("25.12.2024")).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_trip_buses_need_open_trips() {
    let store = Arc::new(InMemoryStore::new());
    seed_bus(&store, "coach", "Colombo to Galle", "trip_available", "approved").await;
    let search = BusSearch::new(store.clone(), LayoutConfig::default());

    assert!(search.search_buses(Some("Colombo"), None, Some(DATE)).await.unwrap().is_empty());

    let departure = Utc.with_ymd_and_hms(2024, 12, 25, 7, 0, 0).unwrap();
    TripService::new(store.clone())
        .create_trip(NewTrip {
            bus_id: "coach".into(),
            from: "Colombo".into(),
            to: "Galle".into(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(2),
            price: 1200.0,
            available_seats: 40,
        })
        .await
        .unwrap();

    let found = search.search_buses(Some("Colombo"), Some("Galle"), Some(DATE)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].is_trip_booking);
    assert_eq!(found[0].available_trips.len(), 1);
    assert!(found[0].display.is_none());

    // No open trip on the following day.
    assert!(search.search_buses(Some("Colombo"), None, Some("2024-12-26")).await.unwrap().is_empty());
}

fn draft(driver: &str, route: &str, start: &str, days: &[Weekday]) -> RoutineDraft {
    RoutineDraft {
        bus_id: driver.to_string(),
        driver_id: driver.to_string(),
        routine_name: format!("{} at {}", route, start),
        route: route.to_string(),
        time_slot: TimeSlot {
            start_time: ClockTime::parse(start).unwrap(),
            end_time: ClockTime::parse("23:00").unwrap(),
        },
        price_per_person: 900.0,
        booking_commission: 0.0,
        days_of_week: days.to_vec(),
    }
}

#[tokio::test]
async fn test_schedule_search() {
    let store = Arc::new(InMemoryStore::new());
    seed_buses(&store).await;
    let routines = RoutineManager::new(store.clone());
    let daily = DailyScheduleService::new(store.clone());

    let mut approved = Vec::new();
    for d in [
        draft("kandy", "Colombo to Kandy", "14:00", &[Weekday::Wednesday]),
        draft("kandy", "Colombo to Kandy", "06:30", &[Weekday::Wednesday, Weekday::Friday]),
        draft("ghost", "Colombo to Kandy Express", "09:00", &[Weekday::Wednesday]),
        draft("kandy", "Colombo to Kandy", "10:00", &[Weekday::Thursday]),
        draft("galle", "Colombo to Galle", "08:00", &[Weekday::Wednesday]),
    ] {
        let routine = routines.create_routine(d).await.unwrap();
        routines.approve_routine(&routine.id).await.unwrap();
        approved.push(routine.id);
    }
    routines
        .create_routine(draft("kandy", "Colombo to Kandy", "05:00", &[Weekday::Wednesday]))
        .await
        .unwrap();

    let found = search_for(&store, "colombo to kandy").await;
    let starts: Vec<&str> = found.iter().map(|m| m.routine.time_slot.start_time.as_str()).collect();
    assert_eq!(starts, vec!["06:30", "09:00", "14:00"]);
    assert!(found.iter().all(|m| m.daily_availability == RoutineAvailability::Available));
    assert_eq!(found[0].driver_name, "Driver kandy");
    assert!(found[0].bus_details.is_some());
    assert_eq!(found[1].driver_name, "Unknown Driver");
    assert!(found[1].bus_details.is_none());

    // The query may also be the longer of the two.
    let longer = search_for(&store, "Colombo to Galle via the coast").await;
    assert_eq!(longer.len(), 1);
    assert_eq!(longer[0].routine.route, "Colombo to Galle");
    assert_eq!(search_for(&store, "kandy express").await.len(), 1);

    daily
        .update_daily_status(&approved[1], DATE, RoutineAvailability::Unavailable, None)
        .await
        .unwrap();
    daily
        .update_daily_status(&approved[0], DATE, RoutineAvailability::Started, None)
        .await
        .unwrap();
    let found = search_for(&store, "Colombo to Kandy").await;
    let starts: Vec<&str> = found.iter().map(|m| m.routine.time_slot.start_time.as_str()).collect();
    assert_eq!(starts, vec!["09:00", "14:00"]);
    assert_eq!(found[1].daily_availability, RoutineAvailability::Started);
}

async fn search_for(store: &Arc<InMemoryStore>, route: &str) -> Vec<transit_search::ScheduleMatch> {
    BusSearch::new(store.clone(), LayoutConfig::default())
        .search_buses_with_schedules(route, DATE)
        .await
        .unwrap()
}
