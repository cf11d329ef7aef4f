//! Seat layout generation.
//!
//! Everything here is a pure function of capacity and configuration, so the
//! layout shown before any booking exists is the same on every call.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use transit_core::models::{SeatAvailability, SeatEntry, SeatStatus, SeatType};
use transit_store::LayoutConfig;

pub fn seat_id(row: u32, seat: u32) -> String {
    format!("seat-{}-{}", row, seat)
}

/// `1A`, `1B`, ... `14B`
pub fn seat_number(row: u32, seat: u32) -> String {
    let letter = char::from_u32('A' as u32 + seat.saturating_sub(1)).unwrap_or('?');
    format!("{}{}", row, letter)
}

/// (row, seat) positions of the first `capacity` seats, row-major, 1-based.
pub fn seat_positions(capacity: u32, seats_per_row: u32) -> impl Iterator<Item = (u32, u32)> {
    let per_row = seats_per_row.max(1);
    (0..capacity).map(move |i| (i / per_row + 1, i % per_row + 1))
}

fn classify(row: u32, seat: u32, config: &LayoutConfig) -> (SeatType, f64) {
    if row == 1 {
        (SeatType::Premium, (config.base_price * config.premium_multiplier).round())
    } else if seat == 1 && config.wheelchair_row_interval > 0 && row % config.wheelchair_row_interval == 0 {
        (SeatType::Wheelchair, config.base_price)
    } else {
        (SeatType::Regular, config.base_price)
    }
}

pub fn default_seats(capacity: u32, config: &LayoutConfig) -> BTreeMap<String, SeatEntry> {
    seat_positions(capacity, config.seats_per_row)
        .map(|(row, seat)| {
            let (seat_type, price) = classify(row, seat, config);
            let entry = SeatEntry {
                seat_number: seat_number(row, seat),
                status: SeatStatus::Available,
                booked_by: None,
                booked_at: None,
                price,
                seat_type,
            };
            (seat_id(row, seat), entry)
        })
        .collect()
}

/// Seat map served for a (bus, date) that has no stored record yet.
pub fn default_availability(bus_id: &str, travel_date: &str, capacity: u32, config: &LayoutConfig) -> SeatAvailability {
    SeatAvailability {
        bus_id: bus_id.to_string(),
        travel_date: travel_date.to_string(),
        route: None,
        seats: default_seats(capacity, config),
        last_updated: None,
        is_private_hire: false,
        hired_by: None,
    }
}

/// Split `total` over `seats` in whole cents; the last seat takes the remainder.
pub fn split_price_cents(total: f64, seats: u32) -> Vec<f64> {
    if seats == 0 {
        return Vec::new();
    }
    let total_cents = (total * 100.0).round() as i64;
    let each = total_cents / seats as i64;
    let last = total_cents - each * (seats as i64 - 1);

    (0..seats)
        .map(|i| if i + 1 == seats { last } else { each })
        .map(|cents| cents as f64 / 100.0)
        .collect()
}

/// Every seat of the bus, booked by `hirer` as one unit.
pub fn private_hire_seats(
    capacity: u32,
    config: &LayoutConfig,
    total_price: f64,
    hirer: &str,
    booked_at: DateTime<Utc>,
) -> BTreeMap<String, SeatEntry> {
    let prices = split_price_cents(total_price, capacity);
    seat_positions(capacity, config.seats_per_row)
        .zip(prices)
        .map(|((row, seat), price)| {
            let entry = SeatEntry {
                seat_number: seat_number(row, seat),
                status: SeatStatus::Booked,
                booked_by: Some(hirer.to_string()),
                booked_at: Some(booked_at),
                price,
                seat_type: SeatType::PrivateHire,
            };
            (seat_id(row, seat), entry)
        })
        .collect()
}
