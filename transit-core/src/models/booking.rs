use super::seat::SeatType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatSelection {
    pub seat_id: String,
    pub seat_number: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub user_id: String,
    pub bus_id: String,
    pub seats: Vec<SeatSelection>,
    pub total_price: f64,
    /// `YYYY-MM-DD`
    pub travel_date: String,
    pub route: String,
    #[serde(default)]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub is_trip_booking: bool,
    #[serde(default)]
    pub is_private_hire: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingMode<'a> {
    Regular,
    Trip { trip_id: &'a str },
    PrivateHire,
}

impl BookingRequest {
    /// Private hire wins over a trip booking; a trip booking needs both the
    /// flag and a trip id, anything else books from the seat map.
    pub fn mode(&self) -> BookingMode<'_> {
        if self.is_private_hire {
            return BookingMode::PrivateHire;
        }
        match (&self.trip_id, self.is_trip_booking) {
            (Some(trip_id), true) => BookingMode::Trip { trip_id },
            _ => BookingMode::Regular,
        }
    }

    pub fn seat_ids(&self) -> impl Iterator<Item = &str> {
        self.seats.iter().map(|s| s.seat_id.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HireType {
    FullBus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub bus_id: String,
    pub seats: Vec<SeatSelection>,
    pub total_price: f64,
    pub travel_date: String,
    pub route: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub is_trip_booking: bool,
    #[serde(default)]
    pub is_private_hire: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_type: Option<HireType>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn confirmed(id: String, request: &BookingRequest) -> Self {
        let is_trip_booking = matches!(request.mode(), BookingMode::Trip { .. });
        let is_private_hire = request.mode() == BookingMode::PrivateHire;
        Self {
            id,
            user_id: request.user_id.clone(),
            bus_id: request.bus_id.clone(),
            seats: request.seats.clone(),
            total_price: request.total_price,
            travel_date: request.travel_date.clone(),
            route: request.route.clone(),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            trip_id: if is_trip_booking { request.trip_id.clone() } else { None },
            is_trip_booking,
            is_private_hire,
            hire_type: is_private_hire.then_some(HireType::FullBus),
            created_at: Utc::now(),
            updated_at: None,
            confirmed_at: None,
            cancelled_at: None,
        }
    }
}
