use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use transit_shared::{Masked, Weekday};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Passenger,
    Driver,
    Admin,
}

/// How a bus sells its seats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BusMode {
    /// Fixed route, seats sold per travel date from the seat map.
    RegularRoute,
    /// Seats sold against individually scheduled trips.
    TripAvailable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusPricing {
    pub default_price_per_person: f64,
    #[serde(default)]
    pub booking_commission: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusDetails {
    pub bus_name: String,
    pub bus_number: String,
    pub number_of_seats: u32,
    pub bus_type: BusMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default)]
    pub operating_days: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<BusPricing>,
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl BusDetails {
    /// A bus without declared operating days runs every day.
    pub fn operates_on(&self, day: Weekday) -> bool {
        self.operating_days.is_empty() || self.operating_days.contains(&day)
    }

    pub fn route_text(&self) -> &str {
        self.route.as_deref().unwrap_or("")
    }

    pub fn allowed_days(&self) -> String {
        self.operating_days
            .iter()
            .map(Weekday::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A user profile. Drivers carry their bus, and the bus id is the driver's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Masked<String>,
    #[serde(default)]
    pub display_name: String,
    pub user_type: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_details: Option<BusDetails>,
    #[serde(default)]
    pub bookings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Minimal passenger profile for a booking made before the profile was completed.
    pub fn passenger_stub(id: &str, booking_id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: Masked::default(),
            display_name: String::new(),
            user_type: UserRole::Passenger,
            bus_details: None,
            bookings: vec![booking_id.to_string()],
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_driver_document_shape() {
        let doc = json!({
            "id": "drv-1",
            "email": "driver@example.com",
            "displayName": "Nimal",
            "userType": "driver",
            "createdAt": "2024-11-01T08:00:00Z",
            "busDetails": {
                "busName": "Express",
                "busNumber": "NB-1234",
                "numberOfSeats": 54,
                "busType": "regular_route",
                "route": "Colombo to Kandy",
                "operatingDays": ["monday", "Friday"],
                "status": "approved"
            }
        });
        let user: User = serde_json::from_value(doc).unwrap();
        let bus = user.bus_details.unwrap();
        assert_eq!(bus.bus_type, BusMode::RegularRoute);
        assert!(bus.operates_on(Weekday::Friday));
        assert!(!bus.operates_on(Weekday::Sunday));
        assert_eq!(bus.allowed_days(), "Monday, Friday");
        assert!(user.bookings.is_empty());
    }

    #[test]
    fn test_no_operating_days_means_every_day() {
        let bus: BusDetails = serde_json::from_value(json!({
            "busName": "Any",
            "busNumber": "X",
            "numberOfSeats": 10,
            "busType": "trip_available",
            "status": "pending"
        }))
        .unwrap();
        assert!(bus.operates_on(Weekday::Sunday));
    }

    #[test]
    fn test_passenger_stub() {
        let user = User::passenger_stub("u1", "b1");
        assert_eq!(user.user_type, UserRole::Passenger);
        assert_eq!(user.bookings, vec!["b1".to_string()]);
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("busDetails").is_none());
    }
}
