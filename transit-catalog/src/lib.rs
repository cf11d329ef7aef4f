pub mod availability;
pub mod bus;
pub mod layout;
pub mod trips;

pub use availability::AvailabilityRepository;
pub use bus::BusRegistry;
pub use layout::{default_availability, split_price_cents};
pub use trips::TripService;
