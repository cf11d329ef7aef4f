pub mod hire;
pub mod manager;
pub mod orchestrator;

pub use hire::HireNegotiation;
pub use manager::BookingManager;
pub use orchestrator::BookingOrchestrator;
