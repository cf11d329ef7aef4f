//! Typed records for every document the engine reads or writes.
//!
//! Field names serialize in camelCase, which is the shape the stored
//! documents use and the shape dotted field-path updates refer to.

pub mod booking;
pub mod hire;
pub mod route;
pub mod routine;
pub mod seat;
pub mod trip;
pub mod user;

pub use booking::{Booking, BookingMode, BookingRequest, BookingStatus, HireType, PaymentStatus, SeatSelection};
pub use hire::{HireParty, HireRequest, HireStatus, NewHireRequest};
pub use route::{CanonicalRoutes, RouteRequest, RouteRequestStatus};
pub use routine::{
    daily_schedule_id, DailySchedule, Routine, RoutineAvailability, RoutineChanges, RoutineDraft, RoutineStatus,
    ScheduledRoutine, TimeSlot,
};
pub use seat::{availability_id, SeatAvailability, SeatEntry, SeatStatus, SeatType};
pub use trip::{NewTrip, Trip, TripStatus};
pub use user::{BusDetails, BusMode, BusPricing, RegistrationStatus, User, UserRole};
