pub mod calendar;
pub mod pii;
pub mod retry;

pub use calendar::{parse_travel_date, ClockTime, Weekday};
pub use pii::Masked;
pub use retry::{retry_with_backoff, RetryConfig};
