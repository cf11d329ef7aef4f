pub mod route;
pub mod search;

pub use route::{parse_route, route_matches, RouteEnds, ROUTE_SEPARATORS};
pub use search::{BusMatch, BusSearch, RouteDisplay, ScheduleMatch};
