pub mod daily;
pub mod routes;
pub mod routines;

pub use daily::DailyScheduleService;
pub use routes::RouteCatalog;
pub use routines::RoutineManager;
