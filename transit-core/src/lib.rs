pub mod identity;
pub mod models;
pub mod store;

pub use store::{DocPath, Document, DocumentStore, Query, StoreError, StoreTransaction, WriteMode};

use transit_shared::calendar::CalendarError;

/// Outcome classes every engine operation reports to its caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A referenced bus, trip, routine, hire request or booking does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The request itself is unacceptable (seat taken, wrong day, no capacity...).
    #[error("Validation failed: {0}")]
    ValidationError(String),
    /// The store aborted the transaction because of a concurrent write.
    /// Nothing was committed, so the whole request may be retried.
    #[error("Transient conflict: {0}")]
    TransientConflict(String),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl EngineError {
    /// HTTP-class status the outer API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::ValidationError(_) => 400,
            Self::IdentityError(_) => 401,
            Self::TransientConflict(_) => 503,
            Self::InternalError(_) => 500,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientConflict(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => Self::NotFound(path),
            StoreError::Conflict(path) => Self::TransientConflict(format!("concurrent update of {}", path)),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl From<CalendarError> for EngineError {
    fn from(err: CalendarError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
