use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A driver's proposal to add a named route to the canonical list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub id: String,
    pub driver_id: String,
    pub route_name: String,
    pub status: RouteRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// The allowed route names, kept as one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRoutes {
    #[serde(default)]
    pub routes: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CanonicalRoutes {
    pub const DOC_ID: &'static str = "canonical";

    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.routes.iter().any(|r| r.eq_ignore_ascii_case(name))
    }
}
