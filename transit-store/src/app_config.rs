use serde::Deserialize;
use std::env;
use std::time::Duration;
use transit_shared::RetryConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Whether the backend has the indexes needed for server-side ordering.
    #[serde(default = "default_true")]
    pub ordered_queries: bool,
}

fn default_max_connections() -> u32 { 5 }
fn default_true() -> bool { true }

/// Retry policy for booking transactions aborted by a concurrent write.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 20,
            backoff_multiplier: 2.0,
            max_delay_ms: 500,
        }
    }
}

impl BookingConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Parameters of the seat map served when no availability is stored yet.
#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    pub default_capacity: u32,
    pub seats_per_row: u32,
    pub base_price: f64,
    pub premium_multiplier: f64,
    pub wheelchair_row_interval: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_capacity: 54,
            seats_per_row: 4,
            base_price: 850.0,
            premium_multiplier: 1.2,
            wheelchair_row_interval: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RoutesConfig {
    #[serde(default)]
    pub seed: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TRANSIT__STORE__BACKEND=postgres`
            .add_source(config::Environment::with_prefix("TRANSIT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
