//! Configuration management for the seat plan.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Log filter used when neither `RUST_LOG` nor `SEATING_LOG_LEVEL` is set
pub const DEFAULT_LOG_FILTER: &str = "warn,bus_seating=info";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reservation storage
    pub storage: StorageConfig,
    /// Engine behaviour
    pub engine: EngineConfig,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON document holding the reservations
    pub data_file: PathBuf,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a caller waits for a command's outcome, in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `SEATING_DATA_FILE` | `bus-reservations.json` |
    /// | `SEATING_REQUEST_TIMEOUT_SECS` | `30` |
    /// | `SEATING_LOG_LEVEL` | `warn,bus_seating=info` |
    ///
    /// `RUST_LOG`, when set, still wins over `log_level`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig {
                data_file: env::var("SEATING_DATA_FILE")
                    .map_or_else(|_| PathBuf::from("bus-reservations.json"), PathBuf::from),
            },
            engine: EngineConfig {
                request_timeout_secs: env::var("SEATING_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|&secs| secs > 0)
                    .unwrap_or(30),
            },
            log_level: env::var("SEATING_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_file: PathBuf::from("bus-reservations.json"),
            },
            engine: EngineConfig {
                request_timeout_secs: 30,
            },
            log_level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
