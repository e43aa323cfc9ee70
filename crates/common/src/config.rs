//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Attendance and geofencing configuration.
    #[serde(default)]
    pub attendance: AttendanceConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`postgres://...` or `sqlite://...`).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Attendance configuration.
///
/// Governs how check-ins are sampled, deduplicated and classified against a
/// student's registered placement location.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
    /// Radius around the placement location that still counts as on-site.
    #[serde(default = "default_geofence_radius")]
    pub geofence_radius_meters: f64,
    /// IANA timezone used for calendar days when a student has none set.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Upper bound for a single position sample.
    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,
    /// Maximum age of a cached position that may be reused.
    #[serde(default = "default_max_cache_age_ms")]
    pub max_cache_age_ms: u64,
    /// Request a high accuracy fix.
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
    /// Store off-site samples with a failed status.
    #[serde(default)]
    pub enforce_geofence: bool,
    /// Allow at most one manual check-in per student per day.
    #[serde(default = "default_true")]
    pub manual_daily_limit: bool,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            geofence_radius_meters: default_geofence_radius(),
            default_timezone: default_timezone(),
            sample_timeout_ms: default_sample_timeout_ms(),
            max_cache_age_ms: default_max_cache_age_ms(),
            high_accuracy: true,
            enforce_geofence: false,
            manual_daily_limit: true,
        }
    }
}

impl AttendanceConfig {
    /// Parsed default timezone.
    pub fn timezone(&self) -> AppResult<chrono_tz::Tz> {
        self.default_timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| AppError::Config(format!("Invalid default_timezone: {e}")))
    }

    /// Sampling timeout as a [`Duration`].
    #[must_use]
    pub const fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    /// Cache age limit as a [`Duration`].
    #[must_use]
    pub const fn max_cache_age(&self) -> Duration {
        Duration::from_millis(self.max_cache_age_ms)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_geofence_radius() -> f64 {
    100.0
}

fn default_timezone() -> String {
    "UTC".to_string()
}

const fn default_sample_timeout_ms() -> u64 {
    10_000
}

const fn default_max_cache_age_ms() -> u64 {
    300_000
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `LOGBOOK_ENV`)
    /// 3. Environment variables with `LOGBOOK_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("LOGBOOK_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LOGBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("LOGBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
