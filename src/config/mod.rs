//! # Reconciler Configuration
//!
//! Process-wide deployment configuration for the reconciliation core. Values
//! come from built-in defaults, optional TOML files under `config/`, and
//! `RECONCILER__`-prefixed environment variables, in that order of precedence.
//!
//! Retention thresholds are deliberately absent: they live in the operator's
//! [`CoreSettings`](crate::models::CoreSettings) record and are re-read each cycle.
//!
//! ```rust
//! use fleet_reconciler::config::ReconcilerConfig;
//!
//! let mut config = ReconcilerConfig::default();
//! config.deployment.latest_agent_version = "2.4.0".to_string();
//! assert!(config.validate().is_ok());
//!
//! let snapshot = config.snapshot().unwrap();
//! assert_eq!(snapshot.latest_agent_version.to_string(), "2.4.0");
//! ```

pub mod error;
pub mod loader;

use semver::Version;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{defaults, system};
use crate::models::parse_agent_version;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/reconciler.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Published agent versions
    pub deployment: DeploymentConfig,

    /// Expired run-once reaping and retention pruning cadence
    pub maintenance: MaintenanceConfig,

    /// Status aggregation and agent reconciliation cadence
    pub cache_refresh: CacheRefreshConfig,

    /// PostgreSQL store connection settings
    pub database: DatabaseConfig,

    /// Channel-backed job dispatcher settings
    pub jobs: JobQueueConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Version currently published to the fleet; required
    pub latest_agent_version: String,
    /// Agents below this version are left out of remote reconciliation
    pub min_supported_agent_version: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            latest_agent_version: String::new(),
            min_supported_agent_version: system::MIN_SUPPORTED_AGENT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: defaults::MAINTENANCE_INTERVAL_SECONDS,
        }
    }
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheRefreshConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for CacheRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: defaults::CACHE_REFRESH_INTERVAL_SECONDS,
        }
    }
}

impl CacheRefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to `DATABASE_URL` when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: defaults::DATABASE_MAX_CONNECTIONS,
            acquire_timeout_seconds: defaults::DATABASE_ACQUIRE_TIMEOUT_SECONDS,
        }
    }
}

impl DatabaseConfig {
    pub fn database_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobQueueConfig {
    pub channel_capacity: usize,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            channel_capacity: defaults::JOB_CHANNEL_CAPACITY,
        }
    }
}

/// Parsed, immutable view of the deployment settings handed to each component run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSnapshot {
    pub latest_agent_version: Version,
    pub min_supported_agent_version: Version,
}

impl ReconcileSnapshot {
    pub fn new(latest_agent_version: Version, min_supported_agent_version: Version) -> Self {
        Self {
            latest_agent_version,
            min_supported_agent_version,
        }
    }

    /// An agent version takes part in remote reconciliation
    pub fn is_supported(&self, version: &Version) -> bool {
        *version >= self.min_supported_agent_version
    }

    pub fn is_latest(&self, version: &Version) -> bool {
        *version == self.latest_agent_version
    }
}

impl ReconcilerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.deployment.latest_agent_version.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "deployment.latest_agent_version",
                "deployment configuration",
            ));
        }

        parse_version_field(
            "deployment.latest_agent_version",
            &self.deployment.latest_agent_version,
        )?;
        parse_version_field(
            "deployment.min_supported_agent_version",
            &self.deployment.min_supported_agent_version,
        )?;

        if self.maintenance.interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "maintenance.interval_seconds",
                "0",
                "interval must be greater than 0",
            ));
        }

        if self.cache_refresh.interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache_refresh.interval_seconds",
                "0",
                "interval must be greater than 0",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.jobs.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "jobs.channel_capacity",
                "0",
                "channel capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Build the per-cycle snapshot of deployment settings
    pub fn snapshot(&self) -> ConfigResult<ReconcileSnapshot> {
        Ok(ReconcileSnapshot::new(
            parse_version_field(
                "deployment.latest_agent_version",
                &self.deployment.latest_agent_version,
            )?,
            parse_version_field(
                "deployment.min_supported_agent_version",
                &self.deployment.min_supported_agent_version,
            )?,
        ))
    }
}

fn parse_version_field(field: &str, raw: &str) -> ConfigResult<Version> {
    parse_agent_version(raw)
        .ok_or_else(|| ConfigurationError::invalid_value(field, raw, "not a version string"))
}
