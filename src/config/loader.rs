//! Configuration Loader
//!
//! Environment-aware layered loading: `reconciler.toml`, then
//! `reconciler.{environment}.toml`, then `RECONCILER__SECTION__KEY` environment
//! variables. Missing files are skipped; the merged result must validate.

use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::ReconcilerConfig;
use crate::constants::system;

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ReconcilerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection from `./config`
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading reconciler configuration"
        );

        let config = Self::load_layers(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            latest_agent_version = %config.deployment.latest_agent_version,
            min_supported_agent_version = %config.deployment.min_supported_agent_version,
            maintenance_interval_seconds = config.maintenance.interval_seconds,
            cache_refresh_interval_seconds = config.cache_refresh.interval_seconds,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn load_layers(config_directory: &Path, environment: &str) -> ConfigResult<ReconcilerConfig> {
        let base = config_directory.join("reconciler.toml");
        let overlay = config_directory.join(format!("reconciler.{environment}.toml"));

        let settings = Config::builder()
            .add_source(File::from(base.as_path()).required(false))
            .add_source(File::from(overlay.as_path()).required(false))
            .add_source(
                Environment::with_prefix(system::CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::LoadError {
                source_desc: config_directory.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(settings.try_deserialize::<ReconcilerConfig>()?)
    }

    /// Detect environment from `RECONCILER_ENV`, defaulting to "development"
    pub fn detect_environment() -> String {
        env::var(system::ENVIRONMENT_VAR)
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }
}
