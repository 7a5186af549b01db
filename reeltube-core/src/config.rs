//! Application configuration.
//!
//! Read from a TOML file; every field has a default so a missing file or a
//! partial file is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_ENV_VAR: &str = "REELTUBE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "reeltube.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub download_dir: PathBuf,
    pub polling: PollingConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryPolicy,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    /// Used instead of `interval_secs` while battery optimization is on.
    pub battery_saver_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub call_secs: u64,
    pub upload_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
    pub failure_threshold: u32,
    pub recovery_timeout_s: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub call_delay_ms: u64,
    pub upload_step_delay_ms: u64,
    pub grant_permission: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://reeltube.db".to_string(),
            download_dir: PathBuf::from("downloads"),
            polling: PollingConfig::default(),
            timeouts: TimeoutConfig::default(),
            retry: RetryPolicy::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            battery_saver_interval_secs: 900,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_secs: 30,
            upload_secs: 300,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 60000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
            failure_threshold: 3,
            recovery_timeout_s: 120,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            call_delay_ms: 250,
            upload_step_delay_ms: 500,
            grant_permission: true,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self, battery_optimized: bool) -> Duration {
        if battery_optimized {
            Duration::from_secs(self.battery_saver_interval_secs)
        } else {
            Duration::from_secs(self.interval_secs)
        }
    }
}

impl TimeoutConfig {
    pub fn call(&self) -> Duration {
        Duration::from_secs(self.call_secs)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_secs)
    }
}

impl AppConfig {
    /// Loads from `$REELTUBE_CONFIG`, else `reeltube.toml` when present,
    /// else defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }

        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => ConfigError::PermissionDenied {
                path: path.display().to_string(),
            },
            _ => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
        })?;

        let config = Self::from_toml(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(invalid("database_url", &self.database_url));
        }
        if self.polling.interval_secs == 0 {
            return Err(invalid("polling.interval_secs", self.polling.interval_secs));
        }
        if self.polling.battery_saver_interval_secs == 0 {
            return Err(invalid(
                "polling.battery_saver_interval_secs",
                self.polling.battery_saver_interval_secs,
            ));
        }
        if self.timeouts.call_secs == 0 {
            return Err(invalid("timeouts.call_secs", self.timeouts.call_secs));
        }
        if self.timeouts.upload_secs == 0 {
            return Err(invalid("timeouts.upload_secs", self.timeouts.upload_secs));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", self.retry.max_attempts));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(invalid("retry.jitter_factor", self.retry.jitter_factor));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
