//! heatgrid.toml configuration parser.
//!
//! Every section is optional; missing keys fall back to the defaults
//! below.
//!
//! ```toml
//! [server]
//! port = 8088
//! admin_token = "change-me"
//!
//! [sensor]
//! max_retries = 3
//! retry_delay = "2s"
//! timeout = "2s"
//! failsafe_hit = 75
//!
//! [monitor]
//! interval = "5s"
//! servers = ["rack-a", "rack-b"]
//!
//! [router]
//! freeze_threshold = 90
//! release_threshold = 70
//!
//! [logging]
//! format = "json"
//! filter = "info,heatgrid=debug"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::{DATA_SHIFT_GRADUAL_THRESHOLD, MAX_HIT};
use crate::duration::parse_duration;

pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_SAMPLE_TIMEOUT: Duration = Duration::from_secs(2);
/// Fail-safe hit. Sits in the gradual data-shift bucket: a blind sensor
/// starts moving data off the server but never latches shutdown.
pub const DEFAULT_FAILSAFE_HIT: i32 = DATA_SHIFT_GRADUAL_THRESHOLD;
pub const DEFAULT_PHASE_CYCLES: u32 = 5;
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_FREEZE_THRESHOLD: i32 = 90;
pub const DEFAULT_RELEASE_THRESHOLD: i32 = 70;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
    pub monitor: MonitorConfig,
    pub router: RouterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Token required to reset a server's latches. Reset is disabled
    /// when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub max_retries: u32,
    pub retry_delay: String,
    /// Upper bound on a single sample attempt.
    pub timeout: String,
    pub failsafe_hit: i32,
    /// Samples the simulator spends in each load phase.
    pub phase_cycles: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: "2s".to_string(),
            timeout: "2s".to_string(),
            failsafe_hit: DEFAULT_FAILSAFE_HIT,
            phase_cycles: DEFAULT_PHASE_CYCLES,
        }
    }
}

impl SensorConfig {
    pub fn retry_delay(&self) -> Duration {
        parse_duration(&self.retry_delay).unwrap_or(DEFAULT_RETRY_DELAY)
    }

    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(DEFAULT_SAMPLE_TIMEOUT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval: String,
    /// Servers that get a background evaluation loop at startup.
    pub servers: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: "5s".to_string(),
            servers: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        parse_duration(&self.interval).unwrap_or(DEFAULT_MONITOR_INTERVAL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub freeze_threshold: i32,
    pub release_threshold: i32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            freeze_threshold: DEFAULT_FREEZE_THRESHOLD,
            release_threshold: DEFAULT_RELEASE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}

impl HeatConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: HeatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.release_threshold >= self.router.freeze_threshold {
            return Err(ConfigError::Invalid(format!(
                "router.release_threshold ({}) must be below router.freeze_threshold ({})",
                self.router.release_threshold, self.router.freeze_threshold
            )));
        }
        if self.sensor.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "sensor.max_retries must be at least 1".to_string(),
            ));
        }
        if !(0..=MAX_HIT).contains(&self.sensor.failsafe_hit) {
            return Err(ConfigError::Invalid(format!(
                "sensor.failsafe_hit ({}) must be within 0..={MAX_HIT}",
                self.sensor.failsafe_hit
            )));
        }
        if parse_duration(&self.sensor.retry_delay).is_none() {
            return Err(ConfigError::Invalid(format!(
                "sensor.retry_delay: cannot parse {:?}",
                self.sensor.retry_delay
            )));
        }
        if parse_duration(&self.sensor.timeout).is_none_or(|d| d.is_zero()) {
            return Err(ConfigError::Invalid(format!(
                "sensor.timeout: cannot parse {:?}",
                self.sensor.timeout
            )));
        }
        if parse_duration(&self.monitor.interval).is_none_or(|d| d.is_zero()) {
            return Err(ConfigError::Invalid(format!(
                "monitor.interval: cannot parse {:?}",
                self.monitor.interval
            )));
        }
        Ok(())
    }
}
