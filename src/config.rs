//! Configuration for the proctor agent.

use crate::core::objects::DEFAULT_UNAUTHORIZED_ITEMS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the proctor agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Period of the sampling loop
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,

    /// Focus tracker thresholds
    pub tracker: TrackerConfig,

    /// Object labels that produce an unauthorized-items event
    pub unauthorized_items: Vec<String>,

    /// Storage backend that receives events, e.g. `http://127.0.0.1:5000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Path for exporting reports
    pub export_path: PathBuf,

    /// Path for storing transparency logs
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proctor-agent");

        Self {
            tick_interval: Duration::from_millis(1000),
            tracker: TrackerConfig::default(),
            unauthorized_items: DEFAULT_UNAUTHORIZED_ITEMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            backend_url: None,
            export_path: data_dir.join("reports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proctor-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Tick interval as a chrono duration, for advancing virtual clocks.
    pub fn tick_step(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.tick_interval).unwrap_or(chrono::Duration::seconds(1))
    }
}

/// Thresholds of the focus tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Continuous look-away before it is reported
    #[serde(with = "duration_secs")]
    pub look_away: Duration,

    /// Continuous face absence before it is reported
    #[serde(with = "duration_secs")]
    pub face_absence: Duration,

    /// Allowed horizontal offset from center, as a fraction of frame width
    pub center_tolerance_x: f64,

    /// Allowed vertical offset from center, as a fraction of frame height
    pub center_tolerance_y: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            look_away: Duration::from_secs(5),
            face_absence: Duration::from_secs(10),
            center_tolerance_x: 0.2,
            center_tolerance_y: 0.2,
        }
    }
}

impl TrackerConfig {
    pub fn look_away_threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.look_away).unwrap_or(chrono::Duration::seconds(5))
    }

    pub fn face_absence_threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.face_absence).unwrap_or(chrono::Duration::seconds(10))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Serde support for Duration as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
