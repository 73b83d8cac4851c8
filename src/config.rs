use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::mqtt::config::{MqttConfig, MqttConfigError};
use crate::remote::model::{ButtonId, ModelError};
use crate::remote::watcher::WatcherTimings;

const CONFIG_DIR: &str = "pico-bridge";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "PICO_BRIDGE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid double click window override: {0}")]
    InvalidOverride(#[from] ModelError),

    #[error("Double click window for {0} is overridden more than once")]
    DuplicateOverride(ButtonId),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Invalid [mqtt] section: {0}")]
    Mqtt(#[from] MqttConfigError),

    #[error("No config path given and no config directory available")]
    NoConfigDir,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub button_watcher: ButtonWatcherConfig,
    pub topology: TopologyConfig,
    pub gateway: GatewayConfig,
    pub mqtt: MqttConfig,
}

impl AppConfig {
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.button_watcher.validate()?;
        self.mqtt.validate()?;
        if self.topology.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "topology.refresh_interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Resolves the config file: explicit argument, then `$PICO_BRIDGE_CONFIG`,
/// then the platform config directory.
pub fn resolve_path(explicit: Option<String>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}

/// Timing windows of the gesture classifier, in milliseconds.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ButtonWatcherConfig {
    pub double_click_window_ms: u64,
    pub sleep_duration_ms: u64,
    pub max_duration_ms: u64,
    /// Per-button double click window, keyed by button name (`INCREASE`, ...)
    pub double_click_window_overrides: HashMap<String, u64>,
}

impl Default for ButtonWatcherConfig {
    fn default() -> Self {
        Self {
            double_click_window_ms: 500,
            sleep_duration_ms: 250,
            max_duration_ms: 5000,
            double_click_window_overrides: HashMap::new(),
        }
    }
}

impl ButtonWatcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for name in self.double_click_window_overrides.keys() {
            let button = name.parse::<ButtonId>()?;
            if !seen.insert(button) {
                return Err(ConfigError::DuplicateOverride(button));
            }
        }
        if self.sleep_duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "button_watcher.sleep_duration_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn double_click_window(&self, button: ButtonId) -> Duration {
        let millis = self
            .double_click_window_overrides
            .iter()
            .find(|(name, _)| name.parse::<ButtonId>().ok() == Some(button))
            .map(|(_, millis)| *millis)
            .unwrap_or(self.double_click_window_ms);
        Duration::from_millis(millis)
    }

    pub fn timings_for(&self, button: ButtonId) -> WatcherTimings {
        WatcherTimings {
            double_click_window: self.double_click_window(button),
            sleep_duration: Duration::from_millis(self.sleep_duration_ms),
            max_duration: Duration::from_millis(self.max_duration_ms),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TopologyConfig {
    pub refresh_interval_secs: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
        }
    }
}

impl TopologyConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// TOML file listing devices, buttons and areas
    pub inventory_path: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            inventory_path: PathBuf::from("inventory.toml"),
        }
    }
}
