use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_DIR_NAME: &str = "botdeck";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOG_FILE_NAME: &str = "botdeck.log";

/// Template written on first run.
pub const CONFIG_TEMPLATE: &str = r#"# botdeck configuration

[gateway]
# Base URL of the bot platform's dashboard API
base_url = "http://127.0.0.1:8000"
# Guild targeted by player commands issued from this dashboard
guild_id = 0

[monitor]
# Resource monitor polling interval
poll_interval_secs = 5

[visualizer]
# Time-domain transform window (samples)
window = 2048
# Stroke width of the waveform polyline
line_width = 2.0
# Frames per second for timer-driven hosts
frame_rate = 60

[logging]
# Write logs to the cache directory in addition to the console
enabled = false
"#;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub guild_id: i64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            guild_id: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

const fn default_poll_interval() -> u64 {
    5
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

const fn default_window() -> usize {
    2048
}

const fn default_line_width() -> f32 {
    2.0
}

const fn default_frame_rate() -> u32 {
    60
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            line_width: default_line_width(),
            frame_rate: default_frame_rate(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl DeckConfig {
    /// Get the configuration directory path (~/.config/botdeck/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    /// Get the config file path (~/.config/botdeck/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Get the log file path (~/.cache/botdeck/botdeck.log)
    #[must_use]
    pub fn log_file_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(LOG_FILE_NAME)
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the template was just created (the caller should point the user at
    /// the new file and exit).
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges that serde defaults can't express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when a field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.base_url.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "gateway.base_url must not be empty".to_string(),
            });
        }
        if self.visualizer.window == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "visualizer.window must be at least 1".to_string(),
            });
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "monitor.poll_interval_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            monitor: MonitorConfig::default(),
            visualizer: VisualizerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config: DeckConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.monitor.poll_interval_secs, 5);
        assert_eq!(config.visualizer.window, 2048);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: DeckConfig = toml::from_str("").unwrap();
        assert_eq!(config.visualizer.window, 2048);
        assert_eq!(config.visualizer.frame_rate, 60);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config: DeckConfig = toml::from_str("[visualizer]\nwindow = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let config: DeckConfig = toml::from_str("[gateway]\nbase_url = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }
}
