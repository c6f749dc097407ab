//! Configuration module
//!
//! Handles loading and saving swipeshot configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::screen::{DisplayMetrics, MetricsError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid display settings: {0}")]
    Display(#[from] MetricsError),

    #[error("Screenshot command is empty")]
    EmptyCommand,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,

    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Readiness gating
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Gesture activity publishing
    #[serde(default)]
    pub gesture: GestureConfig,

    /// Screenshot action
    #[serde(default)]
    pub screenshot: ScreenshotConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Pixel density scale factor
    #[serde(default = "default_density")]
    pub density: f32,
    /// Panel width override
    pub width: Option<u32>,
    /// Panel height override
    pub height: Option<u32>,
}

fn default_density() -> f32 {
    1.0
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            density: default_density(),
            width: None,
            height: None,
        }
    }
}

impl DisplayConfig {
    /// Resolve the configured metrics, falling back to the detected panel size
    pub fn metrics(&self) -> ConfigResult<DisplayMetrics> {
        let fallback = DisplayMetrics::default();
        let metrics = DisplayMetrics::new(
            self.density,
            self.width.unwrap_or(fallback.width),
            self.height.unwrap_or(fallback.height),
        );
        metrics.validate()?;
        Ok(metrics)
    }
}

/// Input configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Touchscreen device (auto-detected if not set)
    pub device: Option<PathBuf>,
}

/// Readiness configuration
///
/// Each flag is a file polled until it exists with a non-zero value.
/// Unset flags are considered satisfied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessConfig {
    pub boot_completed_flag: Option<PathBuf>,
    pub device_provisioned_flag: Option<PathBuf>,
}

/// Gesture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GestureConfig {
    /// File receiving `1` while a swipe is being tracked, `0` otherwise
    pub active_state_file: Option<PathBuf>,
}

/// Screenshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Command run when a swipe is recognized
    #[serde(default = "default_screenshot_command")]
    pub command: Vec<String>,
    /// Working directory for the command
    pub output_dir: Option<PathBuf>,
}

fn default_screenshot_command() -> Vec<String> {
    vec!["grim".to_string()]
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            command: default_screenshot_command(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("swipeshot/config.toml")),
            Some(PathBuf::from("./swipeshot.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check settings that cannot be expressed in the types
    pub fn validate(&self) -> ConfigResult<()> {
        self.display.metrics()?;
        if self.screenshot.command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        display: DisplayConfig {
            density: 2.75,
            width: Some(1080),
            height: Some(2400),
        },
        input: InputConfig {
            device: Some(PathBuf::from("/dev/input/event2")),
        },
        readiness: ReadinessConfig {
            boot_completed_flag: Some(PathBuf::from("/run/swipeshot/boot_completed")),
            device_provisioned_flag: Some(PathBuf::from("/var/lib/swipeshot/provisioned")),
        },
        gesture: GestureConfig {
            active_state_file: Some(PathBuf::from("/run/swipeshot/gesture_active")),
        },
        screenshot: ScreenshotConfig {
            command: vec!["grim".to_string(), "-t".to_string(), "png".to_string()],
            output_dir: Some(PathBuf::from("/var/lib/swipeshot/screenshots")),
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}
