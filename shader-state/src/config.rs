//! Configuration management (shader-state.toml)
//!
//! Handles loading, saving, and providing defaults for the state manager and
//! the shader memory monitor. Settings are stored in TOML format in the
//! platform-specific config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "shader-state.toml";

/// Shader state configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// State manager settings
    #[serde(default)]
    pub state: StateConfig,
    /// Memory monitor settings
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// State manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Log every accepted state change at debug level (default: false)
    #[serde(default)]
    pub log_state_changes: bool,
    /// Texture slot count used when the context cannot report one (default: 32)
    #[serde(default = "default_fallback_texture_slots")]
    pub fallback_texture_slots: u32,
}

/// Shader memory monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Threshold above which unload suggestions fire (default: 256 MiB)
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: usize,
    /// Run periodic optimization from `update` (default: true)
    #[serde(default = "default_true")]
    pub auto_optimize: bool,
    /// Seconds between optimization passes (default: 60)
    #[serde(default = "default_optimization_interval")]
    pub optimization_interval_secs: u64,
    /// Seconds between memory reports (default: 300)
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Estimate per-shader sizes at registration (default: true)
    #[serde(default = "default_true")]
    pub detailed_tracking: bool,
    /// A shader accessed within this many seconds counts as active (default: 60)
    #[serde(default = "default_active_window")]
    pub active_window_secs: u64,
}

fn default_fallback_texture_slots() -> u32 {
    32
}
fn default_threshold_bytes() -> usize {
    256 * 1024 * 1024
}
fn default_optimization_interval() -> u64 {
    60
}
fn default_report_interval() -> u64 {
    300
}
fn default_active_window() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            log_state_changes: false,
            fallback_texture_slots: default_fallback_texture_slots(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: default_threshold_bytes(),
            auto_optimize: default_true(),
            optimization_interval_secs: default_optimization_interval(),
            report_interval_secs: default_report_interval(),
            detailed_tracking: default_true(),
            active_window_secs: default_active_window(),
        }
    }
}

impl Config {
    /// Parse a config from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\GameEngine\config`
/// On macOS: `~/Library/Application Support/dev.gameengine.GameEngine`
/// On Linux: `~/.config/gameengine`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "gameengine", "GameEngine")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Reads `shader-state.toml` from the platform's configuration directory.
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    let Some(path) = config_dir().map(|dir| dir.join(CONFIG_FILE)) else {
        return Config::default();
    };
    match Config::load_from(&path) {
        Ok(config) => config,
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Config::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load shader state config, using defaults");
            Config::default()
        }
    }
}

/// Saves the configuration to the platform's configuration directory.
///
/// # Errors
///
/// Returns an error if there is no config directory, or the directory or
/// file cannot be written.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    config.save_to(&dir.join(CONFIG_FILE))
}
