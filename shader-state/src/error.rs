//! Error types
//!
//! The state manager itself never fails: unresolvable bindings are skipped
//! and slot exhaustion degrades. Only configuration persistence is fallible.

use std::path::PathBuf;

/// Errors from loading or saving [`Config`](crate::Config)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid config TOML
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serializing the config failed
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No home directory, so no platform config directory
    #[error("could not determine the platform config directory")]
    NoConfigDir,
}
