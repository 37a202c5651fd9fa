//! Configuration file handling.
//!
//! A TOML file with a `[driver]` and a `[session]` table. Every key is
//! optional; missing keys take the defaults the camera is opened with.
//!
//! ```toml
//! [driver]
//! library = "tisgrabber_x64"
//!
//! [session]
//! video_format = "Y16 (1024x768)"
//! exposure_seconds = 0.05
//! trigger = false
//! snap_timeout_ms = 2000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::REQUIRED_FORMAT_PREFIX;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Driver library settings.
    pub driver: DriverConfig,
    /// Settings applied when a session opens.
    pub session: SessionConfig,
}

/// Driver library settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Base name of the driver library.
    pub library: String,
    /// License key passed to `IC_InitLibrary`.
    pub license_key: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            library: "tisgrabber_x64".to_owned(),
            license_key: None,
        }
    }
}

/// Settings applied when a session opens.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Video format token to negotiate.
    pub video_format: String,
    /// Exposure time in seconds.
    pub exposure_seconds: f64,
    /// Whether hardware trigger mode is enabled.
    pub trigger: bool,
    /// Snap timeout; unset waits forever.
    pub snap_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            video_format: "Y16 (2592x1944)".to_owned(),
            exposure_seconds: 0.1,
            trigger: false,
            snap_timeout_ms: None,
        }
    }
}

impl SessionConfig {
    /// Snap timeout as a duration.
    #[must_use]
    pub fn snap_timeout(&self) -> Option<Duration> {
        self.snap_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// Returns defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would only fail later against the camera.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.session.video_format.trim().starts_with(REQUIRED_FORMAT_PREFIX) {
            return Err(ConfigError::Invalid(format!(
                "session.video_format '{}' must start with {REQUIRED_FORMAT_PREFIX}",
                self.session.video_format
            )));
        }
        let exposure = self.session.exposure_seconds;
        if !exposure.is_finite() || exposure <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "session.exposure_seconds must be a positive number, got {exposure}"
            )));
        }
        if self.driver.library.trim().is_empty() {
            return Err(ConfigError::Invalid("driver.library must not be empty".to_owned()));
        }
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        /// Config file path (empty when parsed from a string).
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
