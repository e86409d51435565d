//! # Configuration Module
//!
//! Handles loading and validating tool configuration from TOML files.
//!
//! Every section and key is optional; a missing file section takes its
//! defaults, so an empty file is a valid configuration.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerConfigError};

/// Baud rates the tracker's serial console accepts
pub const VALID_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];

/// Accepted logging levels
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub encode: EncodeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Log the tracker's reply for this long after an upload (0 = don't listen)
    #[serde(default)]
    pub reply_window_ms: u64,
}

/// Message file output
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

/// Encoding policy
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EncodeConfig {
    /// Send a message even when some included fields failed to encode
    #[serde(default)]
    pub allow_partial: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 1000 }

fn default_output_path() -> PathBuf { PathBuf::from("config_message.txt") }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reply_window_ms: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: default_output_path() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> TrackerConfigError {
    TrackerConfigError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tracker_config::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                VALID_BAUD_RATES.map(|b| b.to_string()).join(", ")
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.reply_window_ms > 60000 {
            return Err(invalid("reply_window_ms must be at most 60000"));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(invalid("output path cannot be empty"));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if let Some(file) = &self.logging.file {
            if file.as_os_str().is_empty() {
                return Err(invalid("logging file cannot be empty when set"));
            }
        }

        Ok(())
    }
}
