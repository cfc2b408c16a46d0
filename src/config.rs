//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    pub device: DeviceConfig,
}

/// Serial transport configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// Explicit device path; when absent the known paths are probed
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Device behavior configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_load_calibration")]
    pub load_calibration: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// Default value functions
fn default_baud_rate() -> u32 { 115_200 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_load_calibration() -> bool { true }
fn default_poll_interval_ms() -> u64 { 1000 }

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig {
                port: None,
                baud_rate: default_baud_rate(),
                timeout_ms: default_timeout_ms(),
            },
            device: DeviceConfig {
                load_calibration: default_load_calibration(),
                poll_interval_ms: default_poll_interval_ms(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if let Some(port) = &self.transport.port {
            if port.is_empty() {
                return Err(crate::error::BtdaqError::Config(toml::de::Error::custom(
                    "transport port cannot be an empty string",
                )));
            }
        }

        if self.transport.timeout_ms == 0 || self.transport.timeout_ms > 10_000 {
            return Err(crate::error::BtdaqError::Config(toml::de::Error::custom(
                "timeout_ms must be between 1 and 10000",
            )));
        }

        if self.device.poll_interval_ms == 0 || self.device.poll_interval_ms > 60_000 {
            return Err(crate::error::BtdaqError::Config(toml::de::Error::custom(
                "poll_interval_ms must be between 1 and 60000",
            )));
        }

        // Standard rates the radio module accepts
        if ![9600, 19200, 38400, 57600, 115_200, 230_400].contains(&self.transport.baud_rate) {
            return Err(crate::error::BtdaqError::Config(toml::de::Error::custom(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400",
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.baud_rate, 115_200);
        assert_eq!(config.transport.timeout_ms, 1000);
        assert!(config.device.load_calibration);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[transport]
port = "/dev/rfcomm0"
timeout_ms = 500

[device]
poll_interval_ms = 2000
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.transport.port.as_deref(), Some("/dev/rfcomm0"));
        assert_eq!(config.transport.timeout_ms, 500);
        assert_eq!(config.device.poll_interval_ms, 2000);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[transport]

[device]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.transport.port, None);
        assert_eq!(config.transport.baud_rate, 115_200);
    }

    #[test]
    fn test_empty_port_rejected() {
        let mut config = Config::default();
        config.transport.port = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.transport.timeout_ms = 0;
        assert!(config.validate().is_err());

        config.transport.timeout_ms = 10_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = Config::default();
        config.device.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        config.device.poll_interval_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nonstandard_baud_rate_rejected() {
        let mut config = Config::default();
        config.transport.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }
}
