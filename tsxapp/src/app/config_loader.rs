//! Configuration loading for the traffic steering xApp.
//!
//! Wraps [`XappConfig`] from `tsxapp-common` with validation of the values
//! the xApp cannot run without.
//!
//! # Example
//!
//! ```rust,ignore
//! use tsxapp::app::load_and_validate_config;
//!
//! let config = load_and_validate_config("config/tsxapp.yaml")?;
//! println!("Starting {}", config.app_id);
//! ```

use std::path::Path;

use thiserror::Error;
use tsxapp_common::{SliceConfig, XappConfig};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ConfigValidationError),
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A required name is empty
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// A port is zero
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    /// An interval is zero
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Default slice is malformed
    #[error("Invalid default slice: {0}")]
    InvalidSlice(String),
}

/// Loads a configuration from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<XappConfig, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    load_config_from_str(&contents)
}

/// Loads a configuration from a YAML string.
pub fn load_config_from_str(yaml: &str) -> Result<XappConfig, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Validates a configuration.
///
/// # Validation Rules
///
/// - app id, service model name and A1 policy type must be non-empty
/// - E2T, topology and A1 ports must be non-zero
/// - steering, display and reporting intervals must be non-zero
/// - the default slice needs a 6-digit hex SD, a positive SST and a
///   3-digit MCC with a 2 or 3-digit MNC
pub fn validate_config(config: &XappConfig) -> Result<(), ConfigValidationError> {
    for (name, value) in [
        ("app_id", &config.app_id),
        ("service_model.name", &config.service_model.name),
        ("a1.policy_name", &config.a1.policy_name),
        ("a1.policy_version", &config.a1.policy_version),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigValidationError::MissingValue(name.to_string()));
        }
    }

    for (name, port) in [
        ("e2t", config.e2t.port),
        ("topo", config.topo.port),
        ("a1", config.a1.port),
    ] {
        if port == 0 {
            return Err(ConfigValidationError::InvalidPort(format!(
                "{name} port cannot be 0"
            )));
        }
    }

    for (name, value) in [
        ("steering.interval_ms", config.steering.interval_ms),
        ("display_interval_ms", config.display_interval_ms),
        ("reporting_period_ms", config.reporting_period_ms),
        ("a1.ack_timeout_ms", config.a1.ack_timeout_ms),
    ] {
        if value == 0 {
            return Err(ConfigValidationError::InvalidInterval(format!(
                "{name} cannot be 0"
            )));
        }
    }

    validate_slice(&config.default_slice)
}

fn validate_slice(slice: &SliceConfig) -> Result<(), ConfigValidationError> {
    if slice.sd.len() != 6 || !slice.sd.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigValidationError::InvalidSlice(format!(
            "SD {:?} must be 6 hex digits",
            slice.sd
        )));
    }
    if slice.sst <= 0 {
        return Err(ConfigValidationError::InvalidSlice(format!(
            "SST {} must be positive",
            slice.sst
        )));
    }
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if slice.mcc.len() != 3 || !digits(&slice.mcc) {
        return Err(ConfigValidationError::InvalidSlice(format!(
            "MCC {:?} must be 3 digits",
            slice.mcc
        )));
    }
    if !(2..=3).contains(&slice.mnc.len()) || !digits(&slice.mnc) {
        return Err(ConfigValidationError::InvalidSlice(format!(
            "MNC {:?} must be 2 or 3 digits",
            slice.mnc
        )));
    }
    Ok(())
}

/// Loads and validates a configuration in one step.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<XappConfig, ConfigError> {
    let config = load_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&XappConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_app_id() {
        let mut config = XappConfig::default();
        config.app_id = " ".to_string();
        assert_eq!(
            validate_config(&config),
            Err(ConfigValidationError::MissingValue("app_id".to_string()))
        );
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = XappConfig::default();
        config.a1.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = XappConfig::default();
        config.steering.interval_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_validate_bad_slice() {
        let mut config = XappConfig::default();
        config.default_slice.sd = "XYZ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidSlice(_))
        ));

        let mut config = XappConfig::default();
        config.default_slice.sst = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidSlice(_))
        ));

        let mut config = XappConfig::default();
        config.default_slice.mnc = "4".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidSlice(_))
        ));
    }

    #[test]
    fn test_load_from_str() {
        let config = load_config_from_str(
            "app_id: ts-lab\nsteering:\n  interval_ms: 250\n  start_delay_ms: 0\n",
        )
        .unwrap();
        assert_eq!(config.app_id, "ts-lab");
        assert_eq!(config.steering.interval_ms, 250);
        assert_eq!(config.display_interval_ms, 15000);
    }

    #[test]
    fn test_load_invalid_yaml() {
        assert!(matches!(
            load_config_from_str("steering: [1, 2"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/tsxapp.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
