//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from a YAML file.

use chrono::Duration;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::EngineConfig;

/// Loads, validates and provides access to the engine configuration.
///
/// # Example
///
/// ```no_run
/// use shift_ledger::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/engine.yaml")?;
/// println!("Reports are in {}", loader.config().reports.currency);
/// # Ok::<(), shift_ledger::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
    timezone: Tz,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            timezone: Tz::UTC,
        }
    }
}

impl ConfigLoader {
    /// Loads configuration from a YAML file.
    ///
    /// Returns an error if the file is missing, is not valid YAML, or holds
    /// out-of-range values.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let config: EngineConfig =
            serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
                path: path_str,
                message: e.to_string(),
            })?;

        Self::from_config(config)
    }

    /// Validates an in-memory configuration.
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let timezone: Tz = config.time.timezone.trim().parse().map_err(|e| {
            EngineError::validation(
                "time.timezone",
                format!("unknown timezone '{}': {}", config.time.timezone, e),
            )
        })?;

        if config.shifts.max_shift_hours == 0 {
            return Err(EngineError::validation(
                "shifts.max_shift_hours",
                "must be at least 1",
            ));
        }

        if config.reports.currency.trim().is_empty() {
            return Err(EngineError::validation(
                "reports.currency",
                "must not be empty",
            ));
        }

        Ok(Self { config, timezone })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The restaurant's local timezone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The longest allowed shift.
    pub fn max_shift_duration(&self) -> Duration {
        Duration::hours(i64::from(self.config.shifts.max_shift_hours))
    }

    /// Currency code for report totals.
    pub fn currency(&self) -> &str {
        &self.config.reports.currency
    }

    /// How many times a stale write is retried.
    pub fn max_write_retries(&self) -> u32 {
        self.config.concurrency.max_write_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_path() -> &'static str {
        "./config/engine.yaml"
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.config().time.timezone, "Europe/Warsaw");
        assert_eq!(loader.timezone(), chrono_tz::Europe::Warsaw);
        assert_eq!(loader.max_shift_duration(), Duration::hours(24));
        assert_eq!(loader.currency(), "PLN");
        assert_eq!(loader.max_write_retries(), 3);
    }

    #[test]
    fn test_defaults() {
        let loader = ConfigLoader::default();
        assert_eq!(loader.timezone(), Tz::UTC);
        assert_eq!(loader.max_shift_duration(), Duration::hours(24));
        assert!(loader.config().reports.include_rejected_entries);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: EngineConfig = serde_yaml::from_str("reports:\n  currency: EUR\n").unwrap();
        let loader = ConfigLoader::from_config(config).unwrap();
        assert_eq!(loader.currency(), "EUR");
        assert_eq!(loader.config().shifts.max_shift_hours, 24);
    }

    #[test]
    fn test_load_missing_file_returns_error() {
        let result = ConfigLoader::load("/nonexistent/engine.yaml");
        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("engine.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let mut config = EngineConfig::default();
        config.time.timezone = "Europe/Atlantis".to_string();
        assert!(matches!(
            ConfigLoader::from_config(config),
            Err(EngineError::Validation { field, .. }) if field == "time.timezone"
        ));
    }

    #[test]
    fn test_zero_max_shift_hours_is_rejected() {
        let mut config = EngineConfig::default();
        config.shifts.max_shift_hours = 0;
        assert!(ConfigLoader::from_config(config).is_err());
    }
}
