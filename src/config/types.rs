//! Configuration types for the engine.
//!
//! These structures are deserialized from a YAML file. Every section and key
//! is optional; missing values take the defaults below.

use serde::Deserialize;

/// Local time settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// IANA name of the restaurant's timezone, e.g. `Europe/Warsaw`. Used to
    /// derive report windows and the date that owns a time entry, following
    /// daylight saving changes.
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

/// Shift validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    /// Longest allowed shift.
    pub max_shift_hours: u32,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self { max_shift_hours: 24 }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Currency code stamped on report totals.
    pub currency: String,
    /// Whether rejected entries count toward totals.
    pub include_rejected_entries: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency: "PLN".to_string(),
            include_rejected_entries: true,
        }
    }
}

/// Optimistic concurrency settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// How many times a write that lost a version race is retried.
    pub max_write_retries: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_write_retries: 3,
        }
    }
}

/// The complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Local time settings.
    pub time: TimeConfig,
    /// Shift validation settings.
    pub shifts: ShiftConfig,
    /// Report generation settings.
    pub reports: ReportConfig,
    /// Optimistic concurrency settings.
    pub concurrency: ConcurrencyConfig,
}
