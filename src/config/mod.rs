//! Configuration loading and management for the engine.
//!
//! This module loads the engine settings (local timezone, shift limits,
//! report currency, write retry budget) from a YAML file.
//!
//! # Example
//!
//! ```no_run
//! use shift_ledger::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/engine.yaml").unwrap();
//! println!("Local timezone: {}", config.timezone());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{ConcurrencyConfig, EngineConfig, ReportConfig, ShiftConfig, TimeConfig};
