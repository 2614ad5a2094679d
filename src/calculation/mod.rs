//! Pure calculation logic for the scheduling integrity engine.
//!
//! This module contains half-open interval arithmetic used by every overlap
//! check, effective hourly rate resolution, and the aggregation of completed
//! time entries into report totals.

mod interval;
mod rate;
mod totals;

pub use interval::{Interval, duration_minutes, intersection, overlaps};
pub use rate::{RateResolution, RateSource, resolve_rate};
pub use totals::{
    EmployeeWork, MONEY_SCALE, aggregate_totals, earnings, minutes_to_hours, round_money, row_for,
};
