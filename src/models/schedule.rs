//! Schedule categories, shifts and shift assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::Interval;

/// A named bucket of shifts for a restaurant, e.g. "Kitchen".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCategory {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning restaurant.
    pub restaurant_id: Uuid,
    /// Display name.
    pub name: String,
}

/// A scheduled interval `[start, end)` within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning category.
    pub category_id: Uuid,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    /// Optional role label, e.g. "line cook".
    #[serde(default)]
    pub role_label: Option<String>,
}

impl Shift {
    /// The shift as a half-open interval.
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Status of a membership's assignment to a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Scheduled to work.
    Assigned,
    /// Worked.
    Completed,
    /// Declined by the worker; never conflicts.
    Declined,
}

impl AssignmentStatus {
    /// True when the assignment occupies the worker's time.
    pub fn blocks_time(self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::Completed)
    }
}

/// The binding of a membership to a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    /// Unique identifier.
    pub id: Uuid,
    /// The shift.
    pub shift_id: Uuid,
    /// The assigned membership.
    pub membership_id: Uuid,
    /// Assignment status.
    pub status: AssignmentStatus,
}

/// A shift joined with its category name, as loaded for overlap checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedShift {
    /// The shift.
    pub shift: Shift,
    /// Name of the owning category.
    pub category_name: String,
    /// Status of the membership's assignment.
    pub status: AssignmentStatus,
}
