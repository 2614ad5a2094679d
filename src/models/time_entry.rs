//! Time entry model.
//!
//! A [`TimeEntry`] is the worked-time record of one membership on one
//! schedule. Whether it is still running is carried by [`WorkSpan`], not by a
//! nullable clock-out.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::calculation::{Interval, duration_minutes};
use crate::error::{EngineError, EngineResult};

/// The clock punches of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkSpan {
    /// Clocked in, not yet out.
    Open {
        /// Clock-in instant.
        clock_in: DateTime<Utc>,
    },
    /// Clocked in and out.
    Closed {
        /// Clock-in instant.
        clock_in: DateTime<Utc>,
        /// Clock-out instant.
        clock_out: DateTime<Utc>,
    },
}

impl WorkSpan {
    /// The clock-in instant.
    pub fn clock_in(&self) -> DateTime<Utc> {
        match *self {
            WorkSpan::Open { clock_in } | WorkSpan::Closed { clock_in, .. } => clock_in,
        }
    }

    /// The clock-out instant, if closed.
    pub fn clock_out(&self) -> Option<DateTime<Utc>> {
        match *self {
            WorkSpan::Open { .. } => None,
            WorkSpan::Closed { clock_out, .. } => Some(clock_out),
        }
    }
}

/// Approval state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Clocked in.
    Active,
    /// Clocked out, awaiting a manager decision.
    Pending,
    /// Approved by a manager.
    Approved,
    /// Rejected by a manager.
    Rejected,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Active => write!(f, "active"),
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Approved => write!(f, "approved"),
            EntryStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// How an entry came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Entered by hand.
    Manual,
    /// Clock-in/clock-out punches.
    Clock,
    /// Force-closed by a manager.
    SystemClosed,
}

/// A worked-time record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Unique identifier.
    pub id: Uuid,
    /// The worker.
    pub membership_id: Uuid,
    /// The schedule (category) worked.
    pub schedule_id: Uuid,
    /// Clock punches.
    pub span: WorkSpan,
    /// Signed manual correction applied after the raw delta.
    #[serde(default)]
    pub adjustment_minutes: i64,
    /// Approval state.
    pub status: EntryStatus,
    /// Provenance.
    pub source: EntrySource,
    /// Free-text reason (correction, rejection or force-close).
    #[serde(default)]
    pub reason: Option<String>,
    /// Approving manager.
    #[serde(default)]
    pub approved_by: Option<Uuid>,
    /// Approval instant.
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, bumped on every store write.
    #[serde(default)]
    pub version: u64,
}

impl TimeEntry {
    /// Starts an active entry.
    pub fn open(membership_id: Uuid, schedule_id: Uuid, clock_in: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            membership_id,
            schedule_id,
            span: WorkSpan::Open { clock_in },
            adjustment_minutes: 0,
            status: EntryStatus::Active,
            source: EntrySource::Clock,
            reason: None,
            approved_by: None,
            approved_at: None,
            version: 0,
        }
    }

    /// The clock-in instant.
    pub fn clock_in(&self) -> DateTime<Utc> {
        self.span.clock_in()
    }

    /// The clock-out instant, if any.
    pub fn clock_out(&self) -> Option<DateTime<Utc>> {
        self.span.clock_out()
    }

    /// True while clocked in.
    pub fn is_open(&self) -> bool {
        matches!(self.span, WorkSpan::Open { .. })
    }

    /// The local date that owns this entry for report locking.
    pub fn owning_date(&self, tz: Tz) -> NaiveDate {
        self.clock_in().with_timezone(&tz).date_naive()
    }

    /// Raw minutes between the punches plus the adjustment, or `None` while
    /// open. Computed from UTC instants, so DST shifts in local time change
    /// the result the way the wall clock did. Saturates at the `i64` bounds;
    /// [`Self::check_duration`] rejects such entries before they are stored.
    pub fn effective_minutes(&self) -> Option<i64> {
        let clock_out = self.clock_out()?;
        let raw = duration_minutes(&Interval::new(self.clock_in(), clock_out));
        Some(raw.saturating_add(self.adjustment_minutes))
    }

    /// Rejects a closed entry whose adjusted duration is negative or does not
    /// fit in an `i64`. Open entries always pass.
    pub fn check_duration(&self) -> EngineResult<()> {
        let Some(clock_out) = self.clock_out() else {
            return Ok(());
        };
        let raw = duration_minutes(&Interval::new(self.clock_in(), clock_out));
        match raw.checked_add(self.adjustment_minutes) {
            None => Err(EngineError::validation(
                "adjustment_minutes",
                format!(
                    "adjustment of {} minutes overflows the worked duration",
                    self.adjustment_minutes
                ),
            )),
            Some(minutes) if minutes < 0 => Err(EngineError::validation(
                "adjustment_minutes",
                format!(
                    "adjustment of {} minutes would make the worked duration negative",
                    self.adjustment_minutes
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// [`Self::effective_minutes`] floored at zero, or zero while open.
    pub fn worked_minutes(&self) -> i64 {
        self.effective_minutes().unwrap_or(0).max(0)
    }
}

/// A correction to an entry. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntryPatch {
    /// New adjustment in minutes.
    #[serde(default)]
    pub adjustment_minutes: Option<i64>,
    /// New reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Corrected clock-in.
    #[serde(default)]
    pub clock_in: Option<DateTime<Utc>>,
    /// Corrected clock-out. Only allowed on closed entries.
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
}

impl TimeEntryPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.adjustment_minutes.is_none()
            && self.reason.is_none()
            && self.clock_in.is_none()
            && self.clock_out.is_none()
    }

    /// Applies the patch to a copy of `entry`, rejecting results that are
    /// malformed or would drive the effective duration below zero. The
    /// adjustment of an active entry is checked again when it closes.
    pub fn apply_to(&self, entry: &TimeEntry) -> EngineResult<TimeEntry> {
        if self.is_empty() {
            return Err(EngineError::validation("patch", "no fields to update"));
        }

        let mut updated = entry.clone();
        let clock_in = self.clock_in.unwrap_or_else(|| entry.clock_in());

        updated.span = match (entry.span, self.clock_out) {
            (WorkSpan::Open { .. }, Some(_)) => {
                return Err(EngineError::validation(
                    "clock_out",
                    "cannot set clock-out on an active entry; clock out or force-close it",
                ));
            }
            (WorkSpan::Open { .. }, None) => WorkSpan::Open { clock_in },
            (WorkSpan::Closed { clock_out, .. }, patched) => WorkSpan::Closed {
                clock_in,
                clock_out: patched.unwrap_or(clock_out),
            },
        };

        if let Some(clock_out) = updated.clock_out() {
            if clock_out <= clock_in {
                return Err(EngineError::validation(
                    "clock_out",
                    "clock-out must be after clock-in",
                ));
            }
        }

        if let Some(adjustment) = self.adjustment_minutes {
            updated.adjustment_minutes = adjustment;
        }
        if let Some(reason) = &self.reason {
            updated.reason = Some(reason.clone());
        }

        updated.check_duration()?;
        Ok(updated)
    }
}
