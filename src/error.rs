//! Error types for the scheduling integrity engine.
//!
//! Every operation returns [`EngineError`]. Each variant maps onto one of the
//! five caller-facing kinds in [`ErrorKind`], and carries enough structure
//! (conflicting interval, current state, required precondition) for a caller
//! to render a specific message.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::calculation::Interval;

/// The caller-facing classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any write.
    Validation,
    /// The request collides with an existing resource.
    Conflict,
    /// A referenced entity does not exist.
    NotFound,
    /// The entity is not in a state that permits the operation.
    InvalidState,
    /// Storage or configuration failure.
    Internal,
}

/// The resource a [`EngineError::Conflict`] collided with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDetail {
    /// The worker already has an open entry on this schedule.
    OpenEntry {
        /// The open entry.
        entry_id: Uuid,
        /// The membership that is clocked in.
        membership_id: Uuid,
        /// The schedule the open entry belongs to.
        schedule_id: Uuid,
        /// When the open entry was clocked in.
        clock_in: DateTime<Utc>,
    },
    /// A report already exists for the requested period.
    DuplicateReport {
        /// The existing report.
        report_id: Uuid,
        /// The restaurant the report belongs to.
        restaurant_id: Uuid,
        /// Human-readable period key, e.g. `2026-01-15`, `week 2026-01-12`.
        period: String,
    },
    /// The worker is already assigned to an overlapping shift.
    ShiftOverlap {
        /// The conflicting shift.
        shift_id: Uuid,
        /// The category that owns the conflicting shift.
        category_name: String,
        /// The conflicting shift's interval.
        interval: Interval,
    },
    /// The entity changed between read and write.
    StaleWrite {
        /// The entity type that was written.
        entity: &'static str,
        /// The entity id.
        id: Uuid,
    },
}

impl fmt::Display for ConflictDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictDetail::OpenEntry {
                entry_id,
                schedule_id,
                clock_in,
                ..
            } => write!(
                f,
                "open time entry '{}' on schedule '{}' since {}",
                entry_id, schedule_id, clock_in
            ),
            ConflictDetail::DuplicateReport {
                report_id, period, ..
            } => write!(f, "report '{}' already exists for {}", report_id, period),
            ConflictDetail::ShiftOverlap {
                shift_id,
                category_name,
                interval,
            } => write!(
                f,
                "overlaps shift '{}' in '{}' ({} - {})",
                shift_id, category_name, interval.start, interval.end
            ),
            ConflictDetail::StaleWrite { entity, id } => {
                write!(f, "{} '{}' was modified concurrently", entity, id)
            }
        }
    }
}

/// The main error type for the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input.
    #[error("Invalid field '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The operation collides with an existing resource.
    #[error("Conflict: {0}")]
    Conflict(ConflictDetail),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity type.
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// The entity is in the wrong state for the operation.
    #[error("{entity} '{id}' is {current}, requires {required}")]
    InvalidState {
        /// The entity type.
        entity: &'static str,
        /// The entity id.
        id: Uuid,
        /// The state the entity is currently in.
        current: String,
        /// The state the operation requires.
        required: String,
    },

    /// The day owning the entry is covered by a signed daily report.
    #[error("Period {date} is locked by report '{report_id}' signed by '{signed_by}' at {signed_at}")]
    PeriodLocked {
        /// The locked date.
        date: NaiveDate,
        /// The signed daily report.
        report_id: Uuid,
        /// Who signed it.
        signed_by: Uuid,
        /// When it was signed.
        signed_at: DateTime<Utc>,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Storage failure.
    #[error("Internal error: {message}")]
    Internal {
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the caller-facing kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation { .. } => ErrorKind::Validation,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::InvalidState { .. } | EngineError::PeriodLocked { .. } => {
                ErrorKind::InvalidState
            }
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True for optimistic write conflicts that may be retried.
    pub fn is_stale_write(&self) -> bool {
        matches!(self, EngineError::Conflict(ConflictDetail::StaleWrite { .. }))
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
