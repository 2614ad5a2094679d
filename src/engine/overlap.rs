//! Shift overlap validation.
//!
//! A worker cannot be double-booked across schedule categories. Both entry
//! points here compare intervals with [`overlaps`] only; nothing else in the
//! crate re-implements the predicate.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::calculation::{Interval, duration_minutes, intersection, overlaps};
use crate::error::{ConflictDetail, EngineError, EngineResult};
use crate::models::AssignedShift;
use crate::store::ShiftStore;

/// A shift the candidate interval collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapConflict {
    /// The conflicting shift.
    pub shift_id: Uuid,
    /// Its category name.
    pub category_name: String,
    /// Its interval.
    pub interval: Interval,
    /// Minutes shared with the candidate.
    pub overlap_minutes: i64,
}

impl From<OverlapConflict> for EngineError {
    fn from(conflict: OverlapConflict) -> Self {
        EngineError::Conflict(ConflictDetail::ShiftOverlap {
            shift_id: conflict.shift_id,
            category_name: conflict.category_name,
            interval: conflict.interval,
        })
    }
}

/// Result of a first-conflict check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapCheck {
    /// True when a conflict was found.
    pub has_overlap: bool,
    /// The earliest conflicting shift.
    pub conflict: Option<OverlapConflict>,
}

/// Result of an all-conflicts check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapReport {
    /// True when at least one conflict was found.
    pub has_overlap: bool,
    /// Every conflict, in input order.
    pub conflicts: Vec<OverlapConflict>,
}

/// Rejects intervals that are empty, inverted or longer than `max_length`.
pub fn validate_shift_times(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_length: Duration,
) -> EngineResult<()> {
    if start >= end {
        return Err(EngineError::validation(
            "end",
            format!("shift end {} must be after start {}", end, start),
        ));
    }
    if end - start > max_length {
        return Err(EngineError::validation(
            "end",
            format!(
                "shift of {} minutes exceeds the {} hour maximum",
                (end - start).num_minutes(),
                max_length.num_hours()
            ),
        ));
    }
    Ok(())
}

/// Compares a candidate against a materialized set of assigned shifts and
/// returns every conflict in input order. Declined assignments never
/// conflict.
pub fn validate_no_overlap(candidate: &Interval, existing: &[AssignedShift]) -> OverlapReport {
    let conflicts: Vec<OverlapConflict> = existing
        .iter()
        .filter(|assigned| assigned.status.blocks_time())
        .filter_map(|assigned| {
            let interval = assigned.shift.interval();
            if !overlaps(candidate, &interval) {
                return None;
            }
            let overlap_minutes = intersection(candidate, &interval)
                .map(|shared| duration_minutes(&shared))
                .unwrap_or(0);
            Some(OverlapConflict {
                shift_id: assigned.shift.id,
                category_name: assigned.category_name.clone(),
                interval,
                overlap_minutes,
            })
        })
        .collect();

    OverlapReport {
        has_overlap: !conflicts.is_empty(),
        conflicts,
    }
}

/// Checks a worker's existing assignments for conflicts with a candidate.
pub struct ShiftOverlapValidator {
    shifts: Arc<dyn ShiftStore>,
}

impl ShiftOverlapValidator {
    /// Creates a validator over a shift store.
    pub fn new(shifts: Arc<dyn ShiftStore>) -> Self {
        Self { shifts }
    }

    /// Returns the earliest conflicting shift across all of the membership's
    /// categories. Ties on start are broken by shift id. A shift is excluded
    /// only by id, so two distinct shifts with identical times still collide.
    pub fn check_overlap(
        &self,
        membership_id: Uuid,
        candidate: Interval,
        exclude_shift_id: Option<Uuid>,
    ) -> EngineResult<OverlapCheck> {
        let mut existing: Vec<AssignedShift> = self
            .shifts
            .assignments_for_membership(membership_id)?
            .into_iter()
            .filter(|assigned| Some(assigned.shift.id) != exclude_shift_id)
            .collect();
        existing.sort_by(|a, b| {
            a.shift
                .start
                .cmp(&b.shift.start)
                .then_with(|| a.shift.id.cmp(&b.shift.id))
        });

        let conflict = validate_no_overlap(&candidate, &existing)
            .conflicts
            .into_iter()
            .next();

        debug!(
            membership_id = %membership_id,
            candidate_start = %candidate.start,
            candidate_end = %candidate.end,
            compared = existing.len(),
            has_overlap = conflict.is_some(),
            "Checked shift overlap"
        );

        Ok(OverlapCheck {
            has_overlap: conflict.is_some(),
            conflict,
        })
    }

    /// Like [`Self::check_overlap`], but turns a conflict into an error.
    pub fn ensure_no_overlap(
        &self,
        membership_id: Uuid,
        candidate: Interval,
        exclude_shift_id: Option<Uuid>,
    ) -> EngineResult<()> {
        match self
            .check_overlap(membership_id, candidate, exclude_shift_id)?
            .conflict
        {
            Some(conflict) => Err(conflict.into()),
            None => Ok(()),
        }
    }
}
