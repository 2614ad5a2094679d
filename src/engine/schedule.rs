//! Shift scheduling.
//!
//! Creating, moving and staffing shifts. Every path that can put a worker on
//! a shift goes through [`ShiftOverlapValidator`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::overlap::{ShiftOverlapValidator, validate_shift_times};
use crate::audit::{AuditRecord, AuditSink, emit};
use crate::calculation::Interval;
use crate::clock::Clock;
use crate::config::ConfigLoader;
use crate::error::{EngineError, EngineResult};
use crate::models::{Actor, AssignmentStatus, Membership, ScheduleCategory, Shift, ShiftAssignment};
use crate::store::{MembershipStore, ShiftStore};

/// Creates shifts and binds memberships to them.
pub struct ScheduleService {
    shifts: Arc<dyn ShiftStore>,
    memberships: Arc<dyn MembershipStore>,
    validator: Arc<ShiftOverlapValidator>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: Arc<ConfigLoader>,
}

impl ScheduleService {
    /// Creates a scheduling service.
    pub fn new(
        shifts: Arc<dyn ShiftStore>,
        memberships: Arc<dyn MembershipStore>,
        validator: Arc<ShiftOverlapValidator>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: Arc<ConfigLoader>,
    ) -> Self {
        Self {
            shifts,
            memberships,
            validator,
            audit,
            clock,
            config,
        }
    }

    /// Rejects malformed shift intervals using the configured maximum length.
    pub fn validate_shift_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> EngineResult<()> {
        validate_shift_times(start, end, self.config.max_shift_duration())
    }

    /// Adds a shift to a schedule category.
    pub fn create_shift(
        &self,
        category_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        role_label: Option<String>,
        actor: &Actor,
    ) -> EngineResult<Shift> {
        self.validate_shift_times(start, end)?;
        let category = self.category(category_id)?;

        let shift = self.shifts.insert_shift(Shift {
            id: Uuid::new_v4(),
            category_id: category.id,
            start,
            end,
            role_label,
        })?;

        info!(
            shift_id = %shift.id,
            category = %category.name,
            start = %shift.start,
            end = %shift.end,
            "Shift created"
        );
        self.audit(actor, "shift", shift.id, "create", None::<&Shift>, &shift);
        Ok(shift)
    }

    /// Binds a membership of the shift's restaurant to a shift, unless the
    /// worker is already booked for an overlapping shift in any category.
    pub fn assign_shift(&self, shift_id: Uuid, membership_id: Uuid, actor: &Actor) -> EngineResult<ShiftAssignment> {
        let shift = self.shift(shift_id)?;
        let category = self.category(shift.category_id)?;
        let membership = self.membership(membership_id)?;
        if membership.restaurant_id != category.restaurant_id {
            return Err(EngineError::validation(
                "membership_id",
                format!(
                    "membership '{}' does not belong to the shift's restaurant",
                    membership_id
                ),
            ));
        }

        let assignment = self.with_booking_locks(&[membership_id], || {
            if let Err(err) = self.validator.ensure_no_overlap(membership_id, shift.interval(), None) {
                warn!(
                    shift_id = %shift_id,
                    membership_id = %membership_id,
                    error = %err,
                    "Shift assignment rejected"
                );
                return Err(err);
            }

            self.shifts.insert_assignment(ShiftAssignment {
                id: Uuid::new_v4(),
                shift_id,
                membership_id,
                status: AssignmentStatus::Assigned,
            })
        })?;

        info!(
            assignment_id = %assignment.id,
            shift_id = %shift_id,
            membership_id = %membership_id,
            "Shift assigned"
        );
        self.audit(
            actor,
            "shift_assignment",
            assignment.id,
            "assign",
            None::<&ShiftAssignment>,
            &assignment,
        );
        Ok(assignment)
    }

    /// Moves a shift. Every worker still on the shift is re-checked against
    /// their other shifts; the shift itself is excluded by id.
    pub fn reschedule_shift(
        &self,
        shift_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actor: &Actor,
    ) -> EngineResult<Shift> {
        self.validate_shift_times(start, end)?;
        let current = self.shift(shift_id)?;
        let candidate = Interval::new(start, end);

        let assignees: Vec<Uuid> = self
            .shifts
            .assignments_for_shift(shift_id)?
            .into_iter()
            .filter(|a| a.status.blocks_time())
            .map(|a| a.membership_id)
            .collect();

        let moved = self.with_booking_locks(&assignees, || {
            for membership_id in &assignees {
                self.validator
                    .ensure_no_overlap(*membership_id, candidate, Some(shift_id))
                    .inspect_err(|err| {
                        warn!(
                            shift_id = %shift_id,
                            membership_id = %membership_id,
                            error = %err,
                            "Shift reschedule rejected"
                        )
                    })?;
            }

            let mut moved = current.clone();
            moved.start = start;
            moved.end = end;
            self.shifts.update_shift(moved)
        })?;

        info!(
            shift_id = %shift_id,
            start = %moved.start,
            end = %moved.end,
            "Shift rescheduled"
        );
        self.audit(actor, "shift", shift_id, "reschedule", Some(&current), &moved);
        Ok(moved)
    }

    /// Changes an assignment's status. Taking back a declined shift is
    /// overlap-checked like a new assignment.
    pub fn set_assignment_status(
        &self,
        assignment_id: Uuid,
        status: AssignmentStatus,
        actor: &Actor,
    ) -> EngineResult<ShiftAssignment> {
        let membership_id = self.assignment(assignment_id)?.membership_id;

        let (current, updated) = self.with_booking_locks(&[membership_id], || {
            let current = self.assignment(assignment_id)?;
            if current.status == status {
                return Ok((current.clone(), current));
            }

            if status.blocks_time() && !current.status.blocks_time() {
                let shift = self.shift(current.shift_id)?;
                self.validator
                    .ensure_no_overlap(current.membership_id, shift.interval(), Some(shift.id))?;
            }

            let mut updated = current.clone();
            updated.status = status;
            let updated = self.shifts.update_assignment(updated)?;
            Ok((current, updated))
        })?;
        if current == updated {
            return Ok(updated);
        }

        info!(
            assignment_id = %assignment_id,
            from = ?current.status,
            to = ?updated.status,
            "Shift assignment status changed"
        );
        self.audit(
            actor,
            "shift_assignment",
            assignment_id,
            "set_status",
            Some(&current),
            &updated,
        );
        Ok(updated)
    }

    /// Runs `op` while bookings of the given memberships are serialized.
    fn with_booking_locks<T>(
        &self,
        membership_ids: &[Uuid],
        op: impl FnOnce() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut op = Some(op);
        let mut output: Option<T> = None;

        self.shifts.with_membership_locks(membership_ids, &mut || {
            let op = op.take().ok_or_else(|| EngineError::Internal {
                message: "membership lock callback invoked twice".to_string(),
            })?;
            output = Some(op()?);
            Ok(())
        })?;

        output.ok_or_else(|| EngineError::Internal {
            message: "membership lock callback did not run".to_string(),
        })
    }

    fn assignment(&self, assignment_id: Uuid) -> EngineResult<ShiftAssignment> {
        self.shifts
            .assignment(assignment_id)?
            .ok_or_else(|| EngineError::not_found("Shift assignment", assignment_id))
    }

    fn category(&self, category_id: Uuid) -> EngineResult<ScheduleCategory> {
        self.shifts
            .category(category_id)?
            .ok_or_else(|| EngineError::not_found("Schedule", category_id))
    }

    fn shift(&self, shift_id: Uuid) -> EngineResult<Shift> {
        self.shifts
            .shift(shift_id)?
            .ok_or_else(|| EngineError::not_found("Shift", shift_id))
    }

    fn membership(&self, membership_id: Uuid) -> EngineResult<Membership> {
        self.memberships
            .membership(membership_id)?
            .ok_or_else(|| EngineError::not_found("Membership", membership_id))
    }

    fn audit<T: Serialize>(
        &self,
        actor: &Actor,
        entity_type: &'static str,
        entity_id: Uuid,
        action: &'static str,
        before: Option<&T>,
        after: &T,
    ) {
        emit(
            self.audit.as_ref(),
            AuditRecord::new(
                Some(actor.user_id),
                entity_type,
                entity_id,
                action,
                before,
                Some(after),
                self.clock.now(),
            ),
        );
    }
}
