//! Time entry lifecycle.
//!
//! ```text
//! clock in ──> active ──clock out / force close──> pending ──> approved
//!                                                         └──> rejected
//! ```
//!
//! Clock-in and clock-out concern today and are never gated. Every other
//! mutation first asks the [`ReportSigningLedger`] whether the entry's day is
//! frozen, and performs the write while holding that day's lock.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ledger::ReportSigningLedger;
use crate::audit::{AuditRecord, AuditSink, emit};
use crate::calculation::{Interval, RateSource, duration_minutes, earnings, resolve_rate, round_money};
use crate::clock::Clock;
use crate::config::ConfigLoader;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Actor, EntrySource, EntryStatus, Membership, TimeEntry, TimeEntryPatch, WorkSpan,
};
use crate::store::{MembershipStore, ShiftStore, TimeEntryStore};

/// Earnings of a single entry at its effective rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarningsPreview {
    /// The entry.
    pub entry_id: Uuid,
    /// Effective minutes; for an active entry, elapsed until now.
    pub minutes: i64,
    /// Effective hourly rate.
    pub rate: Decimal,
    /// Where the rate came from.
    pub rate_source: RateSource,
    /// Earnings, rounded to 2 decimal places.
    pub amount: Decimal,
}

/// Drives time entries through their states.
pub struct TimeEntryLifecycle {
    entries: Arc<dyn TimeEntryStore>,
    memberships: Arc<dyn MembershipStore>,
    shifts: Arc<dyn ShiftStore>,
    ledger: Arc<ReportSigningLedger>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: Arc<ConfigLoader>,
}

impl TimeEntryLifecycle {
    /// Creates a lifecycle over its stores and the signing ledger.
    pub fn new(
        entries: Arc<dyn TimeEntryStore>,
        memberships: Arc<dyn MembershipStore>,
        shifts: Arc<dyn ShiftStore>,
        ledger: Arc<ReportSigningLedger>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: Arc<ConfigLoader>,
    ) -> Self {
        Self {
            entries,
            memberships,
            shifts,
            ledger,
            audit,
            clock,
            config,
        }
    }

    /// Looks up an entry.
    pub fn entry(&self, entry_id: Uuid) -> EngineResult<TimeEntry> {
        self.entries
            .entry(entry_id)?
            .ok_or_else(|| EngineError::not_found("Time entry", entry_id))
    }

    /// Opens an entry for an active membership on a schedule of its
    /// restaurant. A second open entry on the same schedule is a conflict.
    pub fn clock_in(&self, membership_id: Uuid, schedule_id: Uuid, actor: &Actor) -> EngineResult<TimeEntry> {
        let membership = self.membership(membership_id)?;
        if !membership.is_active() {
            return Err(EngineError::InvalidState {
                entity: "Membership",
                id: membership.id,
                current: format!("{:?}", membership.status).to_lowercase(),
                required: "active".to_string(),
            });
        }

        let schedule = self
            .shifts
            .category(schedule_id)?
            .ok_or_else(|| EngineError::not_found("Schedule", schedule_id))?;
        if schedule.restaurant_id != membership.restaurant_id {
            return Err(EngineError::validation(
                "schedule_id",
                format!(
                    "schedule '{}' does not belong to the membership's restaurant",
                    schedule_id
                ),
            ));
        }

        let now = self.clock.now();
        let entry = match self
            .entries
            .insert_open(TimeEntry::open(membership_id, schedule_id, now))
        {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    membership_id = %membership_id,
                    schedule_id = %schedule_id,
                    error = %err,
                    "Clock-in rejected"
                );
                return Err(err);
            }
        };

        info!(
            entry_id = %entry.id,
            membership_id = %membership_id,
            schedule_id = %schedule_id,
            clock_in = %now,
            "Clocked in"
        );
        self.audit(actor, "clock_in", None, &entry);
        Ok(entry)
    }

    /// Closes an entry at the current instant. Closing an already closed
    /// entry returns it unchanged. An adjustment made while the entry was
    /// active must still leave a non-negative duration.
    pub fn clock_out(&self, entry_id: Uuid, actor: &Actor) -> EngineResult<TimeEntry> {
        let (before, after) = self.with_retries(|| {
            let entry = self.entry(entry_id)?;
            let WorkSpan::Open { clock_in } = entry.span else {
                return Ok((None, entry));
            };

            let now = self.clock.now();
            if now <= clock_in {
                return Err(EngineError::validation(
                    "clock_out",
                    format!("clock-out {} is not after clock-in {}", now, clock_in),
                ));
            }

            let mut closed = entry.clone();
            closed.span = WorkSpan::Closed {
                clock_in,
                clock_out: now,
            };
            closed.status = EntryStatus::Pending;
            closed.check_duration().inspect_err(|err| {
                warn!(entry_id = %entry.id, error = %err, "Clock-out rejected")
            })?;
            let saved = self.entries.update(closed)?;
            Ok((Some(entry), saved))
        })?;

        match before {
            Some(before) => {
                info!(
                    entry_id = %after.id,
                    membership_id = %after.membership_id,
                    worked_minutes = after.worked_minutes(),
                    "Clocked out"
                );
                self.audit(actor, "clock_out", Some(&before), &after);
            }
            None => debug!(entry_id = %after.id, "Clock-out repeated on closed entry"),
        }
        Ok(after)
    }

    /// Closes the membership's open entry on a schedule.
    pub fn clock_out_open(&self, membership_id: Uuid, schedule_id: Uuid, actor: &Actor) -> EngineResult<TimeEntry> {
        let open = self
            .entries
            .find_open(membership_id, schedule_id)?
            .ok_or_else(|| {
                EngineError::not_found(
                    "Open time entry",
                    format!("membership {} on schedule {}", membership_id, schedule_id),
                )
            })?;
        self.clock_out(open.id, actor)
    }

    /// Closes an active entry on behalf of a worker who never clocked out.
    pub fn force_close(
        &self,
        entry_id: Uuid,
        clock_out: DateTime<Utc>,
        reason: &str,
        actor: &Actor,
    ) -> EngineResult<TimeEntry> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::validation(
                "reason",
                "a reason is required to force-close an entry",
            ));
        }

        let (before, after) = self.with_retries(|| {
            let entry = self.entry(entry_id)?;
            let WorkSpan::Open { clock_in } = entry.span else {
                return Err(EngineError::InvalidState {
                    entity: "Time entry",
                    id: entry.id,
                    current: entry.status.to_string(),
                    required: EntryStatus::Active.to_string(),
                });
            };
            if clock_out <= clock_in {
                return Err(EngineError::validation(
                    "clock_out",
                    "clock-out must be after clock-in",
                ));
            }

            let mut closed = entry.clone();
            closed.span = WorkSpan::Closed {
                clock_in,
                clock_out,
            };
            closed.status = EntryStatus::Pending;
            closed.source = EntrySource::SystemClosed;
            closed.reason = Some(reason.to_string());
            closed.check_duration()?;

            let saved = self.gated_update(&entry, closed)?;
            Ok((entry, saved))
        })?;

        info!(
            entry_id = %after.id,
            membership_id = %after.membership_id,
            forced_by = %actor.user_id,
            reason,
            "Time entry force-closed"
        );
        self.audit(actor, "force_close", Some(&before), &after);
        Ok(after)
    }

    /// Applies a correction while the entry's day is unsigned. Who may edit
    /// is decided by the caller.
    pub fn edit(&self, entry_id: Uuid, patch: &TimeEntryPatch, actor: &Actor) -> EngineResult<TimeEntry> {
        let (before, after) = self.with_retries(|| {
            let entry = self.entry(entry_id)?;
            let updated = patch.apply_to(&entry)?;
            let saved = self.gated_update(&entry, updated)?;
            Ok((entry, saved))
        })?;

        info!(
            entry_id = %after.id,
            edited_by = %actor.user_id,
            adjustment_minutes = after.adjustment_minutes,
            "Time entry edited"
        );
        self.audit(actor, "edit", Some(&before), &after);
        Ok(after)
    }

    /// Approves or rejects a pending entry.
    pub fn approve_or_reject(
        &self,
        entry_id: Uuid,
        approved: bool,
        reason: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<TimeEntry> {
        let (before, after) = self.with_retries(|| {
            let entry = self.entry(entry_id)?;
            if entry.status != EntryStatus::Pending {
                return Err(EngineError::InvalidState {
                    entity: "Time entry",
                    id: entry.id,
                    current: entry.status.to_string(),
                    required: EntryStatus::Pending.to_string(),
                });
            }

            let mut decided = entry.clone();
            if approved {
                decided.status = EntryStatus::Approved;
                decided.approved_by = Some(actor.user_id);
                decided.approved_at = Some(self.clock.now());
            } else {
                decided.status = EntryStatus::Rejected;
            }
            if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
                decided.reason = Some(reason.to_string());
            }

            let saved = self.gated_update(&entry, decided)?;
            Ok((entry, saved))
        })?;

        info!(
            entry_id = %after.id,
            status = %after.status,
            decided_by = %actor.user_id,
            "Time entry decided"
        );
        let action = if approved { "approve" } else { "reject" };
        self.audit(actor, action, Some(&before), &after);
        Ok(after)
    }

    /// Earnings of one entry at its effective rate. An active entry is
    /// measured up to now.
    pub fn earnings_preview(&self, entry_id: Uuid, working_as_manager: bool) -> EngineResult<EarningsPreview> {
        let entry = self.entry(entry_id)?;
        let membership = self.membership(entry.membership_id)?;
        let user = self
            .memberships
            .user(membership.user_id)?
            .ok_or_else(|| EngineError::not_found("User", membership.user_id))?;

        let minutes = match entry.effective_minutes() {
            Some(minutes) => minutes.max(0),
            None => {
                let elapsed = duration_minutes(&Interval::new(entry.clock_in(), self.clock.now()));
                elapsed.saturating_add(entry.adjustment_minutes).max(0)
            }
        };
        let resolution = resolve_rate(
            user.default_rate,
            membership.manager_rate,
            membership.role,
            working_as_manager,
        );

        Ok(EarningsPreview {
            entry_id,
            minutes,
            rate: resolution.rate,
            rate_source: resolution.source,
            amount: round_money(earnings(minutes, resolution.rate)),
        })
    }

    fn membership(&self, membership_id: Uuid) -> EngineResult<Membership> {
        self.memberships
            .membership(membership_id)?
            .ok_or_else(|| EngineError::not_found("Membership", membership_id))
    }

    /// Writes `updated` while the days owning both the stored and the
    /// updated entry are locked and unsigned.
    fn gated_update(&self, current: &TimeEntry, updated: TimeEntry) -> EngineResult<TimeEntry> {
        let membership = self.membership(current.membership_id)?;
        let tz = self.config.timezone();
        let dates: Vec<NaiveDate> = vec![current.owning_date(tz), updated.owning_date(tz)];

        let result = self
            .ledger
            .with_unlocked_days(membership.restaurant_id, &dates, || self.entries.update(updated));

        if let Err(EngineError::PeriodLocked { date, report_id, .. }) = &result {
            warn!(
                entry_id = %current.id,
                date = %date,
                report_id = %report_id,
                "Mutation rejected: period is signed"
            );
        }
        result
    }

    fn with_retries<T>(&self, mut op: impl FnMut() -> EngineResult<T>) -> EngineResult<T> {
        let max_retries = self.config.max_write_retries();
        let mut attempt = 0;
        loop {
            match op() {
                Err(err) if err.is_stale_write() && attempt < max_retries => {
                    attempt += 1;
                    debug!(attempt, error = %err, "Retrying after concurrent write");
                }
                result => return result,
            }
        }
    }

    fn audit(&self, actor: &Actor, action: &'static str, before: Option<&TimeEntry>, after: &TimeEntry) {
        emit(
            self.audit.as_ref(),
            AuditRecord::new(
                Some(actor.user_id),
                "time_entry",
                after.id,
                action,
                before,
                Some(after),
                self.clock.now(),
            ),
        );
    }
}
