//! The scheduling integrity engine.
//!
//! [`Engine`] wires the services over a set of injected stores and exposes
//! the operations a calling layer (HTTP handlers, jobs, CLIs) needs.
//! Authorization happens before these calls; every operation receives the
//! already-authenticated [`Actor`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use shift_ledger::audit::TracingAuditSink;
//! use shift_ledger::clock::SystemClock;
//! use shift_ledger::config::ConfigLoader;
//! use shift_ledger::engine::{Engine, Stores};
//! use shift_ledger::store::MemoryStore;
//!
//! let engine = Engine::new(
//!     Stores::from_single(Arc::new(MemoryStore::new())),
//!     Arc::new(TracingAuditSink),
//!     Arc::new(SystemClock),
//!     ConfigLoader::default(),
//! );
//! assert_eq!(engine.config().currency(), "PLN");
//! ```

mod ledger;
mod lifecycle;
mod overlap;
mod reports;
mod schedule;

pub use ledger::ReportSigningLedger;
pub use lifecycle::{EarningsPreview, TimeEntryLifecycle};
pub use overlap::{
    OverlapCheck, OverlapConflict, OverlapReport, ShiftOverlapValidator, validate_no_overlap,
    validate_shift_times,
};
pub use reports::{ReportAggregator, local_day_start, local_window};
pub use schedule::ScheduleService;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::calculation::Interval;
use crate::clock::Clock;
use crate::config::ConfigLoader;
use crate::error::EngineResult;
use crate::models::{
    Actor, AssignedShift, AssignmentStatus, PeriodMonth, ReportDaily, ReportMonthly, ReportWeekly,
    Shift, ShiftAssignment, Signature, SignatureLogEntry, TimeEntry, TimeEntryPatch,
};
use crate::store::{MembershipStore, ReportStore, ShiftStore, TimeEntryStore};

/// The persistence ports the engine runs on.
#[derive(Clone)]
pub struct Stores {
    /// Restaurants, memberships and users.
    pub memberships: Arc<dyn MembershipStore>,
    /// Categories, shifts and assignments.
    pub shifts: Arc<dyn ShiftStore>,
    /// Time entries.
    pub entries: Arc<dyn TimeEntryStore>,
    /// Reports.
    pub reports: Arc<dyn ReportStore>,
}

impl Stores {
    /// Uses one backend for every port.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: MembershipStore + ShiftStore + TimeEntryStore + ReportStore + 'static,
    {
        Self {
            memberships: store.clone(),
            shifts: store.clone(),
            entries: store.clone(),
            reports: store,
        }
    }
}

/// Facade over the scheduling, time entry, report and signing services.
pub struct Engine {
    config: Arc<ConfigLoader>,
    validator: Arc<ShiftOverlapValidator>,
    schedule: ScheduleService,
    lifecycle: TimeEntryLifecycle,
    aggregator: Arc<ReportAggregator>,
    ledger: Arc<ReportSigningLedger>,
}

impl Engine {
    /// Builds the engine.
    pub fn new(stores: Stores, audit: Arc<dyn AuditSink>, clock: Arc<dyn Clock>, config: ConfigLoader) -> Self {
        let config = Arc::new(config);
        let validator = Arc::new(ShiftOverlapValidator::new(stores.shifts.clone()));
        let aggregator = Arc::new(ReportAggregator::new(
            stores.memberships.clone(),
            stores.entries.clone(),
            stores.reports.clone(),
            audit.clone(),
            clock.clone(),
            config.clone(),
        ));
        let ledger = Arc::new(ReportSigningLedger::new(
            stores.reports.clone(),
            aggregator.clone(),
            audit.clone(),
            clock.clone(),
        ));

        let schedule = ScheduleService::new(
            stores.shifts.clone(),
            stores.memberships.clone(),
            validator.clone(),
            audit.clone(),
            clock.clone(),
            config.clone(),
        );
        let lifecycle = TimeEntryLifecycle::new(
            stores.entries,
            stores.memberships,
            stores.shifts,
            ledger.clone(),
            audit,
            clock,
            config.clone(),
        );

        Self {
            config,
            validator,
            schedule,
            lifecycle,
            aggregator,
            ledger,
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    // Scheduling

    /// Earliest shift of the membership that collides with `[start, end)`.
    pub fn check_shift_overlap(
        &self,
        membership_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_shift_id: Option<Uuid>,
    ) -> EngineResult<OverlapCheck> {
        self.validator
            .check_overlap(membership_id, Interval::new(start, end), exclude_shift_id)
    }

    /// Every shift in `existing` that collides with `[start, end)`.
    pub fn find_overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>, existing: &[AssignedShift]) -> OverlapReport {
        validate_no_overlap(&Interval::new(start, end), existing)
    }

    /// Rejects empty, inverted or overlong shift intervals.
    pub fn validate_shift_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> EngineResult<()> {
        self.schedule.validate_shift_times(start, end)
    }

    /// See [`ScheduleService::create_shift`].
    pub fn create_shift(
        &self,
        category_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        role_label: Option<String>,
        actor: &Actor,
    ) -> EngineResult<Shift> {
        self.schedule.create_shift(category_id, start, end, role_label, actor)
    }

    /// See [`ScheduleService::assign_shift`].
    pub fn assign_shift(&self, shift_id: Uuid, membership_id: Uuid, actor: &Actor) -> EngineResult<ShiftAssignment> {
        self.schedule.assign_shift(shift_id, membership_id, actor)
    }

    /// See [`ScheduleService::reschedule_shift`].
    pub fn reschedule_shift(
        &self,
        shift_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actor: &Actor,
    ) -> EngineResult<Shift> {
        self.schedule.reschedule_shift(shift_id, start, end, actor)
    }

    /// See [`ScheduleService::set_assignment_status`].
    pub fn update_assignment_status(
        &self,
        assignment_id: Uuid,
        status: AssignmentStatus,
        actor: &Actor,
    ) -> EngineResult<ShiftAssignment> {
        self.schedule.set_assignment_status(assignment_id, status, actor)
    }

    // Time entries

    /// See [`TimeEntryLifecycle::clock_in`].
    pub fn clock_in(&self, membership_id: Uuid, schedule_id: Uuid, actor: &Actor) -> EngineResult<TimeEntry> {
        self.lifecycle.clock_in(membership_id, schedule_id, actor)
    }

    /// See [`TimeEntryLifecycle::clock_out`].
    pub fn clock_out(&self, entry_id: Uuid, actor: &Actor) -> EngineResult<TimeEntry> {
        self.lifecycle.clock_out(entry_id, actor)
    }

    /// See [`TimeEntryLifecycle::clock_out_open`].
    pub fn clock_out_open(&self, membership_id: Uuid, schedule_id: Uuid, actor: &Actor) -> EngineResult<TimeEntry> {
        self.lifecycle.clock_out_open(membership_id, schedule_id, actor)
    }

    /// See [`TimeEntryLifecycle::edit`].
    pub fn edit_time_entry(&self, entry_id: Uuid, patch: &TimeEntryPatch, actor: &Actor) -> EngineResult<TimeEntry> {
        self.lifecycle.edit(entry_id, patch, actor)
    }

    /// See [`TimeEntryLifecycle::approve_or_reject`].
    pub fn approve_or_reject(
        &self,
        entry_id: Uuid,
        approved: bool,
        reason: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<TimeEntry> {
        self.lifecycle.approve_or_reject(entry_id, approved, reason, actor)
    }

    /// See [`TimeEntryLifecycle::force_close`].
    pub fn force_close(
        &self,
        entry_id: Uuid,
        clock_out: DateTime<Utc>,
        reason: &str,
        actor: &Actor,
    ) -> EngineResult<TimeEntry> {
        self.lifecycle.force_close(entry_id, clock_out, reason, actor)
    }

    /// See [`TimeEntryLifecycle::earnings_preview`].
    pub fn earnings_preview(&self, entry_id: Uuid, working_as_manager: bool) -> EngineResult<EarningsPreview> {
        self.lifecycle.earnings_preview(entry_id, working_as_manager)
    }

    /// Looks up a time entry.
    pub fn time_entry(&self, entry_id: Uuid) -> EngineResult<TimeEntry> {
        self.lifecycle.entry(entry_id)
    }

    // Reports

    /// See [`ReportAggregator::generate_daily`].
    pub fn generate_daily_report(&self, restaurant_id: Uuid, date: NaiveDate, actor: Option<&Actor>) -> EngineResult<ReportDaily> {
        self.aggregator.generate_daily(restaurant_id, date, actor)
    }

    /// See [`ReportAggregator::generate_weekly`].
    pub fn generate_weekly_report(
        &self,
        restaurant_id: Uuid,
        week_start: NaiveDate,
        actor: Option<&Actor>,
    ) -> EngineResult<ReportWeekly> {
        self.aggregator.generate_weekly(restaurant_id, week_start, actor)
    }

    /// See [`ReportAggregator::generate_monthly`].
    pub fn generate_monthly_report(
        &self,
        restaurant_id: Uuid,
        period_month: PeriodMonth,
        actor: Option<&Actor>,
    ) -> EngineResult<ReportMonthly> {
        self.aggregator.generate_monthly(restaurant_id, period_month, actor)
    }

    /// The daily report of a restaurant's day.
    pub fn daily_report(&self, restaurant_id: Uuid, date: NaiveDate) -> EngineResult<ReportDaily> {
        self.aggregator.daily_report(restaurant_id, date)
    }

    /// The weekly report of a restaurant's week.
    pub fn weekly_report(&self, restaurant_id: Uuid, week_start: NaiveDate) -> EngineResult<ReportWeekly> {
        self.aggregator.weekly_report(restaurant_id, week_start)
    }

    /// The monthly report of a restaurant's month.
    pub fn monthly_report(&self, restaurant_id: Uuid, period_month: PeriodMonth) -> EngineResult<ReportMonthly> {
        self.aggregator.monthly_report(restaurant_id, period_month)
    }

    /// See [`ReportSigningLedger::delete`].
    pub fn delete_daily_report(&self, report_id: Uuid, actor: &Actor) -> EngineResult<()> {
        self.ledger.delete(report_id, actor)
    }

    /// See [`ReportAggregator::delete_weekly`].
    pub fn delete_weekly_report(&self, restaurant_id: Uuid, week_start: NaiveDate, actor: &Actor) -> EngineResult<()> {
        self.aggregator.delete_weekly(restaurant_id, week_start, actor)
    }

    /// See [`ReportAggregator::delete_monthly`].
    pub fn delete_monthly_report(
        &self,
        restaurant_id: Uuid,
        period_month: PeriodMonth,
        actor: &Actor,
    ) -> EngineResult<()> {
        self.aggregator.delete_monthly(restaurant_id, period_month, actor)
    }

    // Signing

    /// See [`ReportSigningLedger::sign`].
    pub fn sign_report(&self, report_id: Uuid, actor: &Actor) -> EngineResult<ReportDaily> {
        self.ledger.sign(report_id, actor)
    }

    /// See [`ReportSigningLedger::unsign`].
    pub fn unsign_report(&self, report_id: Uuid, actor: &Actor, reason: &str) -> EngineResult<ReportDaily> {
        self.ledger.unsign(report_id, actor, reason)
    }

    /// The signature freezing a restaurant's day, if any.
    pub fn signature_for(&self, restaurant_id: Uuid, date: NaiveDate) -> EngineResult<Option<Signature>> {
        self.ledger.signature_for(restaurant_id, date)
    }

    /// The signature log of a daily report, oldest first.
    pub fn signature_log(&self, report_id: Uuid) -> EngineResult<Vec<SignatureLogEntry>> {
        self.ledger.signature_log(report_id)
    }
}
