//! Persistence ports.
//!
//! Each component receives the store it reads and writes as an injected
//! trait object. Implementations must enforce the uniqueness constraints
//! documented on each method at the storage level, not only by a prior
//! existence check, so concurrent callers cannot both succeed.

mod memory;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::calculation::Interval;
use crate::error::EngineResult;
use crate::models::{
    AssignedShift, Membership, PeriodMonth, ReportDaily, ReportMonthly, ReportWeekly,
    ScheduleCategory, Shift, ShiftAssignment, TimeEntry, User,
};

pub use memory::MemoryStore;

/// Read access to restaurants, memberships and users.
pub trait MembershipStore: Send + Sync {
    /// True when the restaurant is known.
    fn restaurant_exists(&self, restaurant_id: Uuid) -> EngineResult<bool>;

    /// Looks up a membership.
    fn membership(&self, id: Uuid) -> EngineResult<Option<Membership>>;

    /// Every membership of a restaurant, whatever its status.
    fn memberships_for_restaurant(&self, restaurant_id: Uuid) -> EngineResult<Vec<Membership>>;

    /// Looks up a user.
    fn user(&self, id: Uuid) -> EngineResult<Option<User>>;
}

/// Schedule categories, shifts and assignments.
pub trait ShiftStore: Send + Sync {
    /// Looks up a schedule category.
    fn category(&self, id: Uuid) -> EngineResult<Option<ScheduleCategory>>;

    /// Looks up a shift.
    fn shift(&self, id: Uuid) -> EngineResult<Option<Shift>>;

    /// Inserts a new shift.
    fn insert_shift(&self, shift: Shift) -> EngineResult<Shift>;

    /// Replaces an existing shift.
    fn update_shift(&self, shift: Shift) -> EngineResult<Shift>;

    /// Every assignment of a membership across all categories, joined with
    /// its shift and category name.
    fn assignments_for_membership(&self, membership_id: Uuid) -> EngineResult<Vec<AssignedShift>>;

    /// Every assignment on a shift.
    fn assignments_for_shift(&self, shift_id: Uuid) -> EngineResult<Vec<ShiftAssignment>>;

    /// Looks up an assignment.
    fn assignment(&self, id: Uuid) -> EngineResult<Option<ShiftAssignment>>;

    /// Inserts an assignment.
    fn insert_assignment(&self, assignment: ShiftAssignment) -> EngineResult<ShiftAssignment>;

    /// Replaces an existing assignment.
    fn update_assignment(&self, assignment: ShiftAssignment) -> EngineResult<ShiftAssignment>;

    /// Runs `f` while holding the scheduling locks of the given memberships.
    ///
    /// An overlap check and the assignment write it guards must both run
    /// inside `f`, so two bookings for the same worker cannot interleave.
    fn with_membership_locks(
        &self,
        membership_ids: &[Uuid],
        f: &mut MembershipLockFn<'_>,
    ) -> EngineResult<()>;
}

/// Callback run while a set of memberships is locked for scheduling.
pub type MembershipLockFn<'a> = dyn FnMut() -> EngineResult<()> + 'a;

/// Time entries.
pub trait TimeEntryStore: Send + Sync {
    /// Inserts an open entry. Atomically fails with
    /// [`ConflictDetail::OpenEntry`](crate::error::ConflictDetail::OpenEntry)
    /// when the membership already has an open entry on the same schedule.
    fn insert_open(&self, entry: TimeEntry) -> EngineResult<TimeEntry>;

    /// Looks up an entry.
    fn entry(&self, id: Uuid) -> EngineResult<Option<TimeEntry>>;

    /// The open entry of a membership on a schedule, if any.
    fn find_open(&self, membership_id: Uuid, schedule_id: Uuid) -> EngineResult<Option<TimeEntry>>;

    /// Replaces an entry if its `version` still matches the stored one, and
    /// returns it with the version bumped. A mismatch fails with
    /// [`ConflictDetail::StaleWrite`](crate::error::ConflictDetail::StaleWrite).
    fn update(&self, entry: TimeEntry) -> EngineResult<TimeEntry>;

    /// Closed entries of the given memberships whose clock-in falls within
    /// `window`.
    fn completed_in_window(
        &self,
        membership_ids: &[Uuid],
        window: Interval,
    ) -> EngineResult<Vec<TimeEntry>>;
}

/// Callback run while a set of report days is locked.
pub type DayLockFn<'a> = dyn FnMut(&[ReportDaily]) -> EngineResult<()> + 'a;

/// Daily, weekly and monthly reports.
pub trait ReportStore: Send + Sync {
    /// Inserts a daily report. Fails with a duplicate-report conflict when
    /// one already exists for `(restaurant_id, date)`.
    fn insert_daily(&self, report: ReportDaily) -> EngineResult<ReportDaily>;

    /// Looks up a daily report.
    fn daily(&self, id: Uuid) -> EngineResult<Option<ReportDaily>>;

    /// The daily report for a restaurant and date.
    fn daily_for_date(&self, restaurant_id: Uuid, date: NaiveDate)
    -> EngineResult<Option<ReportDaily>>;

    /// Replaces a daily report if its version matches; bumps the version.
    fn update_daily(&self, report: ReportDaily) -> EngineResult<ReportDaily>;

    /// Removes a daily report if its version matches.
    fn delete_daily(&self, report: &ReportDaily) -> EngineResult<()>;

    /// Runs `f` while holding the locks of the given days of a restaurant.
    ///
    /// `f` receives the daily reports that exist for those days. Every write
    /// to a daily report goes through this lock, so a signature cannot land
    /// between the moment `f` inspects the reports and the moment it
    /// finishes. Days of other dates stay independent.
    fn with_day_locks(
        &self,
        restaurant_id: Uuid,
        dates: &[NaiveDate],
        f: &mut DayLockFn<'_>,
    ) -> EngineResult<()>;

    /// Inserts a weekly report, unique per `(restaurant_id, week_start)`.
    fn insert_weekly(&self, report: ReportWeekly) -> EngineResult<ReportWeekly>;

    /// The weekly report for a restaurant and week.
    fn weekly_for(&self, restaurant_id: Uuid, week_start: NaiveDate)
    -> EngineResult<Option<ReportWeekly>>;

    /// Removes a weekly report.
    fn delete_weekly(&self, id: Uuid) -> EngineResult<()>;

    /// Inserts a monthly report, unique per `(restaurant_id, period_month)`.
    fn insert_monthly(&self, report: ReportMonthly) -> EngineResult<ReportMonthly>;

    /// The monthly report for a restaurant and month.
    fn monthly_for(
        &self,
        restaurant_id: Uuid,
        period_month: PeriodMonth,
    ) -> EngineResult<Option<ReportMonthly>>;

    /// Removes a monthly report.
    fn delete_monthly(&self, id: Uuid) -> EngineResult<()>;
}
