//! Core data models for the scheduling integrity engine.
//!
//! This module contains all the domain models used throughout the engine.

mod membership;
mod report;
mod schedule;
mod time_entry;

pub use membership::{Actor, Membership, MembershipStatus, Role, User};
pub use report::{
    EmployeeTotals, PeriodMonth, ReportDaily, ReportMonthly, ReportTotals, ReportWeekly,
    Signature, SignatureLog, SignatureLogEntry, TotalsSummary,
};
pub use schedule::{AssignedShift, AssignmentStatus, ScheduleCategory, Shift, ShiftAssignment};
pub use time_entry::{EntrySource, EntryStatus, TimeEntry, TimeEntryPatch, WorkSpan};
