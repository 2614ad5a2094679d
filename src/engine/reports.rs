//! Report aggregation.
//!
//! Every tier reads completed time entries straight from the store over its
//! own local-time window and aggregates them in one pass. Weekly and monthly
//! totals are never composed from daily rows, so rounding happens once per
//! report.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditRecord, AuditSink, emit};
use crate::calculation::{EmployeeWork, Interval, aggregate_totals};
use crate::clock::Clock;
use crate::config::ConfigLoader;
use crate::error::{ConflictDetail, EngineError, EngineResult};
use crate::models::{
    Actor, EntryStatus, Membership, PeriodMonth, ReportDaily, ReportMonthly, ReportTotals,
    ReportWeekly, SignatureLog, TimeEntry, User,
};
use crate::store::{MembershipStore, ReportStore, TimeEntryStore};

/// The UTC instant at which a local date begins.
///
/// A midnight repeated by a DST fall-back resolves to its first occurrence.
/// A midnight skipped by a spring-forward gap resolves to the first local
/// minute of the date that exists.
pub fn local_day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..24 * 60)
        .find_map(|minute| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minute)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// The half-open UTC window covering local dates `[first, end)`.
pub fn local_window(first: NaiveDate, end: NaiveDate, tz: Tz) -> Interval {
    Interval::new(local_day_start(first, tz), local_day_start(end, tz))
}

/// Computes and stores daily, weekly and monthly reports.
pub struct ReportAggregator {
    memberships: Arc<dyn MembershipStore>,
    entries: Arc<dyn TimeEntryStore>,
    reports: Arc<dyn ReportStore>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: Arc<ConfigLoader>,
}

impl ReportAggregator {
    /// Creates an aggregator.
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        entries: Arc<dyn TimeEntryStore>,
        reports: Arc<dyn ReportStore>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: Arc<ConfigLoader>,
    ) -> Self {
        Self {
            memberships,
            entries,
            reports,
            audit,
            clock,
            config,
        }
    }

    /// Generates the report of one local day. A second request for the same
    /// day is a conflict and leaves the first report untouched.
    pub fn generate_daily(&self, restaurant_id: Uuid, date: NaiveDate, actor: Option<&Actor>) -> EngineResult<ReportDaily> {
        self.ensure_restaurant(restaurant_id)?;
        let window = self.day_window(date)?;

        let mut created: Option<ReportDaily> = None;
        self.reports
            .with_day_locks(restaurant_id, &[date], &mut |existing| {
                if let Some(report) = existing.first() {
                    return Err(EngineError::Conflict(ConflictDetail::DuplicateReport {
                        report_id: report.id,
                        restaurant_id,
                        period: date.to_string(),
                    }));
                }
                let totals = self.totals_for(restaurant_id, window)?;
                let report = self.reports.insert_daily(ReportDaily {
                    id: Uuid::new_v4(),
                    restaurant_id,
                    date,
                    totals,
                    signature: None,
                    signature_log: SignatureLog::default(),
                    generated_at: self.clock.now(),
                    version: 0,
                })?;
                created = Some(report);
                Ok(())
            })
            .inspect_err(|err| self.log_rejection("daily", restaurant_id, &date.to_string(), err))?;

        let report = created.ok_or_else(|| EngineError::Internal {
            message: "day lock callback did not run".to_string(),
        })?;
        info!(
            report_id = %report.id,
            restaurant_id = %restaurant_id,
            date = %date,
            employees = report.totals.summary.total_employees,
            total_hours = %report.totals.summary.total_hours,
            total_amount = %report.totals.summary.total_amount,
            "Daily report generated"
        );
        self.audit(actor, "report_daily", report.id, "generate", &report);
        Ok(report)
    }

    /// Generates the report of the Monday-to-Sunday week starting at
    /// `week_start`, which must be a Monday.
    pub fn generate_weekly(
        &self,
        restaurant_id: Uuid,
        week_start: NaiveDate,
        actor: Option<&Actor>,
    ) -> EngineResult<ReportWeekly> {
        if week_start.weekday() != Weekday::Mon {
            return Err(EngineError::validation(
                "week_start",
                format!("{} is a {}, weeks start on Monday", week_start, week_start.weekday()),
            ));
        }
        self.ensure_restaurant(restaurant_id)?;

        if let Some(existing) = self.reports.weekly_for(restaurant_id, week_start)? {
            let err = EngineError::Conflict(ConflictDetail::DuplicateReport {
                report_id: existing.id,
                restaurant_id,
                period: format!("week {}", week_start),
            });
            self.log_rejection("weekly", restaurant_id, &week_start.to_string(), &err);
            return Err(err);
        }

        let window = local_window(week_start, week_start + Duration::days(7), self.config.timezone());
        let totals = self.totals_for(restaurant_id, window)?;
        let report = self
            .reports
            .insert_weekly(ReportWeekly {
                id: Uuid::new_v4(),
                restaurant_id,
                week_start,
                totals,
                generated_at: self.clock.now(),
            })
            .inspect_err(|err| self.log_rejection("weekly", restaurant_id, &week_start.to_string(), err))?;

        info!(
            report_id = %report.id,
            restaurant_id = %restaurant_id,
            week_start = %week_start,
            employees = report.totals.summary.total_employees,
            total_amount = %report.totals.summary.total_amount,
            "Weekly report generated"
        );
        self.audit(actor, "report_weekly", report.id, "generate", &report);
        Ok(report)
    }

    /// Generates the report of a calendar month.
    pub fn generate_monthly(
        &self,
        restaurant_id: Uuid,
        period_month: PeriodMonth,
        actor: Option<&Actor>,
    ) -> EngineResult<ReportMonthly> {
        self.ensure_restaurant(restaurant_id)?;

        if let Some(existing) = self.reports.monthly_for(restaurant_id, period_month)? {
            let err = EngineError::Conflict(ConflictDetail::DuplicateReport {
                report_id: existing.id,
                restaurant_id,
                period: format!("month {}", period_month),
            });
            self.log_rejection("monthly", restaurant_id, &period_month.to_string(), &err);
            return Err(err);
        }

        let window = local_window(
            period_month.first_day(),
            period_month.next_first_day(),
            self.config.timezone(),
        );
        let totals = self.totals_for(restaurant_id, window)?;
        let report = self
            .reports
            .insert_monthly(ReportMonthly {
                id: Uuid::new_v4(),
                restaurant_id,
                period_month,
                totals,
                generated_at: self.clock.now(),
            })
            .inspect_err(|err| self.log_rejection("monthly", restaurant_id, &period_month.to_string(), err))?;

        info!(
            report_id = %report.id,
            restaurant_id = %restaurant_id,
            period_month = %period_month,
            employees = report.totals.summary.total_employees,
            total_amount = %report.totals.summary.total_amount,
            "Monthly report generated"
        );
        self.audit(actor, "report_monthly", report.id, "generate", &report);
        Ok(report)
    }

    /// The daily report of a restaurant's day.
    pub fn daily_report(&self, restaurant_id: Uuid, date: NaiveDate) -> EngineResult<ReportDaily> {
        self.reports
            .daily_for_date(restaurant_id, date)?
            .ok_or_else(|| EngineError::not_found("Daily report", format!("{} on {}", restaurant_id, date)))
    }

    /// The weekly report of a restaurant's week.
    pub fn weekly_report(&self, restaurant_id: Uuid, week_start: NaiveDate) -> EngineResult<ReportWeekly> {
        self.reports
            .weekly_for(restaurant_id, week_start)?
            .ok_or_else(|| {
                EngineError::not_found("Weekly report", format!("{} week {}", restaurant_id, week_start))
            })
    }

    /// The monthly report of a restaurant's month.
    pub fn monthly_report(&self, restaurant_id: Uuid, period_month: PeriodMonth) -> EngineResult<ReportMonthly> {
        self.reports
            .monthly_for(restaurant_id, period_month)?
            .ok_or_else(|| {
                EngineError::not_found("Monthly report", format!("{} month {}", restaurant_id, period_month))
            })
    }

    /// Removes a weekly report so the week can be generated again.
    pub fn delete_weekly(&self, restaurant_id: Uuid, week_start: NaiveDate, actor: &Actor) -> EngineResult<()> {
        let report = self.weekly_report(restaurant_id, week_start)?;
        self.reports.delete_weekly(report.id)?;
        info!(report_id = %report.id, week_start = %week_start, "Weekly report deleted");
        self.audit_delete(actor, "report_weekly", report.id, &report);
        Ok(())
    }

    /// Removes a monthly report so the month can be generated again.
    pub fn delete_monthly(&self, restaurant_id: Uuid, period_month: PeriodMonth, actor: &Actor) -> EngineResult<()> {
        let report = self.monthly_report(restaurant_id, period_month)?;
        self.reports.delete_monthly(report.id)?;
        info!(report_id = %report.id, period_month = %period_month, "Monthly report deleted");
        self.audit_delete(actor, "report_monthly", report.id, &report);
        Ok(())
    }

    /// Totals of a local day as the entries stand now. Signing compares these
    /// against the stored snapshot.
    pub fn daily_totals(&self, restaurant_id: Uuid, date: NaiveDate) -> EngineResult<ReportTotals> {
        let window = self.day_window(date)?;
        self.totals_for(restaurant_id, window)
    }

    fn day_window(&self, date: NaiveDate) -> EngineResult<Interval> {
        let next_day = date.succ_opt().ok_or_else(|| {
            EngineError::validation("date", format!("date {} is out of range", date))
        })?;
        Ok(local_window(date, next_day, self.config.timezone()))
    }

    /// Totals of every completed entry whose clock-in falls in `window`.
    fn totals_for(&self, restaurant_id: Uuid, window: Interval) -> EngineResult<ReportTotals> {
        let memberships = self.memberships.memberships_for_restaurant(restaurant_id)?;
        let membership_ids: Vec<Uuid> = memberships.iter().map(|m| m.id).collect();
        let include_rejected = self.config.config().reports.include_rejected_entries;

        let entries: Vec<TimeEntry> = self
            .entries
            .completed_in_window(&membership_ids, window)?
            .into_iter()
            .filter(|e| include_rejected || e.status != EntryStatus::Rejected)
            .collect();

        let mut by_membership: HashMap<Uuid, Vec<&TimeEntry>> = HashMap::new();
        for entry in &entries {
            by_membership.entry(entry.membership_id).or_default().push(entry);
        }

        let mut users: HashMap<Uuid, User> = HashMap::new();
        for membership in memberships.iter().filter(|m| by_membership.contains_key(&m.id)) {
            let user = self
                .memberships
                .user(membership.user_id)?
                .ok_or_else(|| EngineError::not_found("User", membership.user_id))?;
            users.insert(user.id, user);
        }

        let work: Vec<EmployeeWork<'_>> = memberships
            .iter()
            .filter_map(|membership: &Membership| {
                let entries = by_membership.remove(&membership.id)?;
                let user = users.get(&membership.user_id)?;
                Some(EmployeeWork {
                    membership,
                    user,
                    entries,
                })
            })
            .collect();

        debug!(
            restaurant_id = %restaurant_id,
            window_start = %window.start,
            window_end = %window.end,
            entries = entries.len(),
            employees = work.len(),
            "Aggregating report"
        );
        Ok(aggregate_totals(&work, self.config.currency()))
    }

    fn ensure_restaurant(&self, restaurant_id: Uuid) -> EngineResult<()> {
        if self.memberships.restaurant_exists(restaurant_id)? {
            Ok(())
        } else {
            Err(EngineError::not_found("Restaurant", restaurant_id))
        }
    }

    fn log_rejection(&self, tier: &str, restaurant_id: Uuid, period: &str, err: &EngineError) {
        warn!(
            tier,
            restaurant_id = %restaurant_id,
            period,
            error = %err,
            "Report generation rejected"
        );
    }

    fn audit<T: serde::Serialize>(
        &self,
        actor: Option<&Actor>,
        entity_type: &'static str,
        entity_id: Uuid,
        action: &'static str,
        report: &T,
    ) {
        emit(
            self.audit.as_ref(),
            AuditRecord::new::<T, T>(
                actor.map(|a| a.user_id),
                entity_type,
                entity_id,
                action,
                None,
                Some(report),
                self.clock.now(),
            ),
        );
    }

    fn audit_delete<T: serde::Serialize>(&self, actor: &Actor, entity_type: &'static str, entity_id: Uuid, report: &T) {
        emit(
            self.audit.as_ref(),
            AuditRecord::new::<T, T>(
                Some(actor.user_id),
                entity_type,
                entity_id,
                "delete",
                Some(report),
                None,
                self.clock.now(),
            ),
        );
    }
}
