//! Report totals aggregation.
//!
//! Hours and amounts are carried unrounded through every sum. Rounding to two
//! decimal places happens once, when a value is written into a report row or
//! the summary.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use super::rate::resolve_rate;
use crate::models::{EmployeeTotals, Membership, ReportTotals, TimeEntry, TotalsSummary, User};

/// Scale of every materialized hour and money value.
pub const MONEY_SCALE: u32 = 2;

/// The completed work of one membership within a report window.
#[derive(Debug, Clone)]
pub struct EmployeeWork<'a> {
    /// The membership.
    pub membership: &'a Membership,
    /// The person behind it.
    pub user: &'a User,
    /// Completed entries whose clock-in falls inside the window.
    pub entries: Vec<&'a TimeEntry>,
}

/// Rounds a value for presentation, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Unrounded hours for a number of minutes.
pub fn minutes_to_hours(minutes: i64) -> Decimal {
    Decimal::from(minutes) / Decimal::from(60)
}

/// Unrounded earnings for a number of minutes at an hourly rate. Saturates
/// at the `Decimal` range instead of overflowing.
pub fn earnings(minutes: i64, rate: Decimal) -> Decimal {
    Decimal::from(minutes).saturating_mul(rate) / Decimal::from(60)
}

/// Aggregates per-employee work into report totals.
///
/// The rate for a row is the manager-tier rate when the membership holds the
/// manager or owner role and has one, otherwise the user's default rate.
/// Memberships without completed entries produce no row.
pub fn aggregate_totals(work: &[EmployeeWork<'_>], currency: &str) -> ReportTotals {
    let mut rows: Vec<(EmployeeTotals, Decimal, Decimal)> = work
        .iter()
        .filter_map(|w| {
            let completed: Vec<&TimeEntry> =
                w.entries.iter().copied().filter(|e| !e.is_open()).collect();
            if completed.is_empty() {
                return None;
            }

            let minutes = completed
                .iter()
                .fold(0i64, |sum, e| sum.saturating_add(e.worked_minutes()));
            let resolution = resolve_rate(
                w.user.default_rate,
                w.membership.manager_rate,
                w.membership.role,
                w.membership.role.holds_manager_tier(),
            );
            let hours = minutes_to_hours(minutes);
            let amount = earnings(minutes, resolution.rate);

            let row = EmployeeTotals {
                membership_id: w.membership.id,
                user_id: w.user.id,
                display_name: w.user.display_name.clone(),
                role: w.membership.role,
                entry_count: completed.len(),
                total_minutes: minutes,
                total_hours: round_money(hours),
                rate: resolution.rate,
                total_amount: round_money(amount),
            };
            Some((row, hours, amount))
        })
        .collect();

    rows.sort_by(|a, b| {
        a.0.display_name
            .cmp(&b.0.display_name)
            .then_with(|| a.0.membership_id.cmp(&b.0.membership_id))
    });

    let total_hours = rows
        .iter()
        .fold(Decimal::ZERO, |sum, (_, hours, _)| sum.saturating_add(*hours));
    let total_amount = rows
        .iter()
        .fold(Decimal::ZERO, |sum, (_, _, amount)| sum.saturating_add(*amount));

    let employees: Vec<EmployeeTotals> = rows.into_iter().map(|(row, _, _)| row).collect();

    ReportTotals {
        summary: TotalsSummary {
            total_employees: employees.len(),
            total_hours: round_money(total_hours),
            total_amount: round_money(total_amount),
            currency: currency.to_string(),
        },
        employees,
    }
}

/// Finds a row by membership id.
pub fn row_for(totals: &ReportTotals, membership_id: Uuid) -> Option<&EmployeeTotals> {
    totals
        .employees
        .iter()
        .find(|row| row.membership_id == membership_id)
}
