//! Report models.
//!
//! Reports are point-in-time snapshots keyed by restaurant and period. Their
//! totals and the daily signature log are typed structures so the shape of
//! what was signed is checked at compile time.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Role;
use crate::error::{EngineError, EngineResult};

/// One employee's row in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTotals {
    /// The membership the row aggregates.
    pub membership_id: Uuid,
    /// The person behind the membership.
    pub user_id: Uuid,
    /// Display name at generation time.
    pub display_name: String,
    /// Role at generation time.
    pub role: Role,
    /// Number of completed entries counted.
    pub entry_count: usize,
    /// Effective worked minutes.
    pub total_minutes: i64,
    /// Worked hours, rounded to 2 decimal places.
    pub total_hours: Decimal,
    /// Effective hourly rate.
    pub rate: Decimal,
    /// Earnings, rounded to 2 decimal places.
    pub total_amount: Decimal,
}

/// Report-wide summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsSummary {
    /// Number of employee rows.
    pub total_employees: usize,
    /// Sum of worked hours, rounded to 2 decimal places.
    pub total_hours: Decimal,
    /// Sum of earnings, rounded to 2 decimal places.
    pub total_amount: Decimal,
    /// Currency code of every amount in the report.
    pub currency: String,
}

/// The frozen totals of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    /// Per-employee rows, ordered by display name then membership id.
    pub employees: Vec<EmployeeTotals>,
    /// Report-wide summary.
    pub summary: TotalsSummary,
}

/// One immutable entry of a daily report's signature log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SignatureLogEntry {
    /// The report was signed.
    Signed {
        /// Signer.
        actor: Uuid,
        /// Signing instant.
        at: DateTime<Utc>,
    },
    /// The report was unsigned.
    Unsigned {
        /// Who unsigned it.
        actor: Uuid,
        /// Unsigning instant.
        at: DateTime<Utc>,
        /// Why the period was reopened.
        reason: String,
        /// The signer whose signature was withdrawn.
        previous_signed_by: Uuid,
        /// When the withdrawn signature was made.
        previous_signed_at: DateTime<Utc>,
    },
}

impl SignatureLogEntry {
    /// The action name as written to the log.
    pub fn action(&self) -> &'static str {
        match self {
            SignatureLogEntry::Signed { .. } => "signed",
            SignatureLogEntry::Unsigned { .. } => "unsigned",
        }
    }
}

/// Append-only signature log. Entries can be read but never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureLog(Vec<SignatureLogEntry>);

impl SignatureLog {
    /// All entries, oldest first.
    pub fn entries(&self) -> &[SignatureLogEntry] {
        &self.0
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn append(&mut self, entry: SignatureLogEntry) {
        self.0.push(entry);
    }
}

/// A live signature on a daily report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signer.
    pub signed_by: Uuid,
    /// Signing instant.
    pub signed_at: DateTime<Utc>,
}

/// Daily report, unique per `(restaurant_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDaily {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning restaurant.
    pub restaurant_id: Uuid,
    /// The reported local date.
    pub date: NaiveDate,
    /// Frozen totals.
    pub totals: ReportTotals,
    /// Current signature, if signed.
    #[serde(default)]
    pub signature: Option<Signature>,
    /// Every sign and unsign, oldest first.
    #[serde(default)]
    pub signature_log: SignatureLog,
    /// Generation instant.
    pub generated_at: DateTime<Utc>,
    /// Optimistic concurrency version, bumped on every store write.
    #[serde(default)]
    pub version: u64,
}

impl ReportDaily {
    /// True when the report currently carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The current signer.
    pub fn signed_by(&self) -> Option<Uuid> {
        self.signature.map(|s| s.signed_by)
    }

    /// The current signing instant.
    pub fn signed_at(&self) -> Option<DateTime<Utc>> {
        self.signature.map(|s| s.signed_at)
    }
}

/// Weekly report, unique per `(restaurant_id, week_start)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWeekly {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning restaurant.
    pub restaurant_id: Uuid,
    /// Monday the week starts on.
    pub week_start: NaiveDate,
    /// Frozen totals.
    pub totals: ReportTotals,
    /// Generation instant.
    pub generated_at: DateTime<Utc>,
}

/// Monthly report, unique per `(restaurant_id, period_month)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMonthly {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning restaurant.
    pub restaurant_id: Uuid,
    /// The calendar month.
    pub period_month: PeriodMonth,
    /// Frozen totals.
    pub totals: ReportTotals,
    /// Generation instant.
    pub generated_at: DateTime<Utc>,
}

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodMonth {
    year: i32,
    month: u32,
}

impl PeriodMonth {
    /// Creates a month, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::validation(
                "period_month",
                format!("{}-{} is not a valid month", year, month),
            ));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month number, 1..=12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month.
    pub fn next_first_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for PeriodMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::validation("period_month", format!("expected YYYY-MM, got '{}'", s));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for PeriodMonth {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodMonth> for String {
    fn from(value: PeriodMonth) -> Self {
        value.to_string()
    }
}
