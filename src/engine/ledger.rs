//! Daily report signing ledger.
//!
//! The ledger is the only authority on whether a day's time entries may still
//! change. Signing freezes the day, unsigning with a reason reopens it, and
//! both are appended to the report's signature log. A signature always covers
//! totals recomputed from the entries under the same day lock.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use super::reports::ReportAggregator;
use crate::audit::{AuditRecord, AuditSink, emit};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::models::{Actor, ReportDaily, Signature, SignatureLogEntry};
use crate::store::ReportStore;

/// Signs and unsigns daily reports, and gates edits to signed days.
pub struct ReportSigningLedger {
    reports: Arc<dyn ReportStore>,
    aggregator: Arc<ReportAggregator>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl ReportSigningLedger {
    /// Creates a ledger over a report store. The aggregator recomputes a
    /// day's totals at signing.
    pub fn new(
        reports: Arc<dyn ReportStore>,
        aggregator: Arc<ReportAggregator>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reports,
            aggregator,
            audit,
            clock,
        }
    }

    /// Signs an unsigned daily report.
    ///
    /// Entries of an unsigned day may have been edited since the report was
    /// generated. The day's totals are recomputed under the day lock and
    /// replace a snapshot that no longer matches, so the signed totals are
    /// always those of the entries they freeze.
    pub fn sign(&self, report_id: Uuid, actor: &Actor) -> EngineResult<ReportDaily> {
        let (before, after) = self.transition(report_id, |report, now| {
            if let Some(signature) = report.signature {
                return Err(EngineError::InvalidState {
                    entity: "Daily report",
                    id: report.id,
                    current: format!("signed by '{}'", signature.signed_by),
                    required: "unsigned".to_string(),
                });
            }

            let totals = self.aggregator.daily_totals(report.restaurant_id, report.date)?;
            if totals != report.totals {
                warn!(
                    report_id = %report.id,
                    date = %report.date,
                    stale_hours = %report.totals.summary.total_hours,
                    current_hours = %totals.summary.total_hours,
                    "Daily report totals refreshed before signing"
                );
                report.totals = totals;
                report.generated_at = now;
            }

            report.signature = Some(Signature {
                signed_by: actor.user_id,
                signed_at: now,
            });
            report.signature_log.append(SignatureLogEntry::Signed {
                actor: actor.user_id,
                at: now,
            });
            Ok(())
        })?;

        info!(
            report_id = %after.id,
            restaurant_id = %after.restaurant_id,
            date = %after.date,
            signed_by = %actor.user_id,
            "Daily report signed"
        );
        self.audit(actor, "sign", &before, &after);
        Ok(after)
    }

    /// Withdraws the signature of a signed daily report.
    pub fn unsign(&self, report_id: Uuid, actor: &Actor, reason: &str) -> EngineResult<ReportDaily> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::validation(
                "reason",
                "a reason is required to unsign a report",
            ));
        }

        let (before, after) = self.transition(report_id, |report, now| {
            let Some(previous) = report.signature else {
                return Err(EngineError::InvalidState {
                    entity: "Daily report",
                    id: report.id,
                    current: "unsigned".to_string(),
                    required: "signed".to_string(),
                });
            };
            report.signature = None;
            report.signature_log.append(SignatureLogEntry::Unsigned {
                actor: actor.user_id,
                at: now,
                reason: reason.to_string(),
                previous_signed_by: previous.signed_by,
                previous_signed_at: previous.signed_at,
            });
            Ok(())
        })?;

        warn!(
            report_id = %after.id,
            restaurant_id = %after.restaurant_id,
            date = %after.date,
            unsigned_by = %actor.user_id,
            reason,
            "Daily report unsigned"
        );
        self.audit(actor, "unsign", &before, &after);
        Ok(after)
    }

    /// Deletes an unsigned daily report so the day can be regenerated.
    pub fn delete(&self, report_id: Uuid, actor: &Actor) -> EngineResult<()> {
        let report = self.find(report_id)?;
        let mut deleted: Option<ReportDaily> = None;

        self.reports
            .with_day_locks(report.restaurant_id, &[report.date], &mut |reports| {
                let current = reports
                    .iter()
                    .find(|r| r.id == report_id)
                    .ok_or_else(|| EngineError::not_found("Daily report", report_id))?;
                if let Some(signature) = current.signature {
                    return Err(EngineError::InvalidState {
                        entity: "Daily report",
                        id: report_id,
                        current: format!("signed by '{}'", signature.signed_by),
                        required: "unsigned".to_string(),
                    });
                }
                self.reports.delete_daily(current)?;
                deleted = Some(current.clone());
                Ok(())
            })?;

        if let Some(report) = deleted {
            info!(
                report_id = %report.id,
                restaurant_id = %report.restaurant_id,
                date = %report.date,
                "Daily report deleted"
            );
            emit(
                self.audit.as_ref(),
                AuditRecord::new::<ReportDaily, ReportDaily>(
                    Some(actor.user_id),
                    "report_daily",
                    report.id,
                    "delete",
                    Some(&report),
                    None,
                    self.clock.now(),
                ),
            );
        }
        Ok(())
    }

    /// The signature currently freezing a restaurant's day, if any.
    pub fn signature_for(&self, restaurant_id: Uuid, date: NaiveDate) -> EngineResult<Option<Signature>> {
        Ok(self
            .reports
            .daily_for_date(restaurant_id, date)?
            .and_then(|report| report.signature))
    }

    /// The full signature log of a daily report, oldest first.
    pub fn signature_log(&self, report_id: Uuid) -> EngineResult<Vec<SignatureLogEntry>> {
        Ok(self.find(report_id)?.signature_log.entries().to_vec())
    }

    /// Runs `mutate` only if none of the given days is covered by a signed
    /// daily report, holding those days' locks until it returns so that a
    /// signature cannot be committed in between.
    pub fn with_unlocked_days<T>(
        &self,
        restaurant_id: Uuid,
        dates: &[NaiveDate],
        mutate: impl FnOnce() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut mutate = Some(mutate);
        let mut output: Option<T> = None;

        self.reports
            .with_day_locks(restaurant_id, dates, &mut |reports| {
                if let Some((report, signature)) = reports
                    .iter()
                    .find_map(|r| r.signature.map(|s| (r, s)))
                {
                    return Err(EngineError::PeriodLocked {
                        date: report.date,
                        report_id: report.id,
                        signed_by: signature.signed_by,
                        signed_at: signature.signed_at,
                    });
                }
                let mutate = mutate.take().ok_or_else(|| EngineError::Internal {
                    message: "day lock callback invoked twice".to_string(),
                })?;
                output = Some(mutate()?);
                Ok(())
            })?;

        output.ok_or_else(|| EngineError::Internal {
            message: "day lock callback did not run".to_string(),
        })
    }

    fn find(&self, report_id: Uuid) -> EngineResult<ReportDaily> {
        self.reports
            .daily(report_id)?
            .ok_or_else(|| EngineError::not_found("Daily report", report_id))
    }

    /// Applies `change` to the current report under its day lock and stores
    /// it. Returns the report before and after.
    fn transition(
        &self,
        report_id: Uuid,
        change: impl Fn(&mut ReportDaily, chrono::DateTime<chrono::Utc>) -> EngineResult<()>,
    ) -> EngineResult<(ReportDaily, ReportDaily)> {
        let report = self.find(report_id)?;
        let mut result: Option<(ReportDaily, ReportDaily)> = None;

        self.reports
            .with_day_locks(report.restaurant_id, &[report.date], &mut |reports| {
                let current = reports
                    .iter()
                    .find(|r| r.id == report_id)
                    .ok_or_else(|| EngineError::not_found("Daily report", report_id))?;
                let mut updated = current.clone();
                change(&mut updated, self.clock.now())?;
                let saved = self.reports.update_daily(updated)?;
                result = Some((current.clone(), saved));
                Ok(())
            })?;

        result.ok_or_else(|| EngineError::Internal {
            message: "day lock callback did not run".to_string(),
        })
    }

    fn audit(&self, actor: &Actor, action: &'static str, before: &ReportDaily, after: &ReportDaily) {
        emit(
            self.audit.as_ref(),
            AuditRecord::new(
                Some(actor.user_id),
                "report_daily",
                after.id,
                action,
                Some(before),
                Some(after),
                self.clock.now(),
            ),
        );
    }
}
