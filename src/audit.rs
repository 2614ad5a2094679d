//! Audit sink port.
//!
//! Every state transition and signing action is offered to an [`AuditSink`]
//! as a structured [`AuditRecord`]. Delivery is fire-and-forget: a failing
//! sink is logged and never aborts the operation that produced the record.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// The acting user, `None` for system actions.
    pub actor: Option<Uuid>,
    /// The entity type, e.g. `time_entry`.
    pub entity_type: &'static str,
    /// The entity id.
    pub entity_id: Uuid,
    /// The action, e.g. `clock_in`, `sign`.
    pub action: &'static str,
    /// Snapshot before the action.
    pub before: Option<Value>,
    /// Snapshot after the action.
    pub after: Option<Value>,
    /// When the action happened.
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    /// Builds a record from serializable before/after snapshots.
    pub fn new<B: Serialize, A: Serialize>(
        actor: Option<Uuid>,
        entity_type: &'static str,
        entity_id: Uuid,
        action: &'static str,
        before: Option<&B>,
        after: Option<&A>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            entity_type,
            entity_id,
            action,
            before: before.and_then(|b| serde_json::to_value(b).ok()),
            after: after.and_then(|a| serde_json::to_value(a).ok()),
            at,
        }
    }
}

/// Failure to write an audit record.
#[derive(Debug, Error)]
#[error("Audit sink unavailable: {message}")]
pub struct AuditError {
    /// A description of the failure.
    pub message: String,
}

/// Write-only destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Writes one record.
    fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Offers a record to the sink, logging and discarding any failure.
pub fn emit(sink: &dyn AuditSink, record: AuditRecord) {
    let entity_type = record.entity_type;
    let entity_id = record.entity_id;
    let action = record.action;
    if let Err(err) = sink.record(record) {
        warn!(
            entity_type,
            entity_id = %entity_id,
            action,
            error = %err,
            "Audit record dropped"
        );
    }
}

/// Emits every record as a `tracing` event on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        let after = record
            .after
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        info!(
            target: "audit",
            actor = ?record.actor,
            entity_type = record.entity_type,
            entity_id = %record.entity_id,
            action = record.action,
            after = %after,
            "Audit"
        );
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// The actions written so far, in order.
    pub fn actions(&self) -> Vec<&'static str> {
        self.records().iter().map(|r| r.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|_| AuditError {
                message: "audit buffer poisoned".to_string(),
            })?
            .push(record);
        Ok(())
    }
}
