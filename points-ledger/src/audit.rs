//! Audit emission hook
//!
//! After a successful mutation the engine emits one [`AuditEvent`] to
//! the configured sink, fire-and-forget: sink behavior never affects
//! the mutation result, and the event deliberately carries neither the
//! before/after balances nor the reason text. Consumers that need those
//! read the history index instead.

use crate::types::{ActionType, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal record of one committed mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Direction of the mutation
    pub action: ActionType,

    /// Whose balance changed
    pub target: UserId,

    /// Who requested the change
    pub actor: UserId,

    /// Magnitude of the change
    pub amount: i64,

    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    /// Deliver one event. Must not block for long; errors stay internal.
    fn emit(&self, event: &AuditEvent);
}

/// Default sink: structured log line per event
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        tracing::info!(
            action = event.action.tag(),
            target = %event.target,
            actor = %event.actor,
            amount = event.amount,
            timestamp = %event.timestamp,
            "Points mutation"
        );
    }
}
