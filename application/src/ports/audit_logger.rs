//! Port for structured audit logging.
//!
//! Defines the [`AuditLogger`] trait for recording ledger operations
//! (deployments, install attempts, submits, evaluates, channel updates) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable trail (JSONL).

use serde_json::Value;

/// A structured audit event.
///
/// Each event has a type string and a JSON payload containing event-specific
/// fields. The adapter stamps the time when it writes the record.
pub struct AuditEvent {
    /// Event type identifier (e.g., "deploy_started", "install_attempt").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging audit events to a structured log.
///
/// `log` is synchronous and infallible: a broken audit sink must never fail
/// a ledger operation.
pub trait AuditLogger: Send + Sync {
    /// Record an audit event.
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}
