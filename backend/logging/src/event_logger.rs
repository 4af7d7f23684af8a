//! Lifecycle Event Logger
//!
//! Structured run events (run started/finished, point started/skipped) routed
//! through `tracing` under a dedicated target, so a JSON file layer turns them
//! into NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

/// `tracing` target carrying run events.
pub const EVENT_TARGET: &str = "lifecycle_events";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted { runner: String, points: usize },
    PointStarted { point: String, hooks: usize },
    PointSkipped { point: String, reason: String },
    PointFinished { point: String },
    RunFinished { elapsed_ms: u64 },
    RunFailed { error: String },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: RunEvent,
}

impl EventLogEntry {
    /// Stamp an event; error text is redacted since it may echo hook input.
    pub fn new(run_id: &str, mut event: RunEvent) -> Self {
        if let RunEvent::RunFailed { error } = &mut event {
            *error = redact_sensitive_data(error);
        }
        Self { run_id: run_id.into(), timestamp: Utc::now(), event }
    }
}

pub struct EventLogger;

impl EventLogger {
    pub fn log_event(run_id: &str, event: RunEvent) {
        let entry = EventLogEntry::new(run_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: EVENT_TARGET, run_id = %entry.run_id, event = %payload, "Lifecycle event");
    }
}
