//! Telemetry and structured logging for hookable lifecycles.
//!
//! Handles subscriber setup, redaction of hook options, and the structured
//! run events emitted by the runners.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EVENT_TARGET, EventLogEntry, EventLogger, RunEvent};
pub use logger::init_logger;
pub use redact::{redact_options, redact_sensitive_data};
