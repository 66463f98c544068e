//! Observability subsystem for keyquery
//!
//! - Structured logging (JSON lines)
//! - Process-wide counters
//! - Typed events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on packing or compilation
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use keyquery::observability::{log_event_with_fields, metrics, Event};
//!
//! log_event_with_fields(Event::QueryCompiled, &[("type", "Trades.Trade")]);
//! metrics().increment_queries_compiled();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{LogTarget, Logger, Severity};
pub use metrics::{metrics, MetricsRegistry, MetricsSnapshot};

/// Log an event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.default_severity(), event.as_str(), &[]);
}

/// Log an event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.default_severity(), event.as_str(), fields);
}
