//! Observability events for keyquery
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,
    /// Type descriptions loaded from disk
    SchemasLoaded,
    /// A type schema was registered
    SchemaRegistered,

    // Packing
    /// An object was packed into a record
    RecordPacked,
    /// A packing request was rejected
    PackRejected,

    // Queries
    /// A predicate compiled into a query
    QueryCompiled,
    /// A Ge/Le pair merged into one range
    RangeMerged,
    /// A predicate or query was rejected
    QueryRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::SchemaRegistered => "SCHEMA_REGISTERED",
            Event::RecordPacked => "RECORD_PACKED",
            Event::PackRejected => "PACK_REJECTED",
            Event::QueryCompiled => "QUERY_COMPILED",
            Event::RangeMerged => "RANGE_MERGED",
            Event::QueryRejected => "QUERY_REJECTED",
        }
    }

    /// Severity an event is logged at when no override is given
    pub fn default_severity(&self) -> super::Severity {
        match self {
            Event::ConfigLoaded | Event::SchemasLoaded => super::Severity::Info,
            Event::PackRejected | Event::QueryRejected => super::Severity::Warn,
            _ => super::Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
