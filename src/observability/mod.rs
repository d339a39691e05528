//! Observability: structured logging, counters, health
//!
//! Observability never changes the outcome of an operation. A failed
//! log write is dropped, not propagated.
//!
//! ```ignore
//! use corefstore::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::ClusterCreated, &[("cluster_id", &id)]);
//!
//! let scope = ObservationScope::new(Event::JournalReplay);
//! // ...
//! scope.complete();
//! ```

mod events;
mod health;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use health::{ComponentHealth, HealthCheck, HealthCoordinator, HealthReport};
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event at its own severity, with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::EngineOpened);
        log_event(Event::WorkspaceCleared);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("data_dir", "/tmp/test")]);
        log_event_with_fields(Event::MentionSpanDangling, &[("mention_id", "m1")]);
    }
}
