//! Log event names
//!
//! Every structured log line carries one of these as its `event` key.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Engine opened and ready
    EngineOpened,
    /// Configuration loaded
    ConfigLoaded,

    // Journal
    /// Journal replay (scoped: `_BEGIN` / `_COMPLETE` / `_FAILED`)
    JournalReplay,
    /// Journal corruption detected (FATAL)
    JournalCorruption,
    /// Journal append failed; transaction rolled back
    JournalAppendFailed,

    // Transactions
    /// Transaction rolled back
    TransactionRollback,

    // Text index
    /// Document import (scoped: `_BEGIN` / `_COMPLETE` / `_FAILED`)
    IndexDocument,
    /// Document import rejected
    IndexDocumentRejected,
    /// Document tokens removed
    DocumentDeleted,

    // Annotations
    /// Cluster created
    ClusterCreated,
    /// Mention added
    MentionAdded,
    /// Mention rejected by validation
    MentionRejected,
    /// Mention removed
    MentionRemoved,
    /// Cluster and its mentions removed
    ClusterDeleted,
    /// All annotations of a workspace removed
    WorkspaceCleared,
    /// Mention span refers to tokens that no longer exist
    MentionSpanDangling,

    // Health
    /// A subsystem reported unhealthy
    HealthDegraded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EngineOpened => "ENGINE_OPENED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::JournalReplay => "JOURNAL_REPLAY",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",
            Event::JournalAppendFailed => "JOURNAL_APPEND_FAILED",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::IndexDocument => "INDEX_DOCUMENT",
            Event::IndexDocumentRejected => "INDEX_DOCUMENT_REJECTED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::ClusterCreated => "CLUSTER_CREATED",
            Event::MentionAdded => "MENTION_ADDED",
            Event::MentionRejected => "MENTION_REJECTED",
            Event::MentionRemoved => "MENTION_REMOVED",
            Event::ClusterDeleted => "CLUSTER_DELETED",
            Event::WorkspaceCleared => "WORKSPACE_CLEARED",
            Event::MentionSpanDangling => "MENTION_SPAN_DANGLING",
            Event::HealthDegraded => "HEALTH_DEGRADED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::JournalCorruption => Severity::Fatal,
            Event::JournalAppendFailed => Severity::Error,
            Event::TransactionRollback
            | Event::IndexDocumentRejected
            | Event::MentionRejected
            | Event::MentionSpanDangling
            | Event::HealthDegraded => Severity::Warn,
            _ => Severity::Info,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        let events = [
            Event::EngineOpened,
            Event::ConfigLoaded,
            Event::JournalReplay,
            Event::JournalCorruption,
            Event::JournalAppendFailed,
            Event::TransactionRollback,
            Event::IndexDocument,
            Event::IndexDocumentRejected,
            Event::DocumentDeleted,
            Event::ClusterCreated,
            Event::MentionAdded,
            Event::MentionRejected,
            Event::MentionRemoved,
            Event::ClusterDeleted,
            Event::WorkspaceCleared,
            Event::MentionSpanDangling,
            Event::HealthDegraded,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_severities() {
        assert!(Event::JournalCorruption.is_fatal());
        assert_eq!(Event::MentionSpanDangling.severity(), Severity::Warn);
        assert_eq!(Event::MentionAdded.severity(), Severity::Info);
    }
}
