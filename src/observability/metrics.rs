//! Operational counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exactness across threads is not required

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    documents_indexed: AtomicU64,
    tokens_indexed: AtomicU64,
    documents_deleted: AtomicU64,
    clusters_created: AtomicU64,
    clusters_deleted: AtomicU64,
    mentions_added: AtomicU64,
    mentions_rejected: AtomicU64,
    mentions_removed: AtomicU64,
    workspaces_cleared: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    journal_records: AtomicU64,
    journal_bytes: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Text index

    pub fn record_document_indexed(&self, tokens: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.tokens_indexed.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn increment_documents_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    // Annotations

    pub fn increment_clusters_created(&self) {
        self.clusters_created.fetch_add(1, Ordering::Relaxed);
    }

    /// A cluster and `mentions` of its mentions were deleted
    pub fn record_cluster_deleted(&self, mentions: u64) {
        self.clusters_deleted.fetch_add(1, Ordering::Relaxed);
        self.mentions_removed.fetch_add(mentions, Ordering::Relaxed);
    }

    pub fn increment_mentions_added(&self) {
        self.mentions_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mentions_rejected(&self) {
        self.mentions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mentions_removed(&self) {
        self.mentions_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_workspace_cleared(&self, clusters: u64, mentions: u64) {
        self.workspaces_cleared.fetch_add(1, Ordering::Relaxed);
        self.clusters_deleted.fetch_add(clusters, Ordering::Relaxed);
        self.mentions_removed.fetch_add(mentions, Ordering::Relaxed);
    }

    // Storage

    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_journal_append(&self, bytes: u64) {
        self.journal_records.fetch_add(1, Ordering::Relaxed);
        self.journal_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            tokens_indexed: self.tokens_indexed.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            clusters_created: self.clusters_created.load(Ordering::Relaxed),
            clusters_deleted: self.clusters_deleted.load(Ordering::Relaxed),
            mentions_added: self.mentions_added.load(Ordering::Relaxed),
            mentions_rejected: self.mentions_rejected.load(Ordering::Relaxed),
            mentions_removed: self.mentions_removed.load(Ordering::Relaxed),
            workspaces_cleared: self.workspaces_cleared.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            journal_records: self.journal_records.load(Ordering::Relaxed),
            journal_bytes: self.journal_bytes.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of every counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_indexed: u64,
    pub tokens_indexed: u64,
    pub documents_deleted: u64,
    pub clusters_created: u64,
    pub clusters_deleted: u64,
    pub mentions_added: u64,
    pub mentions_rejected: u64,
    pub mentions_removed: u64,
    pub workspaces_cleared: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
    pub journal_records: u64,
    pub journal_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.documents_indexed, 0);
        assert_eq!(snapshot.mentions_added, 0);
        assert_eq!(snapshot.journal_bytes, 0);
    }

    #[test]
    fn test_cascade_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_mentions_removed();
        registry.record_cluster_deleted(3);
        registry.record_workspace_cleared(2, 5);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.clusters_deleted, 3);
        assert_eq!(snapshot.mentions_removed, 9);
        assert_eq!(snapshot.workspaces_cleared, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = MetricsRegistry::new();
        registry.record_document_indexed(7);
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["tokens_indexed"], 7);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_transactions_committed();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.snapshot().transactions_committed, 800);
    }
}
