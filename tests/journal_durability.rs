//! Journal Durability Tests
//!
//! - Every acknowledged operation survives reopen
//! - Replay is all-or-nothing: a corrupt journal refuses the open
//! - An operation whose journal append fails leaves no trace in memory

use std::fs;
use std::io;
use std::sync::Arc;

use corefstore::observability::MetricsRegistry;
use corefstore::storage::{Database, FileJournal, Journal, Mutation, StorageError, StorageResult};
use corefstore::{Config, CoreError, DocumentId, Engine, TokenInput, WorkspaceId};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn words(list: &[&str]) -> Vec<TokenInput> {
    list.iter()
        .enumerate()
        .map(|(i, w)| TokenInput::new(*w, i as u32 * 8, i as u32 * 8 + w.len() as u32))
        .collect()
}

/// Accepts `remaining` appends, then fails every one after.
struct FlakyJournal {
    remaining: usize,
    sequence: u64,
}

impl FlakyJournal {
    fn failing_after(remaining: usize) -> Self {
        Self {
            remaining,
            sequence: 0,
        }
    }
}

impl Journal for FlakyJournal {
    fn append(&mut self, _mutations: &[Mutation]) -> StorageResult<u64> {
        if self.remaining == 0 {
            return Err(StorageError::append_failed(
                "injected failure",
                io::Error::new(io::ErrorKind::Other, "no space left on device"),
            ));
        }
        self.remaining -= 1;
        self.sequence += 1;
        Ok(self.sequence)
    }

    fn last_sequence(&self) -> u64 {
        self.sequence
    }
}

fn flaky_engine(remaining: usize) -> Engine {
    let db = Database::with_journal(
        Box::new(FlakyJournal::failing_after(remaining)),
        Arc::new(MetricsRegistry::new()),
    );
    Engine::with_database(Arc::new(db), 1_000)
}

// =============================================================================
// Replay
// =============================================================================

#[test]
fn test_acknowledged_operations_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::new(temp_dir.path());
    let doc = DocumentId::new();
    let workspace = WorkspaceId::new();

    let (cluster_id, mention_id) = {
        let engine = Engine::open(&config).unwrap();
        engine
            .text_index()
            .index_document(doc, &[words(&["The", "cat", "sat"]), words(&["It", "slept"])])
            .unwrap();
        let cluster = engine.annotations().create_cluster(workspace).unwrap();
        let mention = engine.annotations().add_mention(cluster.id, doc, 1, 1).unwrap();
        (cluster.id, mention.id)
    };

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.database().replay_stats().records_replayed, 3);
    assert_eq!(engine.text_index().get_max_global_index(doc).unwrap(), Some(4));
    assert_eq!(engine.annotations().get_mention(mention_id).unwrap().cluster_id, cluster_id);
    assert_eq!(
        engine.annotations().resolve_mention(mention_id).unwrap().text(),
        Some("cat")
    );
}

/// Deletes replay too, and creation order continues across restarts.
#[test]
fn test_deletes_and_ordering_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::new(temp_dir.path());
    let doc = DocumentId::new();
    let workspace = WorkspaceId::new();

    let first = {
        let engine = Engine::open(&config).unwrap();
        engine.text_index().index_document(doc, &[words(&["a", "b"])]).unwrap();
        let first = engine.annotations().create_cluster(workspace).unwrap();
        let doomed = engine.annotations().create_cluster(workspace).unwrap();
        engine.annotations().add_mention(doomed.id, doc, 0, 1).unwrap();
        engine.annotations().delete_cluster(doomed.id).unwrap();
        engine.text_index().delete_document(doc).unwrap();
        first
    };

    let engine = Engine::open(&config).unwrap();
    let later = engine.annotations().create_cluster(workspace).unwrap();

    let ids: Vec<_> = engine
        .annotations()
        .get_clusters_for_workspace(workspace)
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![first.id, later.id]);
    assert_eq!(engine.text_index().token_count(doc).unwrap(), 0);
    assert_eq!(engine.stats().unwrap().mentions, 0);
}

#[test]
fn test_unsynced_mode_still_replays() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::new(temp_dir.path());
    config.journal_sync_mode = "none".to_string();
    let workspace = WorkspaceId::new();

    {
        let engine = Engine::open(&config).unwrap();
        engine.annotations().create_cluster(workspace).unwrap();
    }

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.annotations().get_clusters_for_workspace(workspace).unwrap().len(), 1);
}

// =============================================================================
// Corruption
// =============================================================================

fn journal_with_two_records(temp_dir: &TempDir) -> std::path::PathBuf {
    let config = Config::new(temp_dir.path());
    let engine = Engine::open(&config).unwrap();
    engine.annotations().create_cluster(WorkspaceId::new()).unwrap();
    engine.annotations().create_cluster(WorkspaceId::new()).unwrap();
    FileJournal::journal_path(temp_dir.path())
}

#[test]
fn test_flipped_byte_refuses_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = journal_with_two_records(&temp_dir);

    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    let err = Engine::open(&Config::new(temp_dir.path())).err().unwrap();
    assert!(matches!(err, CoreError::Consistency(_)));
    assert!(err.to_string().contains("COREF_JOURNAL_CORRUPTION"));
}

#[test]
fn test_truncated_tail_refuses_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = journal_with_two_records(&temp_dir);

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    let err = Engine::open(&Config::new(temp_dir.path())).err().unwrap();
    assert!(err.is_consistency());
}

// =============================================================================
// Failed Appends
// =============================================================================

#[test]
fn test_failed_import_leaves_no_tokens() {
    let engine = flaky_engine(0);
    let doc = DocumentId::new();

    let err = engine
        .text_index()
        .index_document(doc, &[words(&["lost", "words"])])
        .unwrap_err();
    assert!(err.is_consistency());
    assert_eq!(engine.text_index().get_max_global_index(doc).unwrap(), None);
    assert_eq!(engine.metrics().snapshot().documents_indexed, 0);
}

/// A cascade whose append fails rolls back every mention delete with it.
#[test]
fn test_failed_cascade_keeps_cluster_and_mentions() {
    let engine = flaky_engine(4);
    let doc = DocumentId::new();
    let workspace = WorkspaceId::new();
    let mut sub = engine.dispatcher().subscribe(Some(workspace));

    engine.text_index().index_document(doc, &[words(&["x", "y", "z"])]).unwrap();
    let cluster = engine.annotations().create_cluster(workspace).unwrap();
    engine.annotations().add_mention(cluster.id, doc, 0, 0).unwrap();
    engine.annotations().add_mention(cluster.id, doc, 1, 2).unwrap();

    let err = engine.annotations().delete_cluster(cluster.id).unwrap_err();
    assert!(err.is_consistency());

    assert_eq!(engine.annotations().mention_count(cluster.id).unwrap(), 2);
    let err = engine.annotations().delete_all_annotations(workspace).unwrap_err();
    assert!(err.is_consistency());
    assert_eq!(engine.annotations().get_clusters_for_workspace(workspace).unwrap().len(), 1);

    // No notification for operations that did not commit
    let mut kinds = Vec::new();
    while let Ok(event) = sub.receiver.try_recv() {
        kinds.push(event.kind);
    }
    assert_eq!(kinds.len(), 3);
    assert_eq!(engine.metrics().snapshot().transactions_rolled_back, 2);
}
