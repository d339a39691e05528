//! Transactional database over the in-memory tables
//!
//! - One writer at a time (`RwLock` write guard held for the whole transaction)
//! - Readers see only committed state
//! - Every mutation is applied eagerly and its inverse recorded; on any
//!   failure the inverses are applied in reverse order
//! - A transaction commits only once its journal record is appended
//! - On open, the journal is replayed from byte 0; any corruption aborts
//!   the open

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use crate::observability::{
    log_event_with_fields, Event, HealthCheck, Logger, MetricsRegistry, ObservationScope,
};

use super::errors::{StorageError, StorageResult};
use super::journal::{FileJournal, Journal, JournalReader, NullJournal, SyncMode};
use super::mutation::Mutation;
use super::tables::Tables;

/// Statistics from journal replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records_replayed: u64,
    pub mutations_applied: u64,
    pub final_sequence: u64,
    pub final_offset: u64,
}

pub struct Database {
    tables: RwLock<Tables>,
    journal: Mutex<Box<dyn Journal>>,
    metrics: Arc<MetricsRegistry>,
    replay_stats: ReplayStats,
}

impl Database {
    /// A database that keeps nothing across restarts
    pub fn in_memory(metrics: Arc<MetricsRegistry>) -> Self {
        Self::with_journal(Box::new(NullJournal::new()), metrics)
    }

    /// Empty tables over the given journal. No replay is performed.
    pub fn with_journal(journal: Box<dyn Journal>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
            journal: Mutex::new(journal),
            metrics,
            replay_stats: ReplayStats::default(),
        }
    }

    /// Open the database under `data_dir`, replaying its journal.
    pub fn open(
        data_dir: &Path,
        sync_mode: SyncMode,
        metrics: Arc<MetricsRegistry>,
    ) -> StorageResult<Self> {
        let path = FileJournal::journal_path(data_dir);
        let path_display = path.display().to_string();
        let scope = ObservationScope::with_fields(Event::JournalReplay, &[("path", &path_display)]);

        let mut tables = Tables::new();
        let stats = if path.exists() {
            match Self::replay(&path, &mut tables) {
                Ok(stats) => stats,
                Err(e) => {
                    log_event_with_fields(
                        Event::JournalCorruption,
                        &[("path", &path_display), ("error", &e.to_string())],
                    );
                    scope.fail(e.message());
                    return Err(e);
                }
            }
        } else {
            ReplayStats::default()
        };

        let journal = FileJournal::open(data_dir, sync_mode, stats.final_sequence + 1)?;

        scope.complete_with_fields(&[
            ("records", &stats.records_replayed.to_string()),
            ("mutations", &stats.mutations_applied.to_string()),
        ]);

        Ok(Self {
            tables: RwLock::new(tables),
            journal: Mutex::new(Box::new(journal)),
            metrics,
            replay_stats: stats,
        })
    }

    fn replay(path: &Path, tables: &mut Tables) -> StorageResult<ReplayStats> {
        let mut reader = JournalReader::open(path)?;
        let mut stats = ReplayStats::default();

        while let Some(record) = reader.read_next()? {
            for mutation in &record.mutations {
                tables.apply(mutation).map_err(|e| {
                    StorageError::corruption_at_sequence(
                        record.sequence,
                        format!("{} record cannot be applied: {}", mutation.kind(), e.message()),
                    )
                })?;
                stats.mutations_applied += 1;
            }
            stats.records_replayed += 1;
        }

        stats.final_sequence = reader.last_sequence();
        stats.final_offset = reader.offset();
        Ok(stats)
    }

    pub fn replay_stats(&self) -> ReplayStats {
        self.replay_stats
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Sequence of the last committed journal record
    pub fn journal_sequence(&self) -> StorageResult<u64> {
        let journal = self.journal.lock().map_err(|_| StorageError::lock_poisoned())?;
        Ok(journal.last_sequence())
    }

    /// Run `f` against a consistent snapshot of committed state.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StorageResult<T> {
        let tables = self.tables.read().map_err(|_| StorageError::lock_poisoned())?;
        Ok(f(&tables))
    }

    /// Run `f` as one atomic unit.
    ///
    /// All mutations applied through the `Transaction` become visible and
    /// durable together, or not at all. An `Err` from `f`, a rejected
    /// mutation, or a failed journal append undoes everything.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        self.transaction_then(f, |_| ())
    }

    /// Like `transaction`, then run `on_commit` with the result before the
    /// write lock is released.
    ///
    /// Commits are serialised by the lock, so anything `on_commit` does is
    /// ordered exactly as the commits are. `on_commit` must not block or
    /// touch this database.
    pub fn transaction_then<T, E, F, C>(&self, f: F, on_commit: C) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        C: FnOnce(&T),
        E: From<StorageError>,
    {
        let mut tables = self.tables.write().map_err(|_| StorageError::lock_poisoned())?;
        let mut txn = Transaction::new(&mut tables);

        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(e) => {
                txn.rollback("operation failed");
                self.metrics.increment_transactions_rolled_back();
                return Err(e);
            }
        };

        if txn.is_empty() {
            on_commit(&value);
            return Ok(value);
        }

        let mut journal = match self.journal.lock() {
            Ok(journal) => journal,
            Err(_) => {
                txn.rollback("journal lock poisoned");
                self.metrics.increment_transactions_rolled_back();
                return Err(StorageError::lock_poisoned().into());
            }
        };

        let bytes_before = journal.bytes_written();
        let appended = journal.append(&txn.applied);
        match appended {
            Ok(_) => {
                self.metrics
                    .record_journal_append(journal.bytes_written().saturating_sub(bytes_before));
                self.metrics.increment_transactions_committed();
                drop(journal);
                on_commit(&value);
                Ok(value)
            }
            Err(e) => {
                log_event_with_fields(Event::JournalAppendFailed, &[("error", &e.to_string())]);
                txn.rollback("journal append failed");
                self.metrics.increment_transactions_rolled_back();
                Err(e.into())
            }
        }
    }
}

impl HealthCheck for Database {
    fn name(&self) -> &str {
        "storage"
    }

    fn is_healthy(&self) -> bool {
        if self.tables.is_poisoned() {
            return false;
        }
        self.journal
            .lock()
            .map(|journal| journal.is_writable())
            .unwrap_or(false)
    }
}

/// Mutations applied so far in one transaction, with their inverses.
pub struct Transaction<'a> {
    tables: &'a mut Tables,
    applied: Vec<Mutation>,
    undo: Vec<Mutation>,
}

impl<'a> Transaction<'a> {
    fn new(tables: &'a mut Tables) -> Self {
        Self {
            tables,
            applied: Vec::new(),
            undo: Vec::new(),
        }
    }

    /// State as seen inside this transaction, including its own writes
    pub fn tables(&self) -> &Tables {
        self.tables
    }

    pub fn apply(&mut self, mutation: Mutation) -> StorageResult<()> {
        let inverse = self.tables.apply(&mutation)?;
        self.undo.push(inverse);
        self.applied.push(mutation);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    fn rollback(self, reason: &str) {
        let count = self.undo.len().to_string();
        for inverse in self.undo.into_iter().rev() {
            if let Err(e) = self.tables.apply(&inverse) {
                Logger::fatal(
                    Event::TransactionRollback.as_str(),
                    &[("inverse", inverse.kind()), ("error", &e.to_string())],
                );
            }
        }
        log_event_with_fields(
            Event::TransactionRollback,
            &[("reason", reason), ("mutations", &count)],
        );
    }
}
