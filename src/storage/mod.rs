//! Storage: tables, transactions and the journal
//!
//! State lives in memory as BTreeMap tables. Every committed transaction
//! is appended to a checksummed journal before it is acknowledged, and the
//! journal is replayed from byte 0 on open.
//!
//! - Checksums on every journal record
//! - Halt on corruption: a bad record refuses the open
//! - Rejected mutations leave the tables untouched

mod checksum;
mod database;
mod errors;
mod journal;
mod mutation;
mod tables;

pub use checksum::{compute_checksum, verify_checksum};
pub use database::{Database, ReplayStats, Transaction};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use journal::{FileJournal, Journal, JournalReader, JournalRecord, NullJournal, SyncMode};
pub use mutation::Mutation;
pub use tables::{TableStats, Tables};
