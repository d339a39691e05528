//! Append-only transaction journal
//!
//! One record per committed transaction:
//!
//! ```text
//! | length: u32 LE | sequence: u64 LE | payload (JSON) | checksum: u32 LE |
//! ```
//!
//! `length` is the payload length. The checksum covers length, sequence and
//! payload. Sequence numbers start at 1 and are strictly increasing.
//!
//! Replay is all-or-nothing: a checksum mismatch, a truncated tail or an
//! out-of-order sequence number fails the whole replay. Nothing is skipped or
//! repaired.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StorageError, StorageResult};
use super::mutation::Mutation;

const HEADER_SIZE: u64 = 4 + 8;
const CHECKSUM_SIZE: u64 = 4;

/// Durability mode for journal appends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// `sync_all` after every append
    Fsync,
    /// Flush only; durability left to the OS
    None,
}

impl SyncMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fsync" => Some(SyncMode::Fsync),
            "none" => Some(SyncMode::None),
            _ => None,
        }
    }
}

/// Destination for committed mutation batches.
///
/// `append` is called with the table lock held, after the batch has been
/// applied in memory. An error makes the caller roll the batch back.
pub trait Journal: Send {
    /// Durably record a batch, returning its sequence number.
    fn append(&mut self, mutations: &[Mutation]) -> StorageResult<u64>;

    /// Last sequence number written, 0 if none.
    fn last_sequence(&self) -> u64;

    /// Bytes appended since open.
    fn bytes_written(&self) -> u64 {
        0
    }

    /// Whether the journal can currently accept appends.
    fn is_writable(&self) -> bool {
        true
    }
}

/// Journal for in-memory databases: counts sequences, stores nothing.
#[derive(Debug, Default)]
pub struct NullJournal {
    last_sequence: u64,
}

impl NullJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Journal for NullJournal {
    fn append(&mut self, _mutations: &[Mutation]) -> StorageResult<u64> {
        self.last_sequence += 1;
        Ok(self.last_sequence)
    }

    fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

/// A decoded journal record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub mutations: Vec<Mutation>,
}

impl JournalRecord {
    /// Encode into the on-disk frame
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        let payload = serde_json::to_vec(&self.mutations).map_err(|e| {
            StorageError::append_failed(
                format!("Failed to encode journal record {}", self.sequence),
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            StorageError::append_failed(
                format!("Journal record {} exceeds 4 GiB", self.sequence),
                io::Error::new(io::ErrorKind::InvalidData, "payload too large"),
            )
        })?;

        let length_bytes = length.to_le_bytes();
        let sequence_bytes = self.sequence.to_le_bytes();
        let checksum = compute_checksum(&[&length_bytes, &sequence_bytes, &payload]);

        let mut frame = Vec::with_capacity(payload.len() + (HEADER_SIZE + CHECKSUM_SIZE) as usize);
        frame.extend_from_slice(&length_bytes);
        frame.extend_from_slice(&sequence_bytes);
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&checksum.to_le_bytes());
        Ok(frame)
    }
}

/// File-backed journal at `<data_dir>/journal/journal.log`.
pub struct FileJournal {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    sync_mode: SyncMode,
    bytes_written: u64,
    /// File length up to the end of the last durable record
    committed_len: u64,
    /// Set when a failed append could not be cut back off the file
    broken: bool,
    #[cfg(test)]
    fail_next_sync: bool,
}

impl FileJournal {
    /// Location of the journal file under a data directory
    pub fn journal_path(data_dir: &Path) -> PathBuf {
        data_dir.join("journal").join("journal.log")
    }

    /// Open (creating if needed) the journal for appending.
    ///
    /// `next_sequence` must be one past the last replayed sequence.
    pub fn open(data_dir: &Path, sync_mode: SyncMode, next_sequence: u64) -> StorageResult<Self> {
        let path = Self::journal_path(data_dir);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                StorageError::append_failed(
                    format!("Failed to create journal directory: {}", dir.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StorageError::append_failed(
                    format!("Failed to open journal file: {}", path.display()),
                    e,
                )
            })?;

        let committed_len = file
            .metadata()
            .map_err(|e| {
                StorageError::append_failed(
                    format!("Failed to read journal metadata: {}", path.display()),
                    e,
                )
            })?
            .len();

        Ok(Self {
            path,
            file,
            next_sequence: next_sequence.max(1),
            sync_mode,
            bytes_written: 0,
            committed_len,
            broken: false,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make the next append fail after its frame reaches the file.
    #[cfg(test)]
    pub(crate) fn fail_next_sync(&mut self) {
        self.fail_next_sync = true;
    }

    fn write_frame(&mut self, frame: &[u8], sequence: u64) -> StorageResult<()> {
        self.file.write_all(frame).map_err(|e| {
            StorageError::append_failed(
                format!("Failed to write journal record {}", sequence),
                e,
            )
        })?;

        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(StorageError::fsync_failed(
                format!("fsync failed after journal record {}", sequence),
                io::Error::new(io::ErrorKind::Other, "injected sync failure"),
            ));
        }

        match self.sync_mode {
            SyncMode::Fsync => self.file.sync_all().map_err(|e| {
                StorageError::fsync_failed(
                    format!("fsync failed after journal record {}", sequence),
                    e,
                )
            }),
            SyncMode::None => self.file.flush().map_err(|e| {
                StorageError::append_failed(
                    format!("Failed to flush journal record {}", sequence),
                    e,
                )
            }),
        }
    }

    /// Cut a failed record off the file so replay never sees it.
    ///
    /// If the file cannot be cut back the journal stops accepting appends.
    fn discard_uncommitted(&mut self) {
        let restored = self
            .file
            .set_len(self.committed_len)
            .and_then(|_| self.file.sync_all());
        if restored.is_err() {
            self.broken = true;
        }
    }
}

impl Journal for FileJournal {
    fn append(&mut self, mutations: &[Mutation]) -> StorageResult<u64> {
        if self.broken {
            return Err(StorageError::append_failed(
                format!("Journal {} holds an undiscarded failed record", self.path().display()),
                io::Error::new(io::ErrorKind::Other, "journal not writable"),
            ));
        }

        let sequence = self.next_sequence;
        let record = JournalRecord {
            sequence,
            mutations: mutations.to_vec(),
        };
        let frame = record.encode()?;

        if let Err(e) = self.write_frame(&frame, sequence) {
            self.discard_uncommitted();
            return Err(e);
        }

        // Only advance once the record is on disk
        self.next_sequence += 1;
        self.committed_len += frame.len() as u64;
        self.bytes_written += frame.len() as u64;
        Ok(sequence)
    }

    fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn is_writable(&self) -> bool {
        !self.broken && self.file.metadata().is_ok()
    }
}

/// Sequential journal reader used for replay.
pub struct JournalReader {
    reader: BufReader<File>,
    offset: u64,
    file_size: u64,
    last_sequence: u64,
}

impl JournalReader {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            StorageError::corruption(format!(
                "Failed to open journal file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| StorageError::corruption(format!("Failed to read journal metadata: {}", e)))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
            file_size,
            last_sequence: 0,
        })
    }

    /// Byte offset of the next record
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Read the next record.
    ///
    /// - `Ok(Some(record))` on success
    /// - `Ok(None)` at a clean end of file
    /// - `Err` on any corruption
    pub fn read_next(&mut self) -> StorageResult<Option<JournalRecord>> {
        if self.offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        if remaining < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(StorageError::corruption_at_offset(
                self.offset,
                format!("Truncated journal: {} trailing bytes", remaining),
            ));
        }

        let mut length_bytes = [0u8; 4];
        let mut sequence_bytes = [0u8; 8];
        self.read_exact(&mut length_bytes)?;
        self.read_exact(&mut sequence_bytes)?;

        let length = u32::from_le_bytes(length_bytes) as u64;
        let sequence = u64::from_le_bytes(sequence_bytes);

        if HEADER_SIZE + length + CHECKSUM_SIZE > remaining {
            return Err(StorageError::corruption_at_offset(
                self.offset,
                format!(
                    "Truncated journal record: declared {} payload bytes, {} available",
                    length,
                    remaining.saturating_sub(HEADER_SIZE + CHECKSUM_SIZE)
                ),
            ));
        }

        let mut payload = vec![0u8; length as usize];
        self.read_exact(&mut payload)?;
        let mut checksum_bytes = [0u8; 4];
        self.read_exact(&mut checksum_bytes)?;
        let checksum = u32::from_le_bytes(checksum_bytes);

        if !verify_checksum(&[&length_bytes, &sequence_bytes, &payload], checksum) {
            return Err(StorageError::corruption_at_offset(
                self.offset,
                "Journal checksum mismatch",
            ));
        }

        if sequence <= self.last_sequence {
            return Err(StorageError::corruption_at_sequence(
                sequence,
                format!(
                    "Non-monotonic journal sequence (previous {})",
                    self.last_sequence
                ),
            ));
        }

        let mutations: Vec<Mutation> = serde_json::from_slice(&payload).map_err(|e| {
            StorageError::corruption_at_sequence(sequence, format!("Undecodable payload: {}", e))
        })?;

        self.offset += HEADER_SIZE + length + CHECKSUM_SIZE;
        self.last_sequence = sequence;

        Ok(Some(JournalRecord {
            sequence,
            mutations,
        }))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        self.reader.read_exact(buf).map_err(|e| {
            StorageError::corruption_at_offset(self.offset, format!("Short read: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DocumentId;
    use tempfile::TempDir;

    fn delete_doc() -> Mutation {
        Mutation::DeleteDocument {
            document_id: DocumentId::new(),
        }
    }

    fn read_all(path: &Path) -> StorageResult<Vec<JournalRecord>> {
        let mut reader = JournalReader::open(path)?;
        let mut records = Vec::new();
        while let Some(record) = reader.read_next()? {
            records.push(record);
        }
        Ok(records)
    }

    #[test]
    fn test_append_then_read_back() {
        let tmp = TempDir::new().unwrap();
        let mut journal = FileJournal::open(tmp.path(), SyncMode::Fsync, 1).unwrap();

        let first = vec![delete_doc()];
        let second = vec![delete_doc(), delete_doc()];
        assert_eq!(journal.append(&first).unwrap(), 1);
        assert_eq!(journal.append(&second).unwrap(), 2);
        assert_eq!(journal.last_sequence(), 2);

        let records = read_all(journal.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mutations, first);
        assert_eq!(records[1].sequence, 2);
        assert_eq!(records[1].mutations, second);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let tmp = TempDir::new().unwrap();
        {
            let mut journal = FileJournal::open(tmp.path(), SyncMode::None, 1).unwrap();
            journal.append(&[delete_doc()]).unwrap();
        }
        let mut journal = FileJournal::open(tmp.path(), SyncMode::None, 2).unwrap();
        assert_eq!(journal.append(&[delete_doc()]).unwrap(), 2);

        let records = read_all(journal.path()).unwrap();
        assert_eq!(records.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_bit_flip_detected() {
        let tmp = TempDir::new().unwrap();
        let mut journal = FileJournal::open(tmp.path(), SyncMode::Fsync, 1).unwrap();
        journal.append(&[delete_doc()]).unwrap();
        let path = journal.path().to_path_buf();
        drop(journal);

        let mut bytes = fs::read(&path).unwrap();
        bytes[20] ^= 0x01;
        fs::write(&path, bytes).unwrap();

        let err = read_all(&path).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("COREF_JOURNAL_CORRUPTION"));
    }

    #[test]
    fn test_truncated_tail_detected() {
        let tmp = TempDir::new().unwrap();
        let mut journal = FileJournal::open(tmp.path(), SyncMode::Fsync, 1).unwrap();
        journal.append(&[delete_doc()]).unwrap();
        journal.append(&[delete_doc()]).unwrap();
        let path = journal.path().to_path_buf();
        drop(journal);

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        assert!(read_all(&path).is_err());
    }

    #[test]
    fn test_failed_append_is_cut_from_file() {
        let tmp = TempDir::new().unwrap();
        let mut journal = FileJournal::open(tmp.path(), SyncMode::Fsync, 1).unwrap();
        journal.append(&[delete_doc()]).unwrap();
        let len_after_first = fs::metadata(journal.path()).unwrap().len();

        journal.fail_next_sync();
        let err = journal.append(&[delete_doc(), delete_doc()]).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(fs::metadata(journal.path()).unwrap().len(), len_after_first);
        assert_eq!(journal.last_sequence(), 1);
        assert!(journal.is_writable());

        assert_eq!(journal.append(&[delete_doc()]).unwrap(), 2);
        let records = read_all(journal.path()).unwrap();
        assert_eq!(records.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(records[1].mutations.len(), 1);
    }

    #[test]
    fn test_unrecoverable_journal_refuses_appends() {
        let tmp = TempDir::new().unwrap();
        let mut journal = FileJournal::open(tmp.path(), SyncMode::None, 1).unwrap();
        journal.broken = true;

        assert!(!journal.is_writable());
        assert!(journal.append(&[delete_doc()]).is_err());
        assert_eq!(fs::metadata(journal.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_reader_tracks_last_sequence() {
        let tmp = TempDir::new().unwrap();
        let mut journal = FileJournal::open(tmp.path(), SyncMode::None, 4).unwrap();
        journal.append(&[delete_doc()]).unwrap();
        journal.append(&[delete_doc()]).unwrap();

        let mut reader = JournalReader::open(journal.path()).unwrap();
        while reader.read_next().unwrap().is_some() {}
        assert_eq!(reader.last_sequence(), 5);
        assert_eq!(reader.offset(), fs::metadata(journal.path()).unwrap().len());
    }

    #[test]
    fn test_null_journal_counts() {
        let mut journal = NullJournal::new();
        assert_eq!(journal.last_sequence(), 0);
        journal.append(&[]).unwrap();
        assert_eq!(journal.append(&[]).unwrap(), 2);
    }

    #[test]
    fn test_sync_mode_parse() {
        assert_eq!(SyncMode::parse("fsync"), Some(SyncMode::Fsync));
        assert_eq!(SyncMode::parse("none"), Some(SyncMode::None));
        assert_eq!(SyncMode::parse("async"), None);
    }
}
