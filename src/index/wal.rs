//! Write-ahead log for index mutations.
//!
//! Every upsert and delete is appended here, and synced, before it is
//! applied in memory. Frames are laid out as:
//!
//! ```text
//! [payload length: u32 LE][CRC32 of payload: u32 LE][bincode WalRecord]
//! ```
//!
//! A frame cut short at the end of the file is the signature of a crash
//! mid-append and is ignored. A complete frame whose checksum does not match
//! means the log is corrupt, and reading fails.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::document::IndexedDocument;
use crate::error::{PostSearchError, Result};
use crate::storage::{Storage, StorageOutput};

pub type SeqNumber = u64;

/// Default WAL file name inside the index directory.
pub const WAL_FILE: &str = "wal.log";

const FRAME_HEADER_LEN: usize = 8;

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalEntry {
    /// Insert or fully replace a document.
    Upsert { document: IndexedDocument },
    /// Delete a document by identifier.
    Delete { id: String },
}

/// A WAL entry with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: SeqNumber,
    pub entry: WalEntry,
}

/// Result of reading the whole log.
#[derive(Debug, Default)]
pub struct WalContents {
    pub records: Vec<WalRecord>,
    /// Bytes of an incomplete trailing frame that were ignored.
    pub torn_bytes: u64,
}

/// Appends to and reads back the write-ahead log.
#[derive(Debug)]
pub struct WalManager {
    storage: Arc<dyn Storage>,
    name: String,
    writer: Mutex<Option<Box<dyn StorageOutput>>>,
    next_seq: AtomicU64,
    records_since_truncate: AtomicUsize,
}

impl WalManager {
    /// Create a WAL manager over `name` in `storage`.
    pub fn new(storage: Arc<dyn Storage>, name: &str) -> Self {
        WalManager {
            storage,
            name: name.to_string(),
            writer: Mutex::new(None),
            next_seq: AtomicU64::new(1),
            records_since_truncate: AtomicUsize::new(0),
        }
    }

    /// Set the next sequence number (e.g. after loading a snapshot).
    pub fn set_next_seq(&self, seq: SeqNumber) {
        self.next_seq.store(seq, Ordering::SeqCst);
    }

    /// Get the last used sequence number.
    pub fn last_seq(&self) -> SeqNumber {
        self.next_seq.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Records appended since the log was last truncated, including
    /// records that were found in the file at open.
    pub fn pending_records(&self) -> usize {
        self.records_since_truncate.load(Ordering::SeqCst)
    }

    /// Size of the log file in bytes.
    pub fn size_bytes(&self) -> Result<u64> {
        if self.storage.file_exists(&self.name) {
            self.storage.file_size(&self.name)
        } else {
            Ok(0)
        }
    }

    /// Append an entry and sync it to storage. Returns the assigned
    /// sequence number.
    pub fn append(&self, entry: WalEntry) -> Result<SeqNumber> {
        let mut writer_guard = self.writer.lock();
        if writer_guard.is_none() {
            *writer_guard = Some(self.storage.create_output_append(&self.name)?);
        }

        let seq = self.next_seq.load(Ordering::SeqCst);
        let record = WalRecord { seq, entry };
        let payload = bincode::serialize(&record)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| PostSearchError::index("WAL record exceeds 4 GiB"))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.write_u32::<LittleEndian>(len)?;
        frame.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
        frame.extend_from_slice(&payload);

        if let Some(writer) = writer_guard.as_mut() {
            writer.write_all(&frame)?;
            writer.flush_and_sync()?;
        }

        self.next_seq.store(seq + 1, Ordering::SeqCst);
        self.records_since_truncate.fetch_add(1, Ordering::SeqCst);
        Ok(seq)
    }

    /// Read every complete record. Also advances the next sequence number
    /// past the highest one read.
    pub fn read_all(&self) -> Result<WalContents> {
        if !self.storage.file_exists(&self.name) {
            return Ok(WalContents::default());
        }

        let bytes = self.storage.read_file(&self.name)?;
        let total = bytes.len();
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut contents = WalContents::default();

        loop {
            let offset = cursor.position() as usize;
            let remaining = total - offset;
            if remaining == 0 {
                break;
            }
            if remaining < FRAME_HEADER_LEN {
                contents.torn_bytes = remaining as u64;
                break;
            }

            let len = cursor.read_u32::<LittleEndian>()? as usize;
            let expected_crc = cursor.read_u32::<LittleEndian>()?;
            if remaining - FRAME_HEADER_LEN < len {
                contents.torn_bytes = remaining as u64;
                break;
            }

            let mut payload = vec![0u8; len];
            cursor.read_exact(&mut payload)?;

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                return Err(PostSearchError::index(format!(
                    "WAL checksum mismatch in {} at offset {offset}: expected {expected_crc:#010x}, found {actual_crc:#010x}",
                    self.name
                )));
            }

            let record: WalRecord = bincode::deserialize(&payload)?;
            contents.records.push(record);
        }

        if contents.torn_bytes > 0 {
            warn!(
                "Ignoring {} bytes of incomplete trailing record in {}",
                contents.torn_bytes, self.name
            );
        }

        if let Some(max_seq) = contents.records.iter().map(|r| r.seq).max() {
            if max_seq >= self.next_seq.load(Ordering::SeqCst) {
                self.next_seq.store(max_seq + 1, Ordering::SeqCst);
            }
        }
        self.records_since_truncate
            .store(contents.records.len(), Ordering::SeqCst);

        Ok(contents)
    }

    /// Truncate (clear) the log. Called after a successful checkpoint.
    pub fn truncate(&self) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        if let Some(mut writer) = writer_guard.take() {
            writer.close()?;
        }

        let mut writer = self.storage.create_output(&self.name)?;
        writer.close()?;

        self.records_since_truncate.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Close the open append handle, if any.
    pub fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use chrono::Utc;

    fn document(id: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            title: format!("title {id}"),
            description: String::new(),
            body: String::new(),
            category: "misc".to_string(),
            owner_id: "u1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_wal_append_read_truncate() {
        let storage = Arc::new(MemoryStorage::new());
        let wal = WalManager::new(storage.clone(), WAL_FILE);

        let seq1 = wal
            .append(WalEntry::Upsert {
                document: document("p1"),
            })
            .unwrap();
        let seq2 = wal
            .append(WalEntry::Delete {
                id: "p1".to_string(),
            })
            .unwrap();
        assert_eq!((seq1, seq2), (1, 2));
        assert_eq!(wal.last_seq(), 2);
        assert_eq!(wal.pending_records(), 2);

        let reopened = WalManager::new(storage.clone(), WAL_FILE);
        let contents = reopened.read_all().unwrap();
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.torn_bytes, 0);
        assert_eq!(contents.records[1].entry, WalEntry::Delete { id: "p1".to_string() });
        assert_eq!(reopened.last_seq(), 2);

        wal.truncate().unwrap();
        assert_eq!(wal.size_bytes().unwrap(), 0);
        assert_eq!(wal.pending_records(), 0);

        // Sequence numbers keep growing across truncation.
        let seq3 = wal.append(WalEntry::Delete { id: "p2".to_string() }).unwrap();
        assert_eq!(seq3, 3);
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        let wal = WalManager::new(storage.clone(), WAL_FILE);
        wal.append(WalEntry::Upsert {
            document: document("p1"),
        })
        .unwrap();
        wal.close().unwrap();

        let mut bytes = storage.read_file(WAL_FILE).unwrap();
        let full_len = bytes.len();
        // Half of a second frame.
        let half = bytes[..full_len / 2].to_vec();
        bytes.extend_from_slice(&half);
        storage.put_file(WAL_FILE, bytes);

        let contents = WalManager::new(storage, WAL_FILE).read_all().unwrap();
        assert_eq!(contents.records.len(), 1);
        assert_eq!(contents.torn_bytes, (full_len / 2) as u64);
    }

    #[test]
    fn test_checksum_mismatch_fails() {
        let storage = Arc::new(MemoryStorage::new());
        let wal = WalManager::new(storage.clone(), WAL_FILE);
        wal.append(WalEntry::Delete {
            id: "p1".to_string(),
        })
        .unwrap();
        wal.close().unwrap();

        let mut bytes = storage.read_file(WAL_FILE).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        storage.put_file(WAL_FILE, bytes);

        let err = WalManager::new(storage, WAL_FILE).read_all().unwrap_err();
        assert!(err.is_io_failure());
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
