//! Document snapshot and index manifest.
//!
//! A checkpoint writes the snapshot first, then the manifest, then truncates
//! the WAL. Both files are written to a temporary name and renamed into
//! place, so a crash leaves either the old or the new version.
//!
//! Snapshot layout:
//!
//! ```text
//! [magic "PSNP"][format version: u32 LE][CRC32: u32 LE][length: u64 LE][bincode SnapshotData]
//! ```

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::IndexedDocument;
use crate::error::{PostSearchError, Result};
use crate::index::wal::SeqNumber;
use crate::schema::Schema;
use crate::storage::Storage;

pub const SNAPSHOT_FILE: &str = "snapshot.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

const SNAPSHOT_MAGIC: &[u8; 4] = b"PSNP";
const SNAPSHOT_FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Every live document as of a WAL sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    /// WAL records up to and including this sequence are reflected here.
    pub last_wal_seq: SeqNumber,
    /// Live documents in ordinal order.
    pub documents: Vec<IndexedDocument>,
}

/// Index-level metadata, human readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub schema: Schema,
    #[serde(default)]
    pub snapshot_wal_seq: SeqNumber,
    #[serde(default)]
    pub document_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Manifest of a freshly created, empty index.
    pub fn new(schema: Schema) -> Self {
        let now = Utc::now();
        IndexManifest {
            format_version: MANIFEST_FORMAT_VERSION,
            schema,
            snapshot_wal_seq: 0,
            document_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read the manifest, if the index has one.
    pub fn read(storage: &dyn Storage) -> Result<Option<Self>> {
        if !storage.file_exists(MANIFEST_FILE) {
            return Ok(None);
        }

        let bytes = storage.read_file(MANIFEST_FILE)?;
        let manifest: IndexManifest = serde_json::from_slice(&bytes)?;
        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(PostSearchError::index(format!(
                "unsupported manifest format version {} (expected {})",
                manifest.format_version, MANIFEST_FORMAT_VERSION
            )));
        }

        Ok(Some(manifest))
    }

    /// Write the manifest atomically.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        storage.write_atomic(MANIFEST_FILE, &bytes)
    }
}

/// Write the snapshot atomically.
pub fn write_snapshot(storage: &dyn Storage, data: &SnapshotData) -> Result<()> {
    let payload = bincode::serialize(data)?;

    let mut bytes = Vec::with_capacity(payload.len() + 20);
    bytes.write_all(SNAPSHOT_MAGIC)?;
    bytes.write_u32::<LittleEndian>(SNAPSHOT_FORMAT_VERSION)?;
    bytes.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
    bytes.write_u64::<LittleEndian>(payload.len() as u64)?;
    bytes.extend_from_slice(&payload);

    storage.write_atomic(SNAPSHOT_FILE, &bytes)
}

/// Read the snapshot, if one was ever written.
pub fn read_snapshot(storage: &dyn Storage) -> Result<Option<SnapshotData>> {
    if !storage.file_exists(SNAPSHOT_FILE) {
        return Ok(None);
    }

    let bytes = storage.read_file(SNAPSHOT_FILE)?;
    let mut cursor = Cursor::new(bytes.as_slice());

    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| PostSearchError::index("snapshot is truncated"))?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(PostSearchError::index("snapshot has an invalid header"));
    }

    let version = cursor.read_u32::<LittleEndian>()?;
    if version != SNAPSHOT_FORMAT_VERSION {
        return Err(PostSearchError::index(format!(
            "unsupported snapshot format version {version}"
        )));
    }

    let expected_crc = cursor.read_u32::<LittleEndian>()?;
    let len = cursor.read_u64::<LittleEndian>()? as usize;
    let start = cursor.position() as usize;
    let payload = bytes
        .get(start..start + len)
        .ok_or_else(|| PostSearchError::index("snapshot is truncated"))?;

    if crc32fast::hash(payload) != expected_crc {
        return Err(PostSearchError::index("snapshot checksum mismatch"));
    }

    Ok(Some(bincode::deserialize(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn document(id: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            title: "t".to_string(),
            description: String::new(),
            body: String::new(),
            category: "c".to_string(),
            owner_id: "u".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_write_read() {
        let storage = MemoryStorage::new();
        assert!(read_snapshot(&storage).unwrap().is_none());

        let data = SnapshotData {
            last_wal_seq: 42,
            documents: vec![document("a"), document("b")],
        };
        write_snapshot(&storage, &data).unwrap();

        assert!(!storage.file_exists("snapshot.bin.tmp"));
        assert_eq!(read_snapshot(&storage).unwrap(), Some(data));
    }

    #[test]
    fn test_corrupt_snapshot() {
        let storage = MemoryStorage::new();
        write_snapshot(&storage, &SnapshotData::default()).unwrap();

        let mut bytes = storage.read_file(SNAPSHOT_FILE).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        storage.put_file(SNAPSHOT_FILE, bytes);
        assert!(read_snapshot(&storage).is_err());

        storage.put_file(SNAPSHOT_FILE, b"XX".to_vec());
        assert!(read_snapshot(&storage).unwrap_err().is_io_failure());
    }

    #[test]
    fn test_manifest_round_trip_and_version_check() {
        let storage = MemoryStorage::new();
        assert!(IndexManifest::read(&storage).unwrap().is_none());

        let mut manifest = IndexManifest::new(Schema::posts());
        manifest.snapshot_wal_seq = 7;
        manifest.write(&storage).unwrap();
        assert_eq!(IndexManifest::read(&storage).unwrap(), Some(manifest.clone()));

        manifest.format_version = 99;
        manifest.write(&storage).unwrap();
        assert!(IndexManifest::read(&storage).is_err());
    }
}
