//! Storage abstraction the index persists through.
//!
//! The index never touches the file system directly. It writes its manifest,
//! snapshot and write-ahead log as named byte files through a [`Storage`]
//! backend, so the same code runs against a directory on disk
//! ([`file::FileStorage`]) or an ephemeral in-process map
//! ([`memory::MemoryStorage`]).
//!
//! # Example
//!
//! ```
//! use postsearch::storage::Storage;
//! use postsearch::storage::memory::MemoryStorage;
//!
//! # fn main() -> postsearch::error::Result<()> {
//! let storage = MemoryStorage::new();
//! storage.write_atomic("manifest.json", b"{}")?;
//!
//! assert_eq!(storage.read_file("manifest.json")?, b"{}");
//! assert_eq!(storage.list_files()?, vec!["manifest.json".to_string()]);
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PostSearchError, Result};

pub mod file;
pub mod memory;

/// Suffix of the scratch file an atomic write goes through.
pub const TEMP_SUFFIX: &str = ".tmp";

/// A backend that stores and retrieves named byte files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing content.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Open a file for appending, creating it if it does not exist.
    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    fn file_exists(&self, name: &str) -> bool;

    /// Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// All file names, sorted.
    fn list_files(&self) -> Result<Vec<String>>;

    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing the target. Atomic on the file system.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Make directory-level changes (renames, deletes) durable.
    fn sync(&self) -> Result<()>;

    /// Further operations fail after this.
    fn close(&self) -> Result<()>;

    /// The whole content of a file.
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.open_input(name)?.read_all()
    }

    /// Replace `name` with `bytes` so that a crash leaves either the old or
    /// the new content: write and sync a scratch file, rename it over the
    /// target, then sync the directory.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let temp_name = format!("{name}{TEMP_SUFFIX}");

        let mut output = self.create_output(&temp_name)?;
        output.write_all(bytes)?;
        output.flush_and_sync()?;
        output.close()?;

        self.rename_file(&temp_name, name)?;
        self.sync()
    }

    /// Delete scratch files an interrupted [`Storage::write_atomic`] left
    /// behind. Returns how many were removed.
    fn remove_temp_files(&self) -> Result<usize> {
        let stale: Vec<String> = self
            .list_files()?
            .into_iter()
            .filter(|name| name.ends_with(TEMP_SUFFIX))
            .collect();
        for name in &stale {
            self.delete_file(name)?;
        }
        Ok(stale.len())
    }
}

/// A readable file handle.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// A writable file handle.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered data and force it to stable storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Flush and release the handle, syncing if the backend is configured
    /// to.
    fn close(&mut self) -> Result<()>;
}

/// Tuning of the file backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Buffer size of file readers and writers.
    pub buffer_size: usize,

    /// Whether closing an output syncs it to disk.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 64 * 1024,
            sync_writes: true,
        }
    }
}

/// Failures raised by storage backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Storage is closed")]
    StorageClosed,
}

impl StorageError {
    /// Wrap an I/O failure with what was being done.
    pub fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        StorageError::IoError(format!("{context}: {err}"))
    }
}

impl From<StorageError> for PostSearchError {
    fn from(err: StorageError) -> Self {
        PostSearchError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn test_write_atomic_replaces_content() {
        let storage = MemoryStorage::new();
        storage.write_atomic("snapshot.bin", b"v1").unwrap();
        storage.write_atomic("snapshot.bin", b"v2").unwrap();

        assert_eq!(storage.read_file("snapshot.bin").unwrap(), b"v2");
        assert!(!storage.file_exists("snapshot.bin.tmp"));
    }

    #[test]
    fn test_remove_temp_files() {
        let storage = MemoryStorage::new();
        storage.put_file("snapshot.bin.tmp", b"partial".to_vec());
        storage.put_file("manifest.json.tmp", b"{".to_vec());
        storage.put_file("wal.log", Vec::new());

        assert_eq!(storage.remove_temp_files().unwrap(), 2);
        assert_eq!(storage.list_files().unwrap(), vec!["wal.log".to_string()]);
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::FileNotFound("wal.log".to_string());
        assert_eq!(err.to_string(), "File not found: wal.log");

        let err = StorageError::io(
            "renaming snapshot.bin.tmp",
            std::io::Error::other("disk full"),
        );
        assert_eq!(err.to_string(), "I/O error: renaming snapshot.bin.tmp: disk full");

        let err: PostSearchError = StorageError::StorageClosed.into();
        assert_eq!(err.to_string(), "Storage error: Storage is closed");
    }
}
