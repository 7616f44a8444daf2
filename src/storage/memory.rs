//! Storage held in process memory, for tests and ephemeral indexes.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::{Storage, StorageError, StorageInput, StorageOutput};

type Files = Arc<Mutex<AHashMap<String, Vec<u8>>>>;

/// Files kept in a shared map.
///
/// Clones share the files but not the closed flag, so a test can close an
/// index over one clone and reopen it over another, as if from the same
/// disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Files,
    closed: AtomicBool,
}

impl Clone for MemoryStorage {
    fn clone(&self) -> Self {
        MemoryStorage {
            files: Arc::clone(&self.files),
            closed: AtomicBool::new(false),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a file directly, bypassing outputs. Tests use this to
    /// plant torn or corrupted files.
    pub fn put_file(&self, name: &str, data: Vec<u8>) {
        self.files.lock().insert(name.to_string(), data);
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::StorageClosed.into())
        } else {
            Ok(())
        }
    }

    fn output(&self, name: &str, initial: Vec<u8>) -> Box<dyn StorageOutput> {
        Box::new(MemoryOutput {
            name: name.to_string(),
            buffer: initial,
            files: Arc::clone(&self.files),
            closed: false,
        })
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_open()?;
        let data = self
            .files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;
        Ok(Box::new(MemoryInput(Cursor::new(data))))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_open()?;
        // Truncate eagerly, as opening with O_TRUNC does.
        self.files.lock().insert(name.to_string(), Vec::new());
        Ok(self.output(name, Vec::new()))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_open()?;
        let existing = self.files.lock().get(name).cloned().unwrap_or_default();
        Ok(self.output(name, existing))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.check_open().is_ok() && self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_open()?;
        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_open()?;
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.check_open()?;
        self.files
            .lock()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.check_open()?;
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.check_open()
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryInput(Cursor<Vec<u8>>);

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl StorageInput for MemoryInput {}

/// Written bytes become visible to readers on `flush_and_sync` or `close`,
/// the way unsynced data may be lost on a real disk.
#[derive(Debug)]
struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    files: Files,
    closed: bool,
}

impl MemoryOutput {
    fn publish(&self) {
        if !self.closed {
            self.files.lock().insert(self.name.clone(), self.buffer.clone());
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other(format!("{} is closed", self.name)));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.publish();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.publish();
        self.closed = true;
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        self.publish();
    }
}
