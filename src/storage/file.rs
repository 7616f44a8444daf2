//! Storage backed by one directory on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::error::Result;
use crate::storage::{Storage, StorageConfig, StorageError, StorageInput, StorageOutput};

/// Each file of the index is a plain file in `directory`.
#[derive(Debug)]
pub struct FileStorage {
    directory: PathBuf,
    config: StorageConfig,
    closed: AtomicBool,
}

impl FileStorage {
    /// Open the directory, creating it and its parents if needed.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            debug!("Creating index directory {}", directory.display());
            fs::create_dir_all(&directory)
                .map_err(|e| StorageError::io(format!("creating {}", directory.display()), e))?;
        }
        if !directory.is_dir() {
            return Err(StorageError::IoError(format!(
                "{} is not a directory",
                directory.display()
            ))
            .into());
        }

        Ok(FileStorage {
            directory,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of `name`, failing once the storage is closed.
    fn path(&self, name: &str) -> Result<PathBuf> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::StorageClosed.into());
        }
        Ok(self.directory.join(name))
    }

    fn output(&self, name: &str, options: &OpenOptions) -> Result<Box<dyn StorageOutput>> {
        let file = options
            .open(self.path(name)?)
            .map_err(|e| StorageError::io(format!("opening {name} for writing"), e))?;
        Ok(Box::new(FileOutput {
            writer: BufWriter::with_capacity(self.config.buffer_size, file),
            sync_on_close: self.config.sync_writes,
        }))
    }
}

fn not_found_or(name: &str, context: &str, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::FileNotFound(name.to_string())
    } else {
        StorageError::io(format!("{context} {name}"), err)
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let file = File::open(self.path(name)?).map_err(|e| not_found_or(name, "opening", e))?;
        Ok(Box::new(FileInput {
            reader: BufReader::with_capacity(self.config.buffer_size, file),
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.output(name, OpenOptions::new().write(true).create(true).truncate(true))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.output(name, OpenOptions::new().create(true).append(true))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path(name).map(|path| path.is_file()).unwrap_or(false)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(StorageError::io(format!("deleting {name}"), e).into())
            }
            _ => Ok(()),
        }
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(self.path("")?)
            .map_err(|e| StorageError::io(format!("listing {}", self.directory.display()), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StorageError::io("reading directory entry", e))?
                .path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let metadata = fs::metadata(self.path(name)?).map_err(|e| not_found_or(name, "sizing", e))?;
        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        fs::rename(self.path(old_name)?, self.path(new_name)?)
            .map_err(|e| StorageError::io(format!("renaming {old_name} to {new_name}"), e))?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        let directory = self.path("")?;
        // Renames and deletes are durable only once the directory itself is
        // synced; directories cannot be opened for that on Windows.
        #[cfg(unix)]
        {
            File::open(&directory)
                .and_then(|dir| dir.sync_all())
                .map_err(|e| StorageError::io("syncing index directory", e))?;
        }
        #[cfg(not(unix))]
        let _ = directory;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug)]
struct FileInput {
    reader: BufReader<File>,
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {}

#[derive(Debug)]
struct FileOutput {
    writer: BufWriter<File>,
    sync_on_close: bool,
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.sync_on_close {
            self.flush_and_sync()
        } else {
            Ok(self.writer.flush()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("posts.idx"), StorageConfig::default()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data").join("search").join("posts.idx");
        let storage = FileStorage::new(&root, StorageConfig::default()).unwrap();

        assert!(root.is_dir());
        assert_eq!(storage.directory(), root.as_path());
        assert!(storage.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_plain_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-a-dir");
        fs::write(&path, b"x").unwrap();
        assert!(FileStorage::new(&path, StorageConfig::default()).is_err());
    }

    #[test]
    fn test_append_then_truncate_log() {
        let (_dir, storage) = storage();

        for frame in [b"abc", b"def"] {
            let mut output = storage.create_output_append("wal.log").unwrap();
            output.write_all(frame).unwrap();
            output.close().unwrap();
        }
        assert_eq!(storage.read_file("wal.log").unwrap(), b"abcdef");

        storage.create_output("wal.log").unwrap().close().unwrap();
        assert_eq!(storage.file_size("wal.log").unwrap(), 0);
    }

    #[test]
    fn test_atomic_write_and_cleanup() {
        let (_dir, storage) = storage();
        storage.write_atomic("snapshot.bin", b"data").unwrap();
        assert_eq!(storage.list_files().unwrap(), vec!["snapshot.bin".to_string()]);

        storage.delete_file("snapshot.bin").unwrap();
        storage.delete_file("snapshot.bin").unwrap();
        assert!(!storage.file_exists("snapshot.bin"));
    }

    #[test]
    fn test_missing_file_and_closed_storage() {
        let (_dir, storage) = storage();

        let err = storage.open_input("manifest.json").unwrap_err();
        assert!(err.to_string().contains("File not found: manifest.json"));
        assert!(storage.file_size("manifest.json").is_err());

        storage.close().unwrap();
        assert!(storage.create_output("wal.log").is_err());
        assert!(!storage.file_exists("wal.log"));
    }
}
