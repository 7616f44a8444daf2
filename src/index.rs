//! The Index Store: a durable, embedded inverted index over posts.
//!
//! An [`IndexHandle`] is opened once per index directory and shared by
//! cloning. Writes are logged to the write-ahead log before they touch the
//! in-memory [`InvertedIndex`]; checkpoints fold the log into a snapshot.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use postsearch::document::IndexedDocument;
//! use postsearch::index::IndexHandle;
//! use postsearch::query::TermQuery;
//!
//! # fn main() -> postsearch::error::Result<()> {
//! let index = IndexHandle::open_in_memory()?;
//! index.upsert(IndexedDocument {
//!     id: "p1".to_string(),
//!     title: "Rust tips".to_string(),
//!     description: String::new(),
//!     body: String::new(),
//!     category: "dev".to_string(),
//!     owner_id: "u1".to_string(),
//!     created_at: Utc::now(),
//! })?;
//!
//! let result = index.search(&TermQuery::new("title", "rust"), 10, 0)?;
//! assert_eq!(result.ids(), vec!["p1".to_string()]);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::document::IndexedDocument;
use crate::error::{PostSearchError, Result};
use crate::index::inverted::{AnalyzedDocument, InvertedIndex};
use crate::index::reader::IndexReader;
use crate::index::snapshot::{IndexManifest, SnapshotData, read_snapshot, write_snapshot};
use crate::index::wal::{SeqNumber, WAL_FILE, WalEntry, WalManager};
use crate::query::{Query, SearchResult, TopDocsCollector};
use crate::schema::Schema;
use crate::storage::file::FileStorage;
use crate::storage::memory::MemoryStorage;
use crate::storage::{Storage, StorageConfig};

pub mod inverted;
pub mod reader;
pub mod snapshot;
pub mod wal;

/// Index Store tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Logged operations after which a checkpoint runs automatically.
    pub wal_checkpoint_ops: usize,
    /// Deleted ordinals needed before compaction is considered.
    pub compaction_min_deleted: usize,
    pub storage: StorageConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            wal_checkpoint_ops: 1000,
            compaction_min_deleted: 64,
            storage: StorageConfig::default(),
        }
    }
}

/// A point-in-time view of index health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub document_count: u64,
    /// Deleted ordinals still occupying posting lists.
    pub deleted_pending: usize,
    pub wal_pending_records: usize,
    pub wal_bytes: u64,
    /// Distinct terms per field.
    pub term_counts: BTreeMap<String, usize>,
    pub schema_version: u32,
    pub last_checkpoint_seq: SeqNumber,
    pub path: Option<PathBuf>,
}

/// Outcome of a batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub indexed: usize,
    /// Documents that failed analysis and were not logged.
    pub failed: usize,
}

/// Shared handle to an index.
///
/// Clones refer to the same index. Every operation fails with
/// [`PostSearchError::NotInitialized`] until the handle was opened, and
/// again once any clone closed it.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    inner: Arc<RwLock<Option<Arc<OpenIndex>>>>,
}

impl IndexHandle {
    /// A handle with no index behind it.
    pub fn unopened() -> Self {
        IndexHandle {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Open the index at `path`, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &IndexConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        let path = path.as_ref();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(path, config.storage.clone())?);
        let open = OpenIndex::open(storage, true, Some(path.to_path_buf()), config.clone())?;
        Ok(Self::wrap(open))
    }

    /// Open over a caller-owned storage. Closing the index leaves the
    /// storage open, so it can be reopened.
    pub fn open_with_storage(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        let open = OpenIndex::open(storage, false, None, config)?;
        Ok(Self::wrap(open))
    }

    /// Open an ephemeral index that lives in memory.
    pub fn open_in_memory() -> Result<Self> {
        let config = IndexConfig::default();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let open = OpenIndex::open(storage, true, None, config)?;
        Ok(Self::wrap(open))
    }

    fn wrap(open: OpenIndex) -> Self {
        IndexHandle {
            inner: Arc::new(RwLock::new(Some(Arc::new(open)))),
        }
    }

    fn current(&self) -> Result<Arc<OpenIndex>> {
        let open = self
            .inner
            .read()
            .clone()
            .ok_or(PostSearchError::NotInitialized)?;
        open.ensure_open()?;
        Ok(open)
    }

    pub fn is_open(&self) -> bool {
        self.current().is_ok()
    }

    /// Checkpoint and close the index for every clone of this handle.
    pub fn close(&self) -> Result<()> {
        let open = self
            .inner
            .write()
            .take()
            .ok_or(PostSearchError::NotInitialized)?;
        open.close()
    }

    /// Number of live documents.
    pub fn document_count(&self) -> Result<u64> {
        Ok(self.current()?.index.read().doc_count())
    }

    /// Insert or fully replace a document.
    pub fn upsert(&self, document: IndexedDocument) -> Result<()> {
        self.current()?.upsert(document)
    }

    /// Insert or replace many documents, analyzing them in parallel.
    /// Documents that fail analysis are skipped and counted.
    pub fn upsert_batch(&self, documents: Vec<IndexedDocument>) -> Result<BatchOutcome> {
        self.current()?.upsert_batch(documents)
    }

    /// Delete a document. Returns whether it was present.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.current()?.delete(id)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.current()?.index.read().contains(id))
    }

    /// Stored copy of a document.
    pub fn get(&self, id: &str) -> Result<Option<IndexedDocument>> {
        Ok(self.current()?.index.read().document(id).cloned())
    }

    /// Rank every match of `query` and return the page at
    /// `offset..offset + limit` together with the total match count.
    pub fn search(&self, query: &dyn Query, limit: usize, offset: usize) -> Result<SearchResult> {
        self.current()?.search(query, limit, offset)
    }

    /// Write a checkpoint now.
    pub fn commit(&self) -> Result<()> {
        let open = self.current()?;
        let _writer = open.writer.lock();
        open.checkpoint_locked()
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.current()?.stats()
    }

    pub fn schema(&self) -> Result<Schema> {
        Ok(self.current()?.schema.clone())
    }
}

#[derive(Debug)]
struct OpenIndex {
    storage: Arc<dyn Storage>,
    owns_storage: bool,
    path: Option<PathBuf>,
    schema: Schema,
    analyzer: PerFieldAnalyzer,
    config: IndexConfig,
    index: RwLock<InvertedIndex>,
    wal: WalManager,
    manifest: Mutex<IndexManifest>,
    /// Serializes writers and checkpoints.
    writer: Mutex<()>,
    closed: AtomicBool,
}

impl OpenIndex {
    fn open(
        storage: Arc<dyn Storage>,
        owns_storage: bool,
        path: Option<PathBuf>,
        config: IndexConfig,
    ) -> Result<Self> {
        let schema = Schema::posts();
        let analyzer = schema.analyzer();

        let removed = storage.remove_temp_files()?;
        if removed > 0 {
            warn!("Removed {removed} temporary files left by an interrupted checkpoint");
        }

        let manifest = match IndexManifest::read(storage.as_ref())? {
            Some(manifest) => {
                schema.ensure_compatible(&manifest.schema)?;
                manifest
            }
            None => {
                info!("Creating new index at {}", display_path(&path));
                let manifest = IndexManifest::new(schema.clone());
                manifest.write(storage.as_ref())?;
                storage.sync()?;
                manifest
            }
        };

        let mut index = InvertedIndex::new();
        let snapshot_seq = match read_snapshot(storage.as_ref())? {
            Some(snapshot) => {
                for analyzed in AnalyzedDocument::analyze_all(&schema, &analyzer, snapshot.documents)
                {
                    index.upsert(analyzed?);
                }
                snapshot.last_wal_seq
            }
            None => 0,
        };

        let wal = WalManager::new(Arc::clone(&storage), WAL_FILE);
        let contents = wal.read_all()?;
        let mut replayed = 0usize;
        for record in &contents.records {
            if record.seq <= snapshot_seq {
                continue;
            }
            match &record.entry {
                WalEntry::Upsert { document } => {
                    let analyzed = AnalyzedDocument::analyze(&schema, &analyzer, document.clone())?;
                    index.upsert(analyzed);
                }
                WalEntry::Delete { id } => {
                    index.delete(id);
                }
            }
            replayed += 1;
        }
        wal.set_next_seq(snapshot_seq.max(wal.last_seq()) + 1);

        let open = OpenIndex {
            storage,
            owns_storage,
            path,
            schema,
            analyzer,
            config,
            index: RwLock::new(index),
            wal,
            manifest: Mutex::new(manifest),
            writer: Mutex::new(()),
            closed: AtomicBool::new(false),
        };

        if replayed > 0 {
            info!("Replayed {replayed} write-ahead log records");
        }
        if !contents.records.is_empty() || contents.torn_bytes > 0 {
            let _writer = open.writer.lock();
            open.checkpoint_locked()?;
        }

        let count = open.index.read().doc_count();
        info!(
            "Opened index at {} with {count} documents",
            display_path(&open.path)
        );
        if count == 0 {
            warn!("Index is empty; documents need to be indexed");
        }

        Ok(open)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(PostSearchError::NotInitialized)
        } else {
            Ok(())
        }
    }

    fn upsert(&self, document: IndexedDocument) -> Result<()> {
        let analyzed = AnalyzedDocument::analyze(&self.schema, &self.analyzer, document)?;

        let _writer = self.writer.lock();
        self.ensure_open()?;
        self.wal.append(WalEntry::Upsert {
            document: analyzed.document.clone(),
        })?;
        self.index.write().upsert(analyzed);
        self.after_write()
    }

    fn upsert_batch(&self, documents: Vec<IndexedDocument>) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let analyzed = AnalyzedDocument::analyze_all(&self.schema, &self.analyzer, documents);

        let _writer = self.writer.lock();
        self.ensure_open()?;
        for result in analyzed {
            match result {
                Ok(analyzed) => {
                    self.wal.append(WalEntry::Upsert {
                        document: analyzed.document.clone(),
                    })?;
                    self.index.write().upsert(analyzed);
                    outcome.indexed += 1;
                }
                Err(e) => {
                    warn!("Skipping document that failed analysis: {e}");
                    outcome.failed += 1;
                }
            }
        }
        self.after_write()?;

        Ok(outcome)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let _writer = self.writer.lock();
        self.ensure_open()?;
        if !self.index.read().contains(id) {
            return Ok(false);
        }

        self.wal.append(WalEntry::Delete { id: id.to_string() })?;
        self.index.write().delete(id);
        self.after_write()?;
        Ok(true)
    }

    /// Compaction and automatic checkpoint. Requires the writer lock.
    fn after_write(&self) -> Result<()> {
        {
            let mut index = self.index.write();
            let deleted = index.deleted_count();
            if deleted >= self.config.compaction_min_deleted && deleted as u64 > index.doc_count() {
                debug!("Compacting index with {deleted} deleted ordinals");
                index.compact();
            }
        }

        if self.wal.pending_records() >= self.config.wal_checkpoint_ops {
            self.checkpoint_locked()?;
        }
        Ok(())
    }

    /// Snapshot, manifest, then WAL truncation. Requires the writer lock.
    fn checkpoint_locked(&self) -> Result<()> {
        let seq = self.wal.last_seq();
        let documents = self.index.read().documents();
        let document_count = documents.len() as u64;

        write_snapshot(
            self.storage.as_ref(),
            &SnapshotData {
                last_wal_seq: seq,
                documents,
            },
        )?;

        {
            let mut manifest = self.manifest.lock();
            manifest.snapshot_wal_seq = seq;
            manifest.document_count = document_count;
            manifest.updated_at = Utc::now();
            manifest.write(self.storage.as_ref())?;
        }

        self.wal.truncate()?;
        self.storage.sync()?;
        debug!("Checkpoint at sequence {seq} with {document_count} documents");
        Ok(())
    }

    fn search(&self, query: &dyn Query, limit: usize, offset: usize) -> Result<SearchResult> {
        let index = self.index.read();
        let scores = query.execute(&*index)?;

        let mut collector = TopDocsCollector::new(offset.saturating_add(limit));
        collector.collect_all(&scores);
        let result = collector.into_result(&*index, offset);

        debug!(
            "Query {} matched {} documents",
            query.description(),
            result.total
        );
        Ok(result)
    }

    fn stats(&self) -> Result<IndexStats> {
        let (document_count, deleted_pending, term_counts) = {
            let index = self.index.read();
            (index.doc_count(), index.deleted_count(), index.term_counts())
        };

        Ok(IndexStats {
            document_count,
            deleted_pending,
            wal_pending_records: self.wal.pending_records(),
            wal_bytes: self.wal.size_bytes()?,
            term_counts,
            schema_version: self.schema.version,
            last_checkpoint_seq: self.manifest.lock().snapshot_wal_seq,
            path: self.path.clone(),
        })
    }

    fn close(&self) -> Result<()> {
        let _writer = self.writer.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(PostSearchError::NotInitialized);
        }

        self.checkpoint_locked()?;
        self.wal.close()?;
        if self.owns_storage {
            self.storage.close()?;
        }
        info!("Closed index at {}", display_path(&self.path));
        Ok(())
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string())
}
