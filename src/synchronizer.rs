//! Keeping the index in step with the primary store.
//!
//! The primary store's write path calls the `on_*` hooks after a mutation
//! commits. Each hook turns the mutation into an [`IndexJob`] and queues it
//! without waiting; a fixed pool of worker threads applies the jobs to the
//! index. Jobs are not retried and carry no version, so two jobs for the
//! same post race and whichever reaches the index last wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{PostSearchError, Result};
use crate::index::IndexHandle;
use crate::mapper::{DocumentMapper, Mapped};
use crate::primary::PrimaryStore;
use crate::record::Post;

pub mod reindex;

pub use reindex::{ReindexReport, reindex_all};

/// A unit of indexing work.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexJob {
    /// Map the post and index it, or remove it if it is no longer visible.
    Upsert(Post),
    /// Remove the post with this identifier.
    Delete(String),
}

impl IndexJob {
    pub fn id(&self) -> &str {
        match self {
            IndexJob::Upsert(post) => &post.post_id,
            IndexJob::Delete(id) => id,
        }
    }
}

/// What applying a job did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Indexed,
    Removed,
    /// Nothing to do: the post is invisible and was not indexed.
    Skipped,
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynchronizerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        let indexing = crate::config::IndexingConfig::default();
        SynchronizerConfig {
            workers: indexing.workers,
            queue_capacity: indexing.queue_capacity,
        }
    }
}

impl From<&crate::config::IndexingConfig> for SynchronizerConfig {
    fn from(config: &crate::config::IndexingConfig) -> Self {
        SynchronizerConfig {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Job counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Jobs accepted into the queue.
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    /// Jobs refused because the queue was full or shut down.
    pub rejected: u64,
    /// Accepted jobs not yet finished.
    pub pending: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    pending: AtomicU64,
}

/// Background indexer fed by the primary store's write path.
#[derive(Debug)]
pub struct IndexSynchronizer {
    index: IndexHandle,
    mapper: DocumentMapper,
    config: SynchronizerConfig,
    sender: Mutex<Option<Sender<IndexJob>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl IndexSynchronizer {
    /// Start the worker pool.
    pub fn new(index: IndexHandle, config: SynchronizerConfig) -> Result<Self> {
        if config.workers == 0 || config.queue_capacity == 0 {
            return Err(PostSearchError::invalid_config(
                "synchronizer needs at least one worker and a non-empty queue",
            ));
        }

        let (sender, receiver) = bounded(config.queue_capacity);
        let counters = Arc::new(Counters::default());
        let mapper = DocumentMapper::new();

        let mut workers = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            workers.push(Self::spawn_worker(
                worker_id,
                receiver.clone(),
                index.clone(),
                mapper,
                Arc::clone(&counters),
            )?);
        }

        info!(
            "Started index synchronizer with {} workers and queue capacity {}",
            config.workers, config.queue_capacity
        );

        Ok(IndexSynchronizer {
            index,
            mapper,
            config,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
        })
    }

    fn spawn_worker(
        worker_id: usize,
        receiver: Receiver<IndexJob>,
        index: IndexHandle,
        mapper: DocumentMapper,
        counters: Arc<Counters>,
    ) -> Result<thread::JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name(format!("postsearch-indexer-{worker_id}"))
            .spawn(move || {
                // Ends once every sender is dropped and the queue is drained.
                while let Ok(job) = receiver.recv() {
                    let id = job.id().to_string();
                    match apply_job(&index, &mapper, job) {
                        Ok(outcome) => {
                            debug!("Indexing job for {id}: {outcome:?}");
                            counters.completed.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            error!("Indexing job for {id} failed: {e}");
                            counters.failed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    counters.pending.fetch_sub(1, Ordering::SeqCst);
                }
            })?;
        Ok(handle)
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    pub fn config(&self) -> SynchronizerConfig {
        self.config
    }

    /// Queue a job without blocking.
    pub fn try_submit(&self, job: IndexJob) -> Result<()> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            self.counters.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(PostSearchError::other("index synchronizer is shut down"));
        };

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        match sender.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.counters.pending.fetch_sub(1, Ordering::SeqCst);
                self.counters.rejected.fetch_add(1, Ordering::SeqCst);
                match e {
                    TrySendError::Full(_) => Err(PostSearchError::QueueFull(sender.len())),
                    TrySendError::Disconnected(_) => {
                        Err(PostSearchError::other("index synchronizer workers have stopped"))
                    }
                }
            }
        }
    }

    /// Queue a job from the write path. Never fails: a rejected job is
    /// logged and counted. Returns whether the job was queued.
    fn enqueue(&self, job: IndexJob) -> bool {
        let id = job.id().to_string();
        match self.try_submit(job) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropped indexing job for {id}: {e}");
                false
            }
        }
    }

    /// A post was created.
    pub fn on_created(&self, post: &Post) -> bool {
        self.enqueue(IndexJob::Upsert(post.clone()))
    }

    /// A post was updated, possibly changing its visibility.
    pub fn on_updated(&self, post: &Post) -> bool {
        self.enqueue(IndexJob::Upsert(post.clone()))
    }

    /// A scheduled post was published.
    pub fn on_published(&self, post: &Post) -> bool {
        self.enqueue(IndexJob::Upsert(post.clone()))
    }

    /// A post was deleted.
    pub fn on_deleted(&self, id: &str) -> bool {
        self.enqueue(IndexJob::Delete(id.to_string()))
    }

    /// Apply one job on the calling thread.
    pub fn apply(&self, job: IndexJob) -> Result<JobOutcome> {
        apply_job(&self.index, &self.mapper, job)
    }

    /// Reindex every visible post of the primary store.
    pub fn reindex_all(&self, primary: &dyn PrimaryStore, batch_size: usize) -> Result<ReindexReport> {
        reindex_all(&self.index, primary, batch_size)
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            submitted: self.counters.submitted.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            rejected: self.counters.rejected.load(Ordering::SeqCst),
            pending: self.counters.pending.load(Ordering::SeqCst),
        }
    }

    /// Wait until every accepted job has finished. Returns false if the
    /// timeout elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.counters.pending.load(Ordering::SeqCst) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
        true
    }

    /// Stop accepting jobs, drain the queue and join the workers.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        for worker in self.workers.lock().drain(..) {
            if worker.join().is_err() {
                error!("Index synchronizer worker panicked");
            }
        }

        let stats = self.stats();
        info!(
            "Index synchronizer stopped: {} completed, {} failed, {} rejected",
            stats.completed, stats.failed, stats.rejected
        );
    }
}

impl Drop for IndexSynchronizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Apply one job to the index.
fn apply_job(index: &IndexHandle, mapper: &DocumentMapper, job: IndexJob) -> Result<JobOutcome> {
    match job {
        IndexJob::Upsert(post) => match mapper.map(&post) {
            Mapped::Document(document) => {
                index.upsert(document)?;
                Ok(JobOutcome::Indexed)
            }
            Mapped::Skip => remove(index, &post.post_id),
        },
        IndexJob::Delete(id) => remove(index, &id),
    }
}

fn remove(index: &IndexHandle, id: &str) -> Result<JobOutcome> {
    if index.delete(id)? {
        Ok(JobOutcome::Removed)
    } else {
        Ok(JobOutcome::Skipped)
    }
}
