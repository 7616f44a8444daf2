//! Bulk reindex from the primary store.

use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{PostSearchError, Result};
use crate::index::IndexHandle;
use crate::mapper::{DocumentMapper, Mapped};
use crate::primary::PrimaryStore;

/// Summary of a bulk reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexReport {
    /// Records read from the primary store.
    pub seen: usize,
    pub indexed: usize,
    /// Records that mapped to nothing because they are not visible.
    pub skipped: usize,
    pub failed: usize,
    /// Live documents after the reindex.
    pub document_count: u64,
}

/// Upsert every visible record of `primary` in batches of `batch_size`,
/// then checkpoint.
///
/// Running it twice yields the same index. Documents the scan does not
/// return are left alone, so it never removes anything.
pub fn reindex_all(
    index: &IndexHandle,
    primary: &dyn PrimaryStore,
    batch_size: usize,
) -> Result<ReindexReport> {
    if batch_size == 0 {
        return Err(PostSearchError::invalid_config("reindex batch size must be at least 1"));
    }

    let started = Instant::now();
    let mapper = DocumentMapper::new();
    let posts = primary.scan_visible()?;
    let mut report = ReindexReport {
        seen: posts.len(),
        ..Default::default()
    };
    info!("Reindexing {} records in batches of {batch_size}", report.seen);

    let batches = posts.chunks(batch_size);
    let batch_count = batches.len();
    for (number, batch) in batches.enumerate() {
        let mut documents = Vec::with_capacity(batch.len());
        for post in batch {
            match mapper.map(post) {
                Mapped::Document(document) => documents.push(document),
                Mapped::Skip => report.skipped += 1,
            }
        }

        let outcome = index.upsert_batch(documents)?;
        report.indexed += outcome.indexed;
        report.failed += outcome.failed;
        info!(
            "Reindex batch {}/{batch_count}: {} indexed so far",
            number + 1,
            report.indexed
        );
    }

    index.commit()?;
    report.document_count = index.document_count()?;
    info!(
        "Reindex finished in {:?}: {} indexed, {} skipped, {} failed, {} documents",
        started.elapsed(),
        report.indexed,
        report.skipped,
        report.failed,
        report.document_count
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::memory::MemoryPrimaryStore;
    use crate::record::Post;

    #[test]
    fn test_reindex_is_idempotent() {
        let store = MemoryPrimaryStore::with_posts(
            (0..7).map(|i| Post::new(format!("p{i}"), "u1".into(), format!("post {i}"), "misc".into())),
        );
        store.upsert(Post::new("hidden", "u1", "draft", "misc").published(false));

        let index = IndexHandle::open_in_memory().unwrap();
        let first = reindex_all(&index, &store, 3).unwrap();
        assert_eq!(first.seen, 7);
        assert_eq!(first.indexed, 7);
        assert_eq!(first.document_count, 7);

        let second = reindex_all(&index, &store, 3).unwrap();
        assert_eq!(second, first);
        assert_eq!(index.stats().unwrap().wal_pending_records, 0);
    }

    #[test]
    fn test_reindex_keeps_unseen_documents() {
        let index = IndexHandle::open_in_memory().unwrap();
        let store = MemoryPrimaryStore::with_posts([Post::new("a", "u1", "A", "m")]);
        reindex_all(&index, &store, 10).unwrap();

        store.remove("a");
        store.upsert(Post::new("b", "u1", "B", "m"));
        let report = reindex_all(&index, &store, 10).unwrap();
        assert_eq!(report.document_count, 2);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let index = IndexHandle::open_in_memory().unwrap();
        assert!(reindex_all(&index, &MemoryPrimaryStore::new(), 0).is_err());
    }
}
