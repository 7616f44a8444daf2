use std::sync::Arc;
use std::thread;
use std::time::Duration;

use postsearch::error::{PostSearchError, Result};
use postsearch::index::IndexHandle;
use postsearch::primary::memory::MemoryPrimaryStore;
use postsearch::record::Post;
use postsearch::synchronizer::{IndexJob, IndexSynchronizer, JobOutcome, SynchronizerConfig};

fn synchronizer(workers: usize, queue_capacity: usize) -> Result<IndexSynchronizer> {
    IndexSynchronizer::new(
        IndexHandle::open_in_memory()?,
        SynchronizerConfig {
            workers,
            queue_capacity,
        },
    )
}

#[test]
fn test_hooks_drive_the_index() -> Result<()> {
    let sync = synchronizer(3, 128)?;

    for i in 0..50 {
        let post = Post::new(format!("p{i}"), "u1".to_string(), format!("post {i}"), "misc".to_string());
        assert!(sync.on_created(&post));
    }
    assert!(sync.wait_idle(Duration::from_secs(10)));
    assert_eq!(sync.index().document_count()?, 50);

    // Unpublishing removes, deleting removes, publishing restores.
    let draft = Post::new("p0", "u1", "post 0", "misc").published(false);
    assert!(sync.on_updated(&draft));
    assert!(sync.on_deleted("p1"));
    assert!(sync.wait_idle(Duration::from_secs(10)));
    assert!(!sync.index().contains("p0")?);
    assert!(!sync.index().contains("p1")?);

    assert!(sync.on_published(&draft.published(true)));
    assert!(sync.wait_idle(Duration::from_secs(10)));
    assert!(sync.index().contains("p0")?);
    assert_eq!(sync.index().document_count()?, 49);

    let stats = sync.stats();
    assert_eq!(stats.submitted, 53);
    assert_eq!(stats.completed, 53);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.pending, 0);
    Ok(())
}

#[test]
fn test_apply_reports_outcomes() -> Result<()> {
    let sync = synchronizer(1, 8)?;
    let post = Post::new("p1", "u1", "Hello", "misc");

    assert_eq!(sync.apply(IndexJob::Upsert(post.clone()))?, JobOutcome::Indexed);
    assert_eq!(sync.apply(IndexJob::Upsert(post.clone().deleted(true)))?, JobOutcome::Removed);
    assert_eq!(sync.apply(IndexJob::Upsert(post.deleted(true)))?, JobOutcome::Skipped);
    assert_eq!(sync.apply(IndexJob::Delete("missing".to_string()))?, JobOutcome::Skipped);
    Ok(())
}

#[test]
fn test_concurrent_updates_last_write_wins() -> Result<()> {
    let sync = Arc::new(synchronizer(2, 16)?);
    let first = Post::new("p1", "u1", "first title", "misc");
    let second = Post::new("p1", "u1", "second title", "misc");

    let handles: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .map(|post| {
            let sync = Arc::clone(&sync);
            thread::spawn(move || sync.apply(IndexJob::Upsert(post)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap()?;
    }

    // Either write may land last; the index holds exactly one of them.
    let index = sync.index();
    assert_eq!(index.document_count()?, 1);
    let stored = index.get("p1")?.unwrap();
    assert!(stored.title == first.title || stored.title == second.title);
    Ok(())
}

#[test]
fn test_index_keeps_last_applied_write_not_last_commit() -> Result<()> {
    let older = Post::new("p1", "u1", "original title", "misc");
    let mut newer = Post::new("p1", "u1", "edited title", "misc");
    newer.updated_at = older.updated_at + chrono::Duration::minutes(5);

    // The newer commit reaches the index first; the stale one overwrites it.
    let sync = synchronizer(1, 8)?;
    assert_eq!(sync.apply(IndexJob::Upsert(newer.clone()))?, JobOutcome::Indexed);
    assert_eq!(sync.apply(IndexJob::Upsert(older.clone()))?, JobOutcome::Indexed);
    assert_eq!(sync.index().get("p1")?.unwrap().title, "original title");

    // Same through a single-worker queue, which applies in submission order.
    let queued = synchronizer(1, 8)?;
    assert!(queued.on_updated(&newer));
    assert!(queued.on_updated(&older));
    assert!(queued.wait_idle(Duration::from_secs(10)));
    assert_eq!(queued.index().get("p1")?.unwrap().title, "original title");
    Ok(())
}

#[test]
fn test_failed_jobs_do_not_stop_workers() -> Result<()> {
    let sync = synchronizer(2, 16)?;
    sync.index().close()?;

    assert!(sync.on_created(&Post::new("p1", "u1", "Hello", "misc")));
    assert!(sync.on_deleted("p2"));
    assert!(sync.wait_idle(Duration::from_secs(10)));

    let stats = sync.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.completed, 0);
    Ok(())
}

#[test]
fn test_shutdown_drains_then_rejects() -> Result<()> {
    let sync = synchronizer(1, 256)?;
    for i in 0..100 {
        sync.try_submit(IndexJob::Upsert(Post::new(
            format!("p{i}"),
            "u1".to_string(),
            "queued".to_string(),
            "misc".to_string(),
        )))?;
    }
    sync.shutdown();
    assert_eq!(sync.index().document_count()?, 100);

    assert!(!sync.on_created(&Post::new("late", "u1", "Hello", "misc")));
    assert!(matches!(
        sync.try_submit(IndexJob::Delete("late".to_string())),
        Err(PostSearchError::Other(_))
    ));
    assert_eq!(sync.stats().rejected, 2);
    Ok(())
}

#[test]
fn test_reindex_through_synchronizer() -> Result<()> {
    let sync = synchronizer(1, 8)?;
    let primary = MemoryPrimaryStore::with_posts([
        Post::new("p1", "u1", "one", "misc"),
        Post::new("p2", "u1", "two", "misc").deleted(true),
        Post::new("p3", "u1", "three", "misc"),
    ]);

    let report = sync.reindex_all(&primary, 1)?;
    assert_eq!(report.indexed, 2);
    assert_eq!(report.document_count, 2);
    assert!(!sync.index().contains("p2")?);
    Ok(())
}
