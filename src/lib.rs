//! # postsearch
//!
//! Search indexing and ranked retrieval for a social-posting backend.
//!
//! ## Features
//!
//! - Durable embedded inverted index with a write-ahead log and snapshots
//! - English text analysis with possessive and plural stemming
//! - Multi-signal ranking: fuzzy, prefix and wildcard matches per field,
//!   weighted by field and scored with BM25
//! - Background index synchronization with a bounded queue and worker pool
//! - Hydration of ranked identifiers from the primary store
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use postsearch::config::SearchConfig;
//! use postsearch::index::IndexHandle;
//! use postsearch::primary::memory::MemoryPrimaryStore;
//! use postsearch::record::Post;
//! use postsearch::service::SearchService;
//! use postsearch::synchronizer::{IndexJob, IndexSynchronizer, SynchronizerConfig};
//!
//! # fn main() -> postsearch::error::Result<()> {
//! let post = Post::new("p1", "u1", "Async Rust in practice", "Programming");
//! let primary = Arc::new(MemoryPrimaryStore::with_posts([post.clone()]));
//!
//! let index = IndexHandle::open_in_memory()?;
//! let synchronizer = IndexSynchronizer::new(index.clone(), SynchronizerConfig::default())?;
//! synchronizer.apply(IndexJob::Upsert(post))?;
//!
//! let service = SearchService::new(index, primary, &SearchConfig::default())?;
//! let page = service.search("asynk", None, None)?;
//! assert_eq!(page.results[0].post_id, "p1");
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod hydrator;
pub mod index;
pub mod mapper;
pub mod primary;
pub mod query;
pub mod record;
pub mod schema;
pub mod service;
pub mod storage;
pub mod synchronizer;
pub mod util;

pub mod prelude {
    pub use crate::compiler::{CompiledQuery, QueryCompiler, RankingWeights};
    pub use crate::config::SearchConfig;
    pub use crate::document::IndexedDocument;
    pub use crate::error::{PostSearchError, Result};
    pub use crate::index::IndexHandle;
    pub use crate::mapper::{DocumentMapper, Mapped};
    pub use crate::primary::PrimaryStore;
    pub use crate::record::Post;
    pub use crate::service::{SearchPage, SearchRequest, SearchService};
    pub use crate::synchronizer::{IndexJob, IndexSynchronizer};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
