//! The search API consumed by the HTTP layer.
//!
//! [`SearchService::search`] normalizes pagination, compiles the query,
//! ranks it against the index and hydrates the page from the primary
//! store. A deadline bounds the whole request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::config::{PaginationConfig, SearchConfig};
use crate::error::{PostSearchError, Result};
use crate::hydrator::hydrate;
use crate::index::IndexHandle;
use crate::primary::PrimaryStore;
use crate::record::Post;

/// Effective page bounds of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// Absent or non-positive limits fall back to the default, large ones
    /// are clamped to the maximum. Absent or negative offsets become 0.
    pub fn normalize(limit: Option<i64>, offset: Option<i64>, config: &PaginationConfig) -> Self {
        let limit = match limit {
            Some(limit) if limit > 0 => (limit as u64).min(config.max_limit as u64) as usize,
            _ => config.default_limit,
        };
        let offset = match offset {
            Some(offset) if offset > 0 => offset as usize,
            _ => 0,
        };
        Pagination { limit, offset }
    }

    /// Normalize raw query-string values. Unparseable values count as
    /// absent.
    pub fn parse(limit: Option<&str>, offset: Option<&str>, config: &PaginationConfig) -> Self {
        let parse = |value: Option<&str>| value.and_then(|v| v.trim().parse::<i64>().ok());
        Self::normalize(parse(limit), parse(offset), config)
    }
}

/// One hydrated page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<Post>,
    /// Matches across all pages.
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl SearchPage {
    pub fn empty(pagination: Pagination) -> Self {
        SearchPage {
            results: Vec::new(),
            total: 0,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }
}

/// A search request.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Inclusive lower bound on `createdAt`.
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `createdAt`.
    pub created_before: Option<DateTime<Utc>>,
    /// Overrides the service's default deadline.
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        SearchRequest {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Ranked, hydrated search over the posts index.
#[derive(Clone)]
pub struct SearchService {
    index: IndexHandle,
    compiler: Arc<QueryCompiler>,
    primary: Arc<dyn PrimaryStore>,
    pagination: PaginationConfig,
    default_timeout: Duration,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("index", &self.index)
            .field("pagination", &self.pagination)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl SearchService {
    pub fn new(
        index: IndexHandle,
        primary: Arc<dyn PrimaryStore>,
        config: &SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let compiler = QueryCompiler::new(&crate::schema::Schema::posts(), config.ranking)?;

        Ok(SearchService {
            index,
            compiler: Arc::new(compiler),
            primary,
            pagination: config.pagination,
            default_timeout: Duration::from_millis(config.search_timeout_ms),
        })
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// `search(query, limit, offset)` as the HTTP layer calls it.
    pub fn search(&self, query: &str, limit: Option<i64>, offset: Option<i64>) -> Result<SearchPage> {
        self.execute(SearchRequest {
            query: query.to_string(),
            limit,
            offset,
            ..Default::default()
        })
    }

    /// Run a request on the calling thread.
    ///
    /// An unavailable index is an error; a query that fails to compile is
    /// logged and answered with an empty page.
    pub fn execute(&self, request: SearchRequest) -> Result<SearchPage> {
        let started = Instant::now();
        let deadline = started + request.timeout.unwrap_or(self.default_timeout);

        if !self.index.is_open() {
            return Err(PostSearchError::NotInitialized);
        }

        let pagination = Pagination::normalize(request.limit, request.offset, &self.pagination);
        let compiled = match self.compiler.compile_with_range(
            &request.query,
            request.created_after,
            request.created_before,
        ) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!("Failed to compile query '{}': {e}", request.query);
                return Ok(SearchPage::empty(pagination));
            }
        };

        let query = match compiled {
            CompiledQuery::Empty => return Ok(SearchPage::empty(pagination)),
            CompiledQuery::Ranked(query) => query,
        };
        check_deadline(deadline, "query compilation")?;

        let result = self
            .index
            .search(&query, pagination.limit, pagination.offset)?;
        check_deadline(deadline, "index search")?;

        let results = hydrate(&result.ids(), self.primary.as_ref())?;
        check_deadline(deadline, "hydration")?;

        debug!(
            "Search '{}' returned {} of {} hits in {:?}",
            request.query,
            results.len(),
            result.total,
            started.elapsed()
        );

        Ok(SearchPage {
            results,
            total: result.total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    /// Run a request on the blocking pool, failing with
    /// [`PostSearchError::Timeout`] once the deadline passes.
    pub async fn execute_async(&self, request: SearchRequest) -> Result<SearchPage> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let query = request.query.clone();
        let service = self.clone();

        let task = tokio::task::spawn_blocking(move || service.execute(request));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PostSearchError::other(format!("search task failed: {e}"))),
            Err(_) => {
                warn!("Search '{query}' exceeded its {timeout:?} deadline");
                Err(PostSearchError::timeout(format!(
                    "search '{query}' exceeded {timeout:?}"
                )))
            }
        }
    }
}

fn check_deadline(deadline: Instant, phase: &str) -> Result<()> {
    if Instant::now() >= deadline {
        Err(PostSearchError::timeout(format!("deadline passed during {phase}")))
    } else {
        Ok(())
    }
}
