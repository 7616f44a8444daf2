//! Error types for the postsearch library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`PostSearchError`] enum. The variants follow the failure classes of the
//! search engine: an index used before it was opened, I/O and storage
//! failures, query compilation failures, and deadline expiry.
//!
//! # Examples
//!
//! ```
//! use postsearch::error::{PostSearchError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PostSearchError::query("unbalanced wildcard"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for postsearch operations.
#[derive(Error, Debug)]
pub enum PostSearchError {
    /// The index handle was used before `open` succeeded, or after `close`.
    #[error("Index not initialized")]
    NotInitialized,

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors (corruption, inconsistent state)
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Schema-related errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Query-related errors (compilation, invalid patterns, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Binary serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A deadline elapsed before the operation completed
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The indexing queue rejected a job because it is at capacity
    #[error("Indexing queue is full ({0} pending jobs)")]
    QueueFull(usize),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with PostSearchError.
pub type Result<T> = std::result::Result<T, PostSearchError>;

impl PostSearchError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Storage(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Schema(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Analysis(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Query(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Serialization(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Timeout(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        PostSearchError::InvalidConfig(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PostSearchError::Other(msg.into())
    }

    /// Whether the failure comes from the disk or the index data itself.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            PostSearchError::Io(_)
                | PostSearchError::Index(_)
                | PostSearchError::Storage(_)
                | PostSearchError::Serialization(_)
        )
    }

    /// Whether a caller may retry the operation once an operator has
    /// addressed the cause. Query failures and bad configuration are not.
    pub fn is_retryable(&self) -> bool {
        self.is_io_failure()
            || matches!(
                self,
                PostSearchError::NotInitialized
                    | PostSearchError::Timeout(_)
                    | PostSearchError::QueueFull(_)
            )
    }
}

impl From<bincode::Error> for PostSearchError {
    fn from(err: bincode::Error) -> Self {
        PostSearchError::Serialization(err.to_string())
    }
}
