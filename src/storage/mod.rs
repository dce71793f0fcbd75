//! Storage module for persisting crawl results
//!
//! The crawl core only knows the [`Client`] capability: verify or initialize
//! the backing store, then push [`Host`] and [`Image`] records into it. The
//! bundled backend is SQLite.

mod schema;
mod sqlite;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteClient;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage connection lock poisoned")]
    Poisoned,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An inspected host page
///
/// Built once by the inspector; string fields are already trimmed to their
/// column bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Short title (at most five words or 100 characters, ellipsized)
    pub title: String,

    /// Address the page was fetched from
    pub addr: String,

    /// Indexable text of the page
    pub contents: String,

    /// Server fingerprint, ignored by the search engine
    pub keywords: String,
}

/// An image found on an inspected page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Absolute image URL
    pub src: String,

    /// Description assembled from alt/title attributes and surrounding text
    pub dsc: String,

    /// Address of the page the image was found on
    pub addr: String,
}

/// Storage capability consumed by the crawler
///
/// Implementations must be shareable across the crawl loop's tasks.
pub trait Client: Send + Sync {
    /// Verifies the backing store is reachable, creating its schema if needed
    ///
    /// Must be idempotent.
    fn test(&self) -> StorageResult<()>;

    /// Persists a host record
    fn push(&self, host: &Host) -> StorageResult<()>;

    /// Persists an image record
    fn push_img(&self, image: &Image) -> StorageResult<()>;
}
