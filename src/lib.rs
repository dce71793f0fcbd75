//! Knot: a host-discovering web crawler
//!
//! This crate implements the crawl-and-inspect engine of the Knot search
//! engine. A single crawl loop drives batches of concurrent fetches, inspects
//! every page that answers, persists the extracted hosts and images through a
//! storage [`Client`](storage::Client) and publishes live progress events.

pub mod config;
pub mod crawler;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawler setup and top-level operations
///
/// Per-target failures never surface here; they are absorbed by the crawl
/// loop. Only setup problems (configuration, storage, HTTP client) do.
#[derive(Debug, Error)]
pub enum KnotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Render error: {0}")]
    Render(#[from] crawler::RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, KnotError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CrawlerConfig, SharedConfig};
pub use crawler::{CrawlEvent, CrawlHandle, CrawlOptions, CrawlReport, Crawler};
pub use storage::{Client, Host, Image};
pub use crate::url::{generate_ips, normalize_target, resolve};
