//! Configuration module for the Knot crawler
//!
//! This module handles loading, parsing, and sanitizing the TOML crawler
//! configuration, and provides the [`SharedConfig`] handle that the crawl loop
//! reads a snapshot from before every batch.
//!
//! # Example
//!
//! ```no_run
//! use knot_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config/crawler.toml")).unwrap();
//! println!("Targets cap: {}", config.crawler.targets_cap);
//! ```

mod parser;
mod shared;
mod types;
mod validation;

// Re-export types
pub use shared::SharedConfig;
pub use types::{
    Config, ConfigValue, CrawlerConfig, RawConfig, RawStorageConfig, StorageConfig,
    DEFAULT_DATABASE_PATH, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TARGETS_CAP,
};

// Re-export parser functions
pub use parser::{load_config, parse_config, parse_time};
