use serde::Deserialize;

/// Default request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 5000;

/// Default maximum frontier size
pub const DEFAULT_TARGETS_CAP: usize = 1000;

/// Default SQLite database location
pub const DEFAULT_DATABASE_PATH: &str = "knot.db";

/// A numeric setting as written in the config file
///
/// Integers are taken as-is. Strings are parsed leniently: `"5s"` style time
/// suffixes for durations, plain digits for counts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Text(String),
}

/// Configuration file shape, before sanitization
///
/// Every key is optional; missing or malformed values fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
    pub request_timeout: Option<ConfigValue>,
    pub targets_cap: Option<ConfigValue>,
    #[serde(rename = "unsafe")]
    pub unsafe_mode: Option<bool>,
    pub generate_random_targets: Option<bool>,
    pub log_to_console: Option<bool>,
    #[serde(default)]
    pub storage: RawStorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawStorageConfig {
    pub database_path: Option<String>,
}

/// Sanitized configuration for the whole process
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    /// Per-request timeout (milliseconds)
    pub request_timeout: u64,

    /// Maximum number of targets in one batch
    pub targets_cap: usize,

    /// Allow the scripted-render fallback for near-empty pages
    pub unsafe_mode: bool,

    /// Pad the frontier with random dotted-quad addresses
    pub generate_random_targets: bool,

    /// Mirror crawl log events to the console at info level
    pub log_to_console: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            targets_cap: DEFAULT_TARGETS_CAP,
            unsafe_mode: false,
            generate_random_targets: true,
            log_to_console: true,
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}
