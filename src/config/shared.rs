//! Runtime-adjustable crawler configuration

use crate::config::types::CrawlerConfig;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to the process-wide crawler configuration
///
/// The crawl loop takes a [`snapshot`](SharedConfig::snapshot) at the top of
/// every batch, so an operator adjusting the cap mid-batch only affects the
/// next one.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<CrawlerConfig>>,
}

impl SharedConfig {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Returns a consistent copy of the current configuration
    pub fn snapshot(&self) -> CrawlerConfig {
        self.read().clone()
    }

    pub fn set_targets_cap(&self, cap: usize) {
        self.write().targets_cap = cap.max(1);
    }

    pub fn set_request_timeout(&self, ms: u64) {
        self.write().request_timeout = ms.max(1);
    }

    pub fn set_unsafe_mode(&self, enabled: bool) {
        self.write().unsafe_mode = enabled;
    }

    pub fn set_generate_random_targets(&self, enabled: bool) {
        self.write().generate_random_targets = enabled;
    }

    pub fn set_log_to_console(&self, enabled: bool) {
        self.write().log_to_console = enabled;
    }

    // A writer panicking mid-update leaves plain data behind, so poisoning is
    // not treated as fatal.
    fn read(&self) -> RwLockReadGuard<'_, CrawlerConfig> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CrawlerConfig> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl From<CrawlerConfig> for SharedConfig {
    fn from(config: CrawlerConfig) -> Self {
        Self::new(config)
    }
}
