//! Crawler module: the crawl-and-inspect engine
//!
//! This module contains the core crawling logic, including:
//! - Concurrent batch fetching with error classification
//! - Page inspection (title, contents, keywords, links, images)
//! - The crawl loop with cap handling and random target padding
//! - Pause/resume control, rate tracking and the event stream

mod control;
mod events;
mod fetcher;
mod inspector;
mod rate;
mod render;
mod scheduler;
mod text;

pub use control::{CrawlHandle, PauseState};
pub use events::{CrawlEvent, EventBus, LogEntry};
pub use fetcher::{
    build_http_client, fetch_batch, fetch_url, FetchError, FetchResult, FetchedPage,
};
pub use inspector::{
    check_content_type, check_source, extract, find_links, get_contents, get_images,
    get_keywords, get_title, is_empty, InspectError, Inspection, Inspector,
};
pub use rate::RateTracker;
#[cfg(feature = "headless")]
pub use render::ChromeRenderer;
pub use render::{RenderError, Renderer};
pub use scheduler::{CrawlOptions, CrawlReport, Crawler};
pub use text::{collapse_whitespace, trim_to_word};

use crate::config::SharedConfig;
use crate::storage::Client;
use std::sync::Arc;

/// Runs a complete crawl with optional storage
///
/// Convenience entry point for callers that need neither the event stream
/// nor the pause control.
///
/// # Arguments
///
/// * `config` - Shared crawler configuration
/// * `client` - Storage for inspected hosts and images, if any
/// * `options` - Initial targets and run limits
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to completion
/// * `Err(KnotError)` - The crawler could not be set up
pub async fn crawl(
    config: SharedConfig,
    client: Option<Arc<dyn Client>>,
    options: CrawlOptions,
) -> crate::Result<CrawlReport> {
    let mut crawler = Crawler::new(config)?;
    if let Some(client) = client {
        crawler = crawler.with_client(client);
    }
    Ok(crawler.run(options).await)
}
