//! The crawl loop
//!
//! One long-lived loop drives the whole crawl. Each iteration:
//! - Honours a pending pause request
//! - Checks the repetition count and deadline
//! - Fits the target list to the cap, padding it with random addresses
//! - Fetches the whole batch concurrently and inspects every page
//! - Replaces the targets with the links discovered in this batch
//!
//! Batches never overlap. Per-target failures are absorbed; the loop itself
//! never aborts because of one bad target.

use crate::config::{CrawlerConfig, SharedConfig};
use crate::crawler::control::CrawlHandle;
use crate::crawler::events::{CrawlEvent, EventBus};
use crate::crawler::fetcher::{build_http_client, fetch_batch, FetchResult};
use crate::crawler::inspector::Inspector;
use crate::crawler::rate::RateTracker;
use crate::crawler::render::Renderer;
use crate::storage::Client;
use crate::url::{generate_ips, normalize_target};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

/// Parameters of one crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Initial targets (URLs or bare hosts)
    pub targets: Vec<String>,

    /// Number of batches to run; `None` runs until another limit is hit
    pub repetitions: Option<u64>,

    /// No new batch starts once this much time has passed
    pub run_for: Option<Duration>,
}

/// Totals of a finished crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub batches: u64,
    pub examined: u64,
    pub valid: u64,
    /// Targets that would have made up the next batch
    pub frontier: Vec<String>,
}

/// What fitting the targets to the cap did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Preparation {
    /// Targets thrown away because the list was over the cap
    dropped: usize,
    /// Random addresses added to fill the batch
    padded: usize,
}

/// Outcome of a single batch
#[derive(Debug, Default)]
struct Batch {
    examined: u64,
    valid: u64,
    frontier: Vec<String>,
}

/// The crawl engine
///
/// Holds the collaborators for a crawl: configuration handle, HTTP client,
/// inspector, event bus and pause control. A crawler can run several crawls
/// one after another; each [`run`](Crawler::run) owns its own target state.
pub struct Crawler {
    config: SharedConfig,
    http: reqwest::Client,
    inspector: Inspector,
    events: EventBus,
    control: CrawlHandle,
}

impl Crawler {
    /// Creates a crawler without storage or a renderer
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(KnotError)` - The HTTP client could not be built
    pub fn new(config: SharedConfig) -> Result<Self> {
        Ok(Self {
            config,
            http: build_http_client()?,
            inspector: Inspector::new(),
            events: EventBus::new(),
            control: CrawlHandle::new(),
        })
    }

    /// Persists every inspected host and image through `client`
    pub fn with_client(mut self, client: Arc<dyn Client>) -> Self {
        self.inspector = self.inspector.with_client(client);
        self
    }

    /// Re-renders near-empty pages through `renderer` when unsafe mode is on
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.inspector = self.inspector.with_renderer(renderer);
        self
    }

    /// Returns the pause/resume control surface
    pub fn handle(&self) -> CrawlHandle {
        self.control.clone()
    }

    /// Subscribes to the event stream
    pub fn subscribe(&self) -> UnboundedReceiver<CrawlEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Runs the crawl loop until it finishes
    ///
    /// The loop finishes when the repetitions are used up, the `run_for`
    /// deadline has passed at the top of an iteration, or there are no targets
    /// left while random generation is off. A `Finished` event is always
    /// published on the way out.
    pub async fn run(&self, options: CrawlOptions) -> CrawlReport {
        let deadline = options.run_for.map(|run_for| Instant::now() + run_for);
        let mut repetitions = options.repetitions;
        let mut targets = prepare_seeds(options.targets);

        let mut examined_rate = RateTracker::new();
        let mut valid_rate = RateTracker::new();
        let mut report = CrawlReport::default();

        tracing::info!(
            "Starting crawl with {} initial targets (repetitions: {}, run for: {})",
            targets.len(),
            repetitions.map_or("unlimited".to_string(), |r| r.to_string()),
            options
                .run_for
                .map_or("unlimited".to_string(), |d| format!("{}ms", d.as_millis()))
        );

        loop {
            if self.control.enter_pause() {
                self.events.publish(CrawlEvent::Pause(true));
                tracing::info!("Crawler paused");

                self.control.wait_for_resume().await;

                examined_rate.reset_time();
                valid_rate.reset_time();
                self.events.publish(CrawlEvent::Pause(false));
                tracing::info!("Crawler resumed");
            }

            if repetitions == Some(0) {
                tracing::debug!("Repetitions used up");
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::debug!("Run deadline reached");
                break;
            }

            let config = self.config.snapshot();

            let preparation = prepare_targets(&mut targets, &config);
            if preparation.dropped > 0 {
                self.log(
                    &config,
                    format!(
                        "Targets exceeded the cap of {}, dropped {} targets",
                        config.targets_cap, preparation.dropped
                    ),
                );
            }
            if targets.is_empty() {
                self.log(&config, "No targets");
                break;
            }
            if preparation.padded > 0 {
                tracing::debug!("Padded batch with {} random targets", preparation.padded);
            }

            let batch = self.run_batch(&targets, &config, &mut report).await;

            if !batch.frontier.is_empty() {
                self.log(
                    &config,
                    format!("Detected {} new targets", batch.frontier.len()),
                );
            }

            report.batches += 1;
            report.examined += batch.examined;
            self.events.publish(CrawlEvent::Examined {
                count: batch.examined,
                total: report.examined,
            });
            self.events.publish(CrawlEvent::Rates {
                examined_per_minute: examined_rate.record(batch.examined),
                valid_per_minute: valid_rate.record(batch.valid),
            });

            targets = batch.frontier;
            repetitions = repetitions.map(|r| r.saturating_sub(1));
        }

        report.frontier = targets;
        self.events.publish(CrawlEvent::Finished {
            batches: report.batches,
        });
        tracing::info!(
            "Crawl finished after {} batches: {} examined, {} valid",
            report.batches,
            report.examined,
            report.valid
        );

        report
    }

    /// Fetches and inspects one batch of targets
    ///
    /// `Valid` events are published as pages are inspected, so `report.valid`
    /// is updated here rather than by the caller.
    async fn run_batch(
        &self,
        targets: &[String],
        config: &CrawlerConfig,
        report: &mut CrawlReport,
    ) -> Batch {
        let timeout = Duration::from_millis(config.request_timeout);
        let results = fetch_batch(&self.http, targets, timeout).await;

        let mut batch = Batch {
            examined: targets.len() as u64,
            ..Batch::default()
        };
        let mut seen = HashSet::new();

        for result in results {
            let page = match result {
                FetchResult::Success(page) => page,
                FetchResult::Failed { target, error } => {
                    if !error.is_expected() {
                        self.log(
                            config,
                            format!("{} Unusual error: {}", target, error.code()),
                        );
                    }
                    continue;
                }
            };

            let inspection = match self
                .inspector
                .inspect(&page.body, &page.headers, &page.target, config.unsafe_mode)
                .await
            {
                Ok(inspection) => inspection,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", page.target, e);
                    continue;
                }
            };

            batch.valid += 1;
            report.valid += 1;
            self.events.publish(CrawlEvent::Valid {
                count: 1,
                total: report.valid,
            });

            for link in inspection.links {
                push_target(&mut batch.frontier, &mut seen, link, config.targets_cap);
            }
        }

        batch
    }

    /// Publishes a log event, mirroring it to tracing
    fn log(&self, config: &CrawlerConfig, message: impl Into<String>) {
        let message = message.into();
        if config.log_to_console {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }
        self.events.publish(CrawlEvent::log(message));
    }
}

/// Fits `targets` to the configured cap
///
/// A list over the cap is dropped entirely. A list under it is padded with
/// random addresses when generation is enabled.
fn prepare_targets(targets: &mut Vec<String>, config: &CrawlerConfig) -> Preparation {
    let mut preparation = Preparation::default();

    if targets.len() > config.targets_cap {
        preparation.dropped = targets.len();
        targets.clear();
    }

    if targets.len() < config.targets_cap && config.generate_random_targets {
        let missing = config.targets_cap - targets.len();
        targets.extend(generate_ips(missing));
        preparation.padded = missing;
    }

    preparation
}

/// Gives every seed an explicit scheme and drops repeats, keeping first-seen order
fn prepare_seeds(seeds: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    seeds
        .iter()
        .map(|seed| seed.trim())
        .filter(|seed| !seed.is_empty())
        .map(normalize_target)
        .filter(|seed| seen.insert(seed.clone()))
        .collect()
}

/// Adds a discovered link to the next frontier
///
/// Links already present are skipped, as is everything once the frontier is
/// full.
fn push_target(frontier: &mut Vec<String>, seen: &mut HashSet<String>, link: String, cap: usize) {
    if frontier.len() >= cap {
        return;
    }
    if seen.insert(link.clone()) {
        frontier.push(link);
    }
}
