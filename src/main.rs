//! Knot crawler main entry point
//!
//! This is the command-line interface for the Knot crawl-and-inspect engine.

use clap::Parser;
use knot_crawler::config::{load_config, parse_time, Config};
use knot_crawler::crawler::{CrawlEvent, CrawlHandle, CrawlOptions, Crawler};
use knot_crawler::storage::{Client, SqliteClient};
use knot_crawler::SharedConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Knot: a host-discovering web crawler
///
/// Knot fetches batches of targets concurrently, stores a searchable record
/// of every page that answers, and feeds the links it finds (padded with
/// random addresses) into the next batch.
///
/// While crawling, type `pause`, `resume` or `cap <n>` on stdin.
#[derive(Parser, Debug)]
#[command(name = "knot-crawler")]
#[command(version)]
#[command(about = "A host-discovering web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config/crawler.toml")]
    config: PathBuf,

    /// Initial targets (URLs, hosts or dotted quads)
    #[arg(value_name = "TARGET")]
    targets: Vec<String>,

    /// Number of batches to run (unlimited when omitted)
    #[arg(short, long)]
    repetitions: Option<u64>,

    /// Stop starting new batches after this long (e.g. 30s, 10m, 2h)
    #[arg(long, value_parser = parse_run_for)]
    run_for: Option<Duration>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let storage = open_storage(&config)?;

    if cli.stats {
        handle_stats(&config, &storage)?;
    } else {
        let options = CrawlOptions {
            targets: cli.targets,
            repetitions: cli.repetitions,
            run_for: cli.run_for,
        };
        handle_crawl(config, storage, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("knot_crawler=info,warn"),
            1 => EnvFilter::new("knot_crawler=debug,info"),
            2 => EnvFilter::new("knot_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn parse_run_for(value: &str) -> Result<Duration, String> {
    parse_time(value)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("invalid duration '{}'", value))
}

/// Opens the database and makes sure its schema exists
///
/// An unusable database is fatal: there would be nowhere to put results.
fn open_storage(config: &Config) -> Result<Arc<SqliteClient>, Box<dyn std::error::Error>> {
    let path = Path::new(&config.storage.database_path);
    let client = SqliteClient::open(path)?;

    if let Err(e) = client.test() {
        tracing::error!("Storage at {} is unusable: {}", path.display(), e);
        return Err(e.into());
    }

    Ok(Arc::new(client))
}

/// Handles the --stats mode: shows counts and the latest hosts
fn handle_stats(config: &Config, storage: &SqliteClient) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);
    println!("Hosts:  {}", storage.count_hosts()?);
    println!("Images: {}", storage.count_images()?);

    let recent = storage.recent_hosts(10)?;
    if !recent.is_empty() {
        println!("\nMost recent hosts:");
        for host in recent {
            println!("  {} - {}", host.addr, host.title);
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    storage: Arc<SqliteClient>,
    options: CrawlOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Targets cap: {}, request timeout: {}ms, random targets: {}, unsafe: {}",
        config.crawler.targets_cap,
        config.crawler.request_timeout,
        config.crawler.generate_random_targets,
        config.crawler.unsafe_mode
    );

    let shared = SharedConfig::new(config.crawler);
    let crawler = Crawler::new(shared.clone())?.with_client(storage);
    let crawler = attach_renderer(crawler, &shared).await;

    let events = crawler.subscribe();
    tokio::spawn(report_progress(events));
    tokio::spawn(operator_console(crawler.handle(), shared));

    let report = crawler.run(options).await;

    println!(
        "Crawl finished: {} batches, {} targets examined, {} pages stored",
        report.batches, report.examined, report.valid
    );

    Ok(())
}

#[cfg(feature = "headless")]
async fn attach_renderer(crawler: Crawler, config: &SharedConfig) -> Crawler {
    if !config.snapshot().unsafe_mode {
        return crawler;
    }
    match knot_crawler::crawler::ChromeRenderer::launch().await {
        Ok(renderer) => crawler.with_renderer(Arc::new(renderer)),
        Err(e) => {
            tracing::warn!("Continuing without script rendering: {}", e);
            crawler
        }
    }
}

#[cfg(not(feature = "headless"))]
async fn attach_renderer(crawler: Crawler, config: &SharedConfig) -> Crawler {
    if config.snapshot().unsafe_mode {
        tracing::warn!("Unsafe mode is on, but this build has no renderer (feature `headless`)");
    }
    crawler
}

/// Prints batch progress; log lines already go through tracing
async fn report_progress(mut events: tokio::sync::mpsc::UnboundedReceiver<CrawlEvent>) {
    let mut valid_in_batch = 0;
    while let Some(event) = events.recv().await {
        match event {
            CrawlEvent::Valid { .. } => valid_in_batch += 1,
            CrawlEvent::Examined { count, total } => {
                tracing::info!(
                    "Batch done: {} examined, {} valid ({} examined in total)",
                    count,
                    valid_in_batch,
                    total
                );
                valid_in_batch = 0;
            }
            CrawlEvent::Rates {
                examined_per_minute,
                valid_per_minute,
            } => {
                tracing::debug!(
                    "Rates: {:.1} examined/min, {:.1} valid/min",
                    examined_per_minute,
                    valid_per_minute
                );
            }
            CrawlEvent::Log(_) | CrawlEvent::Pause(_) => {}
            CrawlEvent::Finished { .. } => break,
        }
    }
}

/// Reads operator commands from stdin
async fn operator_console(handle: CrawlHandle, config: SharedConfig) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Operator console closed: {}", e);
                break;
            }
        };

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("pause"), None) => {
                handle.pause();
                println!("Pausing after the current batch");
            }
            (Some("resume"), None) => {
                handle.resume();
                println!("Resuming");
            }
            (Some("cap"), Some(value)) => match value.parse::<usize>() {
                Ok(cap) if cap >= 1 => {
                    config.set_targets_cap(cap);
                    println!("Targets cap set to {}", cap);
                }
                _ => println!("Invalid cap '{}'", value),
            },
            (None, _) => {}
            _ => println!("Commands: pause, resume, cap <n>"),
        }
    }
}
