//! Typed crawl events and the bus that fans them out to subscribers
//!
//! Every subscriber gets its own unbounded channel, so a slow dashboard never
//! loses events or holds up the crawl loop. Events arrive in the order the
//! loop published them.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// A timestamped log line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Something the crawl loop wants observers to know about
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// Operator-facing log line
    Log(LogEntry),

    /// A batch finished; `count` targets were fetched
    Examined { count: u64, total: u64 },

    /// `count` pages were inspected successfully
    Valid { count: u64, total: u64 },

    /// Smoothed per-minute rates after a batch
    Rates {
        examined_per_minute: f64,
        valid_per_minute: f64,
    },

    /// `true` when the loop suspends, `false` when it resumes
    Pause(bool),

    /// The loop reached its terminal state
    Finished { batches: u64 },
}

impl CrawlEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log(LogEntry {
            at: Utc::now(),
            message: message.into(),
        })
    }
}

/// Publish side of the event stream
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<UnboundedSender<CrawlEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber that receives every event published from now on
    pub fn subscribe(&self) -> UnboundedReceiver<CrawlEvent> {
        let (tx, rx) = unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Sends an event to every live subscriber
    ///
    /// Subscribers whose receiver was dropped are forgotten.
    pub fn publish(&self, event: CrawlEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<CrawlEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
