//! Pause/resume control for the crawl loop
//!
//! The loop only ever suspends between batches. An operator request moves the
//! state from `Running` to `PausePending`; the loop notices it at the top of
//! its next iteration, marks itself `Paused` and waits on the watch channel
//! until a resume flips the state back to `Running`.

use std::sync::Arc;
use tokio::sync::watch;

/// Where the crawl loop stands with respect to pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    Running,
    /// Pause requested, takes effect at the next batch boundary
    PausePending,
    Paused,
}

/// Cloneable control surface handed to operators
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    state: Arc<watch::Sender<PauseState>>,
}

impl Default for CrawlHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(PauseState::Running);
        Self {
            state: Arc::new(tx),
        }
    }
}

impl CrawlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a pause at the next batch boundary
    ///
    /// No-op when a pause is already pending or in effect.
    pub fn pause(&self) {
        self.state.send_if_modified(|state| {
            if *state == PauseState::Running {
                *state = PauseState::PausePending;
                true
            } else {
                false
            }
        });
    }

    /// Resumes a paused loop, or cancels a pause that has not taken effect yet
    pub fn resume(&self) {
        self.state.send_if_modified(|state| {
            if *state == PauseState::Running {
                false
            } else {
                *state = PauseState::Running;
                true
            }
        });
    }

    pub fn state(&self) -> PauseState {
        *self.state.borrow()
    }

    /// Turns a pending pause into an actual one
    ///
    /// Returns true if the loop must now suspend.
    pub(crate) fn enter_pause(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == PauseState::PausePending {
                *state = PauseState::Paused;
                true
            } else {
                false
            }
        })
    }

    /// Waits until the state is `Running` again
    pub(crate) async fn wait_for_resume(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = rx.wait_for(|state| *state == PauseState::Running).await;
    }
}
