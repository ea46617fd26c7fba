//! Auto-sync scheduler - periodic trigger for full sync runs
//!
//! The [`AutoSyncScheduler`] wakes on a short fixed tick and checks whether
//! the configured check interval has elapsed since the last completed run.
//! When it has, the caller-provided callback is invoked to start a run over
//! all syncable targets.
//!
//! ## Flow
//!
//! ```text
//! tick (20s) ──→ is_due? ──→ on_due().await ──→ true: mark_run
//!                                              false: retry next tick
//! ```
//!
//! The callback reports whether a run actually happened; a busy
//! orchestrator or an empty catalog returns `false`, so the next tick
//! tries again. The first tick is always due.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How often the scheduler checks whether a run is due
pub const DEFAULT_TICK: Duration = Duration::from_secs(20);

/// Starts sync runs once the check interval has elapsed
#[derive(Debug)]
pub struct AutoSyncScheduler {
    /// Minimum time between the end of one run and the start of the next
    interval: Duration,
    tick: Duration,
    last_run: Option<Instant>,
    cancel: CancellationToken,
}

impl AutoSyncScheduler {
    /// Creates a scheduler with the default tick
    ///
    /// # Arguments
    /// * `interval` - Check interval between runs
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            tick: DEFAULT_TICK,
            last_run: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the polling tick
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Token that stops [`run`](AutoSyncScheduler::run) when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Records that a run finished at `at`
    pub fn mark_run(&mut self, at: Instant) {
        self.last_run = Some(at);
    }

    /// Whether a run should start at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Main loop; returns once the cancellation token fires
    ///
    /// `on_due` is awaited to completion before the next tick is handled,
    /// so runs never overlap.
    pub async fn run<F, Fut>(&mut self, mut on_due: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            tick_secs = self.tick.as_secs(),
            "Auto-sync scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.tick);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.is_due(Instant::now()) {
                        continue;
                    }
                    debug!("Auto-sync due");
                    if on_due().await {
                        self.mark_run(Instant::now());
                    } else {
                        debug!("Auto-sync skipped, will retry on next tick");
                    }
                }
            }
        }

        info!("Auto-sync scheduler stopped");
    }
}

// ============================================================================
// Unit tests
// ============================================================================
