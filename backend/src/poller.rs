//! Price Poller
//!
//! Fires on a fixed wall-clock interval, fetches the top-N quotes,
//! and hands a successful batch to the `Reconciler`.
//!
//! Data flow:
//! Ticker → QuoteSource → Reconciler → SnapshotStore
//!
//! Cycles run one after another inside a single task. A tick that comes due
//! while a slow cycle is still running is skipped, not queued.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Instrument, error, info, warn};

use crate::config::AppConfig;
use crate::livecoinwatch::{FetchError, QuoteSource};
use crate::logger::cycle_span;
use crate::metrics::counters::Counters;
use crate::reconciler::{ReconcileSummary, Reconciler};
use crate::time::{MonotonicClock, to_epoch_ms};

#[derive(Clone, Debug)]
pub struct PollerSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub limit: usize,
    pub currency: String,
}

impl From<&AppConfig> for PollerSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            interval: cfg.fetch_interval,
            fetch_timeout: cfg.fetch_timeout,
            limit: cfg.fetch_limit,
            currency: cfg.currency.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    Updated(ReconcileSummary),
    /// Upstream failed; the store was not touched.
    FetchFailed,
    /// The batch was fetched but could not be written.
    StoreFailed,
}

pub struct Poller {
    source: Arc<dyn QuoteSource>,
    reconciler: Arc<Reconciler>,
    clock: MonotonicClock,
    counters: Counters,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        reconciler: Arc<Reconciler>,
        counters: Counters,
        settings: PollerSettings,
    ) -> Self {
        Self {
            source,
            reconciler,
            clock: MonotonicClock::new(),
            counters,
            settings,
        }
    }

    /// Replaces the timestamp clock, e.g. one seeded from the store.
    pub fn with_clock(mut self, clock: MonotonicClock) -> Self {
        self.clock = clock;
        self
    }

    /// One fetch + reconcile. Never panics and never propagates: every
    /// failure is logged, counted and folded into the outcome.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);

        let fetched = timeout(
            self.settings.fetch_timeout,
            self.source
                .fetch_top(self.settings.limit, &self.settings.currency),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout(self.settings.fetch_timeout)));

        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                self.counters.fetch_failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "price fetch failed; keeping previous snapshot set");
                return CycleOutcome::FetchFailed;
            }
        };

        let now = self.clock.now();

        match self.reconciler.reconcile(&batch, now).await {
            Ok(summary) => {
                self.counters.updated.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .last_success_ms
                    .store(to_epoch_ms(summary.at), Ordering::Relaxed);
                CycleOutcome::Updated(summary)
            }
            Err(e) => {
                self.counters.store_failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "reconciliation aborted; snapshot store unavailable");
                CycleOutcome::StoreFailed
            }
        }
    }

    /// Runs cycles until `shutdown` flips to true or its sender is dropped.
    ///
    /// Shutdown is only observed between cycles, so an in-flight cycle
    /// always completes its writes.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            every = ?self.settings.interval,
            limit = self.settings.limit,
            currency = %self.settings.currency,
            mode = %self.reconciler.mode(),
            "price poller started"
        );

        let mut cycle_id: u64 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            cycle_id += 1;
            self.run_cycle().instrument(cycle_span(cycle_id)).await;
        }

        info!(cycles = cycle_id, "price poller stopped");
    }
}

/// Owns the background poller task.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn spawn(poller: Arc<Poller>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poller.run(shutdown_rx));
        Self { shutdown_tx, task }
    }

    /// Signals the loop and waits for the in-flight cycle to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = ?e, "price poller task ended abnormally");
        }
    }
}
