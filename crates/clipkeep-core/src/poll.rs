//! Clipboard change detection by polling the reader's generation counter.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::history::{HistoryEngine, Observed};
use crate::snapshot::SnapshotReader;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct PollScheduler<R> {
    reader: R,
    period: Duration,
    last_generation: u64,
    timer: Option<Interval>,
}

impl<R: SnapshotReader> PollScheduler<R> {
    /// The generation baseline is taken from the reader now, so whatever is
    /// already on the clipboard is not recorded.
    pub fn new(mut reader: R, period: Duration) -> Self {
        let last_generation = reader.current_generation();
        Self {
            reader,
            period,
            last_generation,
            timer: None,
        }
    }

    /// Starts the recurring timer. No-op while running. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            return;
        }
        let mut timer = time::interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timer = Some(timer);
        debug!(period_ms = self.period.as_millis() as u64, "poll scheduler started");
    }

    /// Cancels the timer. No-op while stopped.
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            debug!("poll scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Generation seen by the last tick, recorded before its snapshot is read.
    pub fn last_generation(&self) -> u64 {
        self.last_generation
    }

    /// Resolves at the next timer tick; never resolves while stopped.
    /// Cancel safe.
    pub async fn next_tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }

    /// One poll: compares the generation, reads a snapshot on change and
    /// forwards it to `engine`. Returns `None` when nothing was observed.
    pub fn tick(&mut self, engine: &mut HistoryEngine) -> Option<Observed> {
        let generation = self.reader.current_generation();
        if generation == self.last_generation {
            return None;
        }
        // Recorded before the read so a slow or failing read is not retried
        // for the same generation.
        self.last_generation = generation;

        let snapshot = match self.reader.read_snapshot() {
            Ok(Some(snapshot)) if snapshot.is_usable() => snapshot,
            Ok(_) => {
                trace!(generation, "clipboard changed but holds nothing usable");
                return None;
            }
            Err(e) => {
                debug!(generation, error = %e, "clipboard read failed, skipping tick");
                return None;
            }
        };

        let outcome = engine.observe(snapshot);
        if outcome == Observed::Echo {
            trace!(generation, "clipboard echo suppressed");
        }
        Some(outcome)
    }
}
