//! Periodic throughput reporting.
//!
//! The reporter runs on its own cadence, independent of the dispatch loop.
//! Left alone it never stops: it keeps ticking after the run has finished
//! and only ends with the runtime. Embedders that need it gone earlier can
//! hand it a [`CancellationToken`].

use crate::sink::LogSink;
use crate::stats::QueryStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct MetricsReporter {
    stats: Arc<QueryStats>,
    sink: Arc<dyn LogSink>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl MetricsReporter {
    pub fn new(stats: Arc<QueryStats>, sink: Arc<dyn LogSink>, interval: Duration) -> Self {
        Self {
            stats,
            sink,
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Start reporting: one line immediately, then one per interval.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        tracing::debug!("metrics reporter stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let snapshot = self.stats.snapshot();
                        self.sink.record_progress(&snapshot);
                    }
                }
            }
        })
    }
}
