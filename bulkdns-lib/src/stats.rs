//! Shared query statistics.
//!
//! The dispatch loop is the only writer of the query counter; the metrics
//! reporter and the final summary read it. The counter and the start time
//! each sit behind their own reader/writer lock, and no lock is ever held
//! across an await point.

use crate::types::ThroughputSnapshot;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Counter and start time of one run.
///
/// Passed by `Arc` into the dispatch loop and the metrics reporter.
#[derive(Debug)]
pub struct QueryStats {
    query_count: RwLock<u64>,
    start_time: RwLock<Instant>,
}

impl QueryStats {
    /// Capture the start time now.
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start: Instant) -> Self {
        Self {
            query_count: RwLock::new(0),
            start_time: RwLock::new(start),
        }
    }

    /// Count one dispatched domain and return the new total.
    pub fn record_dispatch(&self) -> u64 {
        let mut count = self
            .query_count
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        *count
    }

    pub fn query_count(&self) -> u64 {
        *self
            .query_count
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start_time(&self) -> Instant {
        *self
            .start_time
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time().elapsed()
    }

    /// Read the counter, then the elapsed time.
    ///
    /// The two reads take separate locks, so the pair may be a few
    /// microseconds apart. Each value on its own is always consistent.
    pub fn snapshot(&self) -> ThroughputSnapshot {
        let queries = self.query_count();
        let elapsed = self.elapsed();
        ThroughputSnapshot::new(queries, elapsed)
    }
}

impl Default for QueryStats {
    fn default() -> Self {
        Self::new()
    }
}
