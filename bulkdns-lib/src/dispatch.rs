//! Dispatch loop.
//!
//! Reads domain names one line at a time and, for each, waits for the rate
//! gate, counts the domain and spawns a resolution worker. Once the input is
//! exhausted the loop drains: it waits for every spawned worker to finish
//! before computing the final throughput.
//!
//! Launch order follows input order. Completion order, and so log order,
//! follows resolver latency.

use crate::error::BulkDnsError;
use crate::metrics::MetricsReporter;
use crate::rate::RateGate;
use crate::resolver::Resolve;
use crate::sink::LogSink;
use crate::stats::QueryStats;
use crate::types::{DispatchConfig, RunSummary};
use crate::worker::resolve_domain;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Drives one bulk resolution run.
///
/// # Example
///
/// ```rust,no_run
/// use bulkdns_lib::{DispatchConfig, Dispatcher, MemorySink, SystemResolver};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = Arc::new(MemorySink::new());
///     let dispatcher = Dispatcher::new(
///         DispatchConfig::default(),
///         Arc::new(SystemResolver::new()),
///         sink.clone(),
///     )?;
///
///     let summary = dispatcher.run(&b"localhost\n127.0.0.1\n"[..]).await?;
///     assert_eq!(summary.queries, 2);
///     assert_eq!(sink.lookups().len(), 2);
///     Ok(())
/// }
/// ```
pub struct Dispatcher {
    config: DispatchConfig,
    gate: RateGate,
    resolver: Arc<dyn Resolve>,
    sink: Arc<dyn LogSink>,
    stats: Arc<QueryStats>,
    tracker: TaskTracker,
    in_flight: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Create a dispatcher. The run's start time is captured here.
    pub fn new(
        config: DispatchConfig,
        resolver: Arc<dyn Resolve>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, BulkDnsError> {
        config.validate()?;

        let gate = RateGate::new(config.rate_limit, config.rate_window)?;
        let in_flight = config
            .max_in_flight
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Ok(Self {
            config,
            gate,
            resolver,
            sink,
            stats: Arc::new(QueryStats::new()),
            tracker: TaskTracker::new(),
            in_flight,
        })
    }

    /// Use statistics created elsewhere, e.g. at process start.
    pub fn with_stats(mut self, stats: Arc<QueryStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the rate gate, e.g. with one reading a custom clock.
    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<QueryStats> {
        self.stats.clone()
    }

    /// Number of spawned workers that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start the periodic throughput reporter for this run's statistics.
    ///
    /// The reporter is not tied to [`run`](Self::run): it keeps ticking after
    /// the run completes and ends only with the runtime.
    pub fn spawn_metrics(&self) -> JoinHandle<()> {
        MetricsReporter::new(
            self.stats.clone(),
            self.sink.clone(),
            self.config.metrics_interval,
        )
        .spawn()
    }

    /// Dispatch every line of `reader`, drain, and report the final summary.
    ///
    /// Lines are split on `\n` with one trailing `\r` removed; empty lines
    /// are dispatched like any other name. A read error stops dispatch,
    /// waits for already launched workers and is returned as
    /// [`BulkDnsError::ReadError`].
    pub async fn run<R>(&self, reader: R) -> Result<RunSummary, BulkDnsError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.split(b'\n');

        let read_result = loop {
            match lines.next_segment().await {
                Ok(Some(raw)) => self.dispatch(decode_line(raw)).await,
                Ok(None) => break Ok(()),
                Err(e) => {
                    tracing::error!(error = %e, "failed reading input");
                    self.sink
                        .record_status(&format!("[-] Error reading input: {}", e));
                    break Err(BulkDnsError::read_error(e.to_string()));
                }
            }
        };

        self.drain().await;
        read_result?;

        let summary = RunSummary::from(self.stats.snapshot());
        self.sink.record_summary(&summary);
        Ok(summary)
    }

    async fn dispatch(&self, domain: String) {
        // The in-flight permit comes first so a full pool cannot bunch up
        // launches that already passed the gate.
        let permit = self.acquire_in_flight().await;
        self.gate.acquire().await;
        let seq = self.stats.record_dispatch();
        tracing::trace!(seq, domain = %domain, "dispatching lookup");

        let resolver = self.resolver.clone();
        let sink = self.sink.clone();
        self.tracker.spawn(async move {
            let _permit = permit;
            resolve_domain(resolver.as_ref(), sink.as_ref(), domain).await;
        });
    }

    async fn acquire_in_flight(&self) -> Option<OwnedSemaphorePermit> {
        match &self.in_flight {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    async fn drain(&self) {
        self.tracker.close();
        tracing::debug!(in_flight = self.tracker.len(), "draining lookups");
        self.tracker.wait().await;
    }
}

fn decode_line(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_carriage_return() {
        assert_eq!(decode_line(b"example.com\r".to_vec()), "example.com");
        assert_eq!(decode_line(b"example.com".to_vec()), "example.com");
        assert_eq!(decode_line(Vec::new()), "");
    }

    #[test]
    fn test_decode_line_keeps_surrounding_whitespace() {
        assert_eq!(decode_line(b"  spaced.example ".to_vec()), "  spaced.example ");
    }

    #[test]
    fn test_decode_line_replaces_invalid_utf8() {
        let line = decode_line(vec![b'a', 0xff, b'.', b'c', b'o', b'm']);
        assert_eq!(line, "a\u{fffd}.com");
    }
}
