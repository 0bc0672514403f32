//! Log sinks for lookup outcomes and throughput lines.
//!
//! Two logical channels share one sink: per-domain lookup outcomes and
//! status lines (progress ticks, start-up notices, the final summary). Lines
//! from the two channels interleave freely; each line is written whole.

use crate::types::{LookupOutcome, RunSummary, ThroughputSnapshot};
use std::sync::{Mutex, PoisonError};

/// Tracing target for lookup outcome lines.
pub const LOOKUP_TARGET: &str = "bulkdns::lookup";

/// Tracing target for progress, summary and notice lines.
pub const STATUS_TARGET: &str = "bulkdns::status";

/// Destination for everything a run reports.
pub trait LogSink: Send + Sync {
    /// One line per resolved (or failed) domain.
    fn record_lookup(&self, outcome: &LookupOutcome);

    /// Periodic throughput line.
    fn record_progress(&self, snapshot: &ThroughputSnapshot);

    /// Final line after all lookups drained.
    fn record_summary(&self, summary: &RunSummary);

    /// Free-form status notice.
    fn record_status(&self, message: &str);
}

/// Sink that emits `tracing` events.
///
/// Which file or console the lines end up in is decided by the subscriber
/// the binary installs, keyed on [`LOOKUP_TARGET`] and [`STATUS_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn record_lookup(&self, outcome: &LookupOutcome) {
        if outcome.is_success() {
            tracing::info!(target: LOOKUP_TARGET, "{}", outcome);
        } else {
            tracing::warn!(target: LOOKUP_TARGET, "{}", outcome);
        }
    }

    fn record_progress(&self, snapshot: &ThroughputSnapshot) {
        tracing::info!(target: STATUS_TARGET, "{}", snapshot);
    }

    fn record_summary(&self, summary: &RunSummary) {
        tracing::info!(target: STATUS_TARGET, "{}", summary);
    }

    fn record_status(&self, message: &str) {
        tracing::info!(target: STATUS_TARGET, "{}", message);
    }
}

/// One recorded line of a [`MemorySink`].
#[derive(Debug, Clone)]
pub enum SinkEntry {
    Lookup(LookupOutcome),
    Progress(ThroughputSnapshot),
    Summary(RunSummary),
    Status(String),
}

/// Sink that keeps every entry in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lookups(&self) -> Vec<LookupOutcome> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                SinkEntry::Lookup(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<ThroughputSnapshot> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                SinkEntry::Progress(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                SinkEntry::Summary(summary) => Some(summary),
                _ => None,
            })
            .collect()
    }

    fn push(&self, entry: SinkEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl LogSink for MemorySink {
    fn record_lookup(&self, outcome: &LookupOutcome) {
        self.push(SinkEntry::Lookup(outcome.clone()));
    }

    fn record_progress(&self, snapshot: &ThroughputSnapshot) {
        self.push(SinkEntry::Progress(*snapshot));
    }

    fn record_summary(&self, summary: &RunSummary) {
        self.push(SinkEntry::Summary(*summary));
    }

    fn record_status(&self, message: &str) {
        self.push(SinkEntry::Status(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BulkDnsError;
    use std::time::Duration;

    #[test]
    fn test_memory_sink_keeps_write_order() {
        let sink = MemorySink::new();
        sink.record_status("starting");
        sink.record_lookup(&LookupOutcome::resolved("a.example", vec![]));
        sink.record_progress(&ThroughputSnapshot::new(1, Duration::from_secs(1)));
        sink.record_lookup(&LookupOutcome::failed(
            "b.example",
            BulkDnsError::resolution("b.example", "timeout"),
        ));

        let entries = sink.entries();
        assert_eq!(entries.len(), 4);
        assert!(matches!(&entries[0], SinkEntry::Status(s) if s == "starting"));
        assert!(matches!(&entries[1], SinkEntry::Lookup(o) if o.domain == "a.example"));
        assert!(matches!(&entries[2], SinkEntry::Progress(p) if p.queries == 1));

        let lookups = sink.lookups();
        assert_eq!(lookups.len(), 2);
        assert!(!lookups[1].is_success());
        assert!(sink.summaries().is_empty());
    }

    #[test]
    fn test_tracing_sink_without_subscriber_is_silent() {
        let sink = TracingSink::new();
        sink.record_lookup(&LookupOutcome::resolved("a.example", vec![]));
        sink.record_summary(&RunSummary::from(ThroughputSnapshot::new(
            0,
            Duration::ZERO,
        )));
    }
}
