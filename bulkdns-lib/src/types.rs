//! Core data types for bulk resolution runs.
//!
//! This module defines the run configuration, the per-domain lookup outcome
//! and the throughput figures reported while and after a run.

use crate::error::BulkDnsError;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Settings for one dispatch run.
///
/// These control the launch rate and the reporting cadence; they say
/// nothing about where domain names come from or where outcomes go.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Maximum number of lookups launched per `rate_window`
    /// Default: 100
    pub rate_limit: usize,

    /// Length of the rate-limit window
    /// Default: 1 second
    pub rate_window: Duration,

    /// Time between periodic throughput reports
    /// Default: 10 seconds
    pub metrics_interval: Duration,

    /// Optional cap on simultaneously running lookups.
    /// Default: None (only the launch rate is bounded)
    pub max_in_flight: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_limit: 100,
            rate_window: Duration::from_secs(1),
            metrics_interval: Duration::from_secs(10),
            max_in_flight: None,
        }
    }
}

impl DispatchConfig {
    /// Set the number of launches allowed per window.
    pub fn with_rate_limit(mut self, rate_limit: usize) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the rate-limit window length.
    pub fn with_rate_window(mut self, rate_window: Duration) -> Self {
        self.rate_window = rate_window;
        self
    }

    /// Set the time between throughput reports.
    pub fn with_metrics_interval(mut self, metrics_interval: Duration) -> Self {
        self.metrics_interval = metrics_interval;
        self
    }

    /// Cap the number of lookups that may be in flight at once.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Check the settings for values the dispatch loop cannot run with.
    pub fn validate(&self) -> Result<(), BulkDnsError> {
        if self.rate_limit == 0 {
            return Err(BulkDnsError::config("Rate limit must be at least 1"));
        }
        if self.rate_window.is_zero() {
            return Err(BulkDnsError::config("Rate duration must be greater than zero"));
        }
        if self.metrics_interval.is_zero() {
            return Err(BulkDnsError::config(
                "Status duration must be greater than zero",
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(BulkDnsError::config("Max in-flight lookups must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of resolving a single domain name.
///
/// Lives only long enough to be written to the sink.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    /// The domain name exactly as read from input
    pub domain: String,

    /// Resolved addresses, or the resolver's error
    pub result: Result<Vec<IpAddr>, BulkDnsError>,
}

impl LookupOutcome {
    /// Build a successful outcome.
    pub fn resolved(domain: impl Into<String>, addresses: Vec<IpAddr>) -> Self {
        Self {
            domain: domain.into(),
            result: Ok(addresses),
        }
    }

    /// Build a failed outcome.
    pub fn failed(domain: impl Into<String>, error: BulkDnsError) -> Self {
        Self {
            domain: domain.into(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for LookupOutcome {
    /// `example.com [93.184.215.14 2606:2800:21f:cb07:6820:80da:af6b:8b2c]`
    /// on success, `example.invalid lookup failed: <error>` otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(addresses) => {
                let joined = addresses
                    .iter()
                    .map(|addr| addr.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{} [{}]", self.domain, joined)
            }
            Err(e) => write!(f, "{} lookup failed: {}", self.domain, e),
        }
    }
}

/// Point-in-time throughput figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSnapshot {
    /// Number of domains dispatched so far
    pub queries: u64,

    /// Time since the run started
    pub elapsed: Duration,

    /// `queries / elapsed` in seconds, or 0 when no measurable time has passed
    pub queries_per_second: f64,
}

impl ThroughputSnapshot {
    pub fn new(queries: u64, elapsed: Duration) -> Self {
        Self {
            queries,
            elapsed,
            queries_per_second: queries_per_second(queries, elapsed),
        }
    }
}

impl fmt::Display for ThroughputSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[+] Processed {} in {:.3?}. {:.2} queries per second.",
            self.queries, self.elapsed, self.queries_per_second
        )
    }
}

/// Final figures of a completed run, computed after all workers drained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub queries: u64,
    pub elapsed: Duration,
    pub queries_per_second: f64,
}

impl From<ThroughputSnapshot> for RunSummary {
    fn from(snapshot: ThroughputSnapshot) -> Self {
        Self {
            queries: snapshot.queries,
            elapsed: snapshot.elapsed,
            queries_per_second: snapshot.queries_per_second,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[=] Finished {} queries in {:.3?}. {} queries per second.",
            self.queries,
            self.elapsed,
            self.queries_per_second.round() as u64
        )
    }
}

fn queries_per_second(queries: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        0.0
    } else {
        queries as f64 / secs
    }
}
