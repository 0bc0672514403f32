//! # bulkdns Library
//!
//! A rate-limited bulk DNS resolution engine.
//!
//! The library reads domain names one per line, launches one resolution task
//! per name at a bounded launch rate, writes every lookup outcome to a log
//! sink and reports aggregate throughput on a fixed cadence.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulkdns_lib::{DispatchConfig, Dispatcher, SystemResolver, TracingSink};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DispatchConfig::default()
//!         .with_rate_limit(50)
//!         .with_rate_window(Duration::from_secs(1));
//!
//!     let dispatcher = Dispatcher::new(
//!         config,
//!         Arc::new(SystemResolver::new()),
//!         Arc::new(TracingSink::new()),
//!     )?;
//!
//!     let input = tokio::io::BufReader::new(&b"example.com\nexample.org\n"[..]);
//!     let summary = dispatcher.run(input).await?;
//!     println!("{} queries, {:.1} qps", summary.queries, summary.queries_per_second);
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - **Rate Gate**: bounds how fast new lookups may be launched
//! - **Resolution Worker**: one task per domain, exactly one log entry each
//! - **Dispatch Loop**: reads input, gates, counts and spawns, then drains
//! - **Metrics Reporter**: periodic throughput lines on its own cadence

pub use config::{
    load_env_config, load_env_config_from, parse_duration, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig,
};
pub use dispatch::Dispatcher;
pub use error::BulkDnsError;
pub use metrics::MetricsReporter;
pub use rate::{Clock, MockClock, RateGate, Sleeping, TokioClock, WindowLimiter};
pub use resolver::{HickoryResolver, Resolve, ResolverKind, Resolving, SystemResolver};
pub use sink::{LogSink, MemorySink, SinkEntry, TracingSink, LOOKUP_TARGET, STATUS_TARGET};
pub use stats::QueryStats;
pub use types::{DispatchConfig, LookupOutcome, RunSummary, ThroughputSnapshot};
pub use worker::resolve_domain;

mod config;
mod dispatch;
mod error;
mod metrics;
mod rate;
mod resolver;
mod sink;
mod stats;
mod types;
mod worker;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BulkDnsError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
