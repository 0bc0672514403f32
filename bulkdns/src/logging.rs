//! Log sink wiring for the CLI.
//!
//! Lookup outcomes go to the log file, status lines go to stdout. With
//! `--verbose` lookup outcomes are echoed to stdout as well. Everything else
//! (library diagnostics, resolver internals) goes to stderr, filtered by
//! `RUST_LOG` and defaulting to warnings.

use bulkdns_lib::{BulkDnsError, LOOKUP_TARGET, STATUS_TARGET};
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Open the lookup log for appending, creating it if needed.
pub fn open_log_file(path: &str) -> Result<File, BulkDnsError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BulkDnsError::log_sink(path, e.to_string()))
}

/// Install the global subscriber.
pub fn init(log_file: File, verbose: bool) -> Result<(), BulkDnsError> {
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(file_targets());

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_filter(console_targets(verbose));

    let diagnostics_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(diagnostics_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(diagnostics_layer)
        .try_init()
        .map_err(|e| BulkDnsError::internal(format!("Failed to install logger: {}", e)))
}

fn file_targets() -> Targets {
    Targets::new().with_target(LOOKUP_TARGET, LevelFilter::INFO)
}

fn console_targets(verbose: bool) -> Targets {
    let targets = Targets::new().with_target(STATUS_TARGET, LevelFilter::INFO);
    if verbose {
        targets.with_target(LOOKUP_TARGET, LevelFilter::INFO)
    } else {
        targets
    }
}

fn diagnostics_filter() -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Lookup and status lines already have their own sinks
    [LOOKUP_TARGET, STATUS_TARGET]
        .iter()
        .fold(filter, |filter, target| {
            match format!("{}=off", target).parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tracing::Level;

    #[test]
    fn test_file_receives_only_lookups() {
        let targets = file_targets();
        assert!(targets.would_enable(LOOKUP_TARGET, &Level::INFO));
        assert!(targets.would_enable(LOOKUP_TARGET, &Level::WARN));
        assert!(!targets.would_enable(STATUS_TARGET, &Level::INFO));
        assert!(!targets.would_enable("hickory_proto", &Level::WARN));
    }

    #[test]
    fn test_console_echoes_lookups_only_when_verbose() {
        let quiet = console_targets(false);
        assert!(quiet.would_enable(STATUS_TARGET, &Level::INFO));
        assert!(!quiet.would_enable(LOOKUP_TARGET, &Level::INFO));

        let verbose = console_targets(true);
        assert!(verbose.would_enable(STATUS_TARGET, &Level::INFO));
        assert!(verbose.would_enable(LOOKUP_TARGET, &Level::INFO));
    }

    #[test]
    fn test_open_log_file_creates_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.log");
        let path = path.to_str().unwrap();

        std::fs::write(path, "existing line\n").unwrap();
        {
            use std::io::Write;
            let mut file = open_log_file(path).unwrap();
            file.write_all(b"appended line\n").unwrap();
        }

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "existing line\nappended line\n");
    }

    #[test]
    fn test_open_log_file_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("lookup.log");
        let result = open_log_file(path.to_str().unwrap());
        assert!(matches!(result, Err(BulkDnsError::LogSinkError { .. })));
    }
}
