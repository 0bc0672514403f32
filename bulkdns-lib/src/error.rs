//! Error handling for bulk resolution runs.
//!
//! Errors come in two tiers. Fatal errors stop the run before (or, for a
//! broken input stream, after) dispatch; per-item resolution errors are
//! written to the log sink and never affect other lookups.

use std::fmt;

/// Main error type for bulkdns operations.
#[derive(Debug, Clone)]
pub enum BulkDnsError {
    /// The domain-name input could not be opened
    InputError { path: String, message: String },

    /// The lookup log could not be opened or created
    LogSinkError { path: String, message: String },

    /// Reading the input stream failed after dispatch had started
    ReadError { message: String },

    /// A single lookup failed (NXDOMAIN, timeout, malformed name, ...)
    ResolutionError { domain: String, message: String },

    /// Invalid settings (zero rate limit, unparsable duration, ...)
    ConfigError { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl BulkDnsError {
    /// Create a new input error.
    pub fn input_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::InputError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new log sink error.
    pub fn log_sink<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::LogSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new mid-stream read error.
    pub fn read_error<M: Into<String>>(message: M) -> Self {
        Self::ReadError {
            message: message.into(),
        }
    }

    /// Create a new resolution error for one domain.
    pub fn resolution<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ResolutionError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error terminates the process.
    ///
    /// Resolution errors are per-item and only ever end up in the log.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ResolutionError { .. })
    }
}

impl fmt::Display for BulkDnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputError { path, message } => {
                write!(f, "Cannot open input '{}': {}", path, message)
            }
            Self::LogSinkError { path, message } => {
                write!(f, "Cannot open log file '{}': {}", path, message)
            }
            Self::ReadError { message } => {
                write!(f, "Error reading input: {}", message)
            }
            Self::ResolutionError { domain, message } => {
                write!(f, "lookup {}: {}", domain, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for BulkDnsError {}

impl From<toml::de::Error> for BulkDnsError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}
