//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files, reading
//! `BULKDNS_*` environment variables and merging configurations with proper
//! precedence rules.

use crate::error::BulkDnsError;
use crate::resolver::ResolverKind;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// input = "domains.txt"
/// rate_limit = 500
/// rate_duration = "1s"
/// status_duration = "30s"
/// log_file = "lookup.log"
/// resolver = "hickory"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// File with one domain name per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Launches allowed per rate window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<usize>,

    /// Rate window (as string, e.g., "1s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_duration: Option<String>,

    /// Time between status lines (as string, e.g., "10s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_duration: Option<String>,

    /// Echo lookup lines to stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Where lookup outcomes are appended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// Cap on simultaneously running lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,

    /// Resolver backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverKind>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to emit warnings for config issues
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, BulkDnsError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BulkDnsError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BulkDnsError::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory.
    pub fn discover_and_load(&self) -> Result<FileConfig, BulkDnsError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) if self.verbose => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                }
                Err(_) => {}
            }
        }

        for path in &loaded_files {
            tracing::debug!(path = %path.display(), "Loaded config file");
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./bulkdns.toml", "./.bulkdns.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".bulkdns.toml", "bulkdns.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("bulkdns").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    input: higher.input.or(lower.input),
                    rate_limit: higher.rate_limit.or(lower.rate_limit),
                    rate_duration: higher.rate_duration.or(lower.rate_duration),
                    status_duration: higher.status_duration.or(lower.status_duration),
                    verbose: higher.verbose.or(lower.verbose),
                    log_file: higher.log_file.or(lower.log_file),
                    max_in_flight: higher.max_in_flight.or(lower.max_in_flight),
                    resolver: higher.resolver.or(lower.resolver),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), BulkDnsError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if defaults.rate_limit == Some(0) {
            return Err(BulkDnsError::config("rate_limit must be at least 1"));
        }
        if defaults.max_in_flight == Some(0) {
            return Err(BulkDnsError::config("max_in_flight must be at least 1"));
        }

        for (key, value) in [
            ("rate_duration", &defaults.rate_duration),
            ("status_duration", &defaults.status_duration),
        ] {
            if let Some(value) = value {
                match parse_duration(value) {
                    Some(duration) if !duration.is_zero() => {}
                    _ => {
                        return Err(BulkDnsError::config(format!(
                            "Invalid {} '{}'. Use format like '500ms', '1s', '2m'",
                            key, value
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub input: Option<String>,
    pub rate_limit: Option<usize>,
    pub rate_duration: Option<Duration>,
    pub status_duration: Option<Duration>,
    pub verbose: Option<bool>,
    pub log_file: Option<String>,
    pub max_in_flight: Option<usize>,
    pub resolver: Option<ResolverKind>,
    pub config: Option<String>,
}

/// Load configuration from `BULKDNS_*` environment variables.
///
/// Invalid values are reported as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(input) = non_empty(lookup("BULKDNS_INPUT")) {
        env_config.input = Some(input);
    }

    if let Some(val) = lookup("BULKDNS_RATE_LIMIT") {
        match val.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => env_config.rate_limit = Some(limit),
            _ => tracing::warn!(value = %val, "Invalid BULKDNS_RATE_LIMIT, must be at least 1"),
        }
    }

    if let Some(val) = lookup("BULKDNS_RATE_DURATION") {
        match parse_duration(&val) {
            Some(duration) if !duration.is_zero() => env_config.rate_duration = Some(duration),
            _ => tracing::warn!(value = %val, "Invalid BULKDNS_RATE_DURATION"),
        }
    }

    if let Some(val) = lookup("BULKDNS_STATUS_DURATION") {
        match parse_duration(&val) {
            Some(duration) if !duration.is_zero() => env_config.status_duration = Some(duration),
            _ => tracing::warn!(value = %val, "Invalid BULKDNS_STATUS_DURATION"),
        }
    }

    if let Some(val) = lookup("BULKDNS_VERBOSE") {
        match parse_bool(&val) {
            Some(verbose) => env_config.verbose = Some(verbose),
            None => tracing::warn!(value = %val, "Invalid BULKDNS_VERBOSE, use true/false"),
        }
    }

    if let Some(log_file) = non_empty(lookup("BULKDNS_LOG_FILE")) {
        env_config.log_file = Some(log_file);
    }

    if let Some(val) = lookup("BULKDNS_MAX_IN_FLIGHT") {
        match val.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => env_config.max_in_flight = Some(limit),
            _ => tracing::warn!(value = %val, "Invalid BULKDNS_MAX_IN_FLIGHT, must be at least 1"),
        }
    }

    if let Some(val) = lookup("BULKDNS_RESOLVER") {
        match val.parse::<ResolverKind>() {
            Ok(kind) => env_config.resolver = Some(kind),
            Err(e) => tracing::warn!(value = %val, error = %e, "Invalid BULKDNS_RESOLVER"),
        }
    }

    if let Some(config) = non_empty(lookup("BULKDNS_CONFIG")) {
        env_config.config = Some(config);
    }

    env_config
}

/// Parse a duration string like "250ms", "1s", "2m", "1h".
///
/// A bare number is taken as seconds. Returns `None` if parsing fails.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<f64>().ok().and_then(secs_to_duration)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = value.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        value.parse::<f64>().ok().and_then(secs_to_duration)
    }
}

fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("1s"), Some(Duration::from_secs(1)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration(" 5S "), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("-1s"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("nans"), None);
    }

    #[test]
    fn test_parse_duration_rejects_out_of_range_values() {
        assert_eq!(parse_duration("1e30s"), None);
        assert_eq!(parse_duration("1e30"), None);
        assert_eq!(parse_duration("400000000000000000m"), None);
        assert_eq!(parse_duration("10000000000000000h"), None);
        assert_eq!(
            parse_duration("18446744073709551615ms"),
            Some(Duration::from_millis(u64::MAX))
        );
    }

    #[test]
    fn test_out_of_range_durations_are_config_errors() {
        let temp_file = write_config("[defaults]\nstatus_duration = \"1e30s\"\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(BulkDnsError::ConfigError { .. })));

        let vars: HashMap<&str, &str> = [("BULKDNS_RATE_DURATION", "400000000000000000m")]
            .into_iter()
            .collect();
        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.rate_duration, None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
input = "domains.txt"
rate_limit = 250
rate_duration = "500ms"
status_duration = "30s"
verbose = true
resolver = "hickory"
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();
        let defaults = config.defaults.unwrap();

        assert_eq!(defaults.input, Some("domains.txt".to_string()));
        assert_eq!(defaults.rate_limit, Some(250));
        assert_eq!(defaults.rate_duration, Some("500ms".to_string()));
        assert_eq!(defaults.verbose, Some(true));
        assert_eq!(defaults.resolver, Some(ResolverKind::Hickory));
        assert_eq!(defaults.log_file, None);
    }

    #[test]
    fn test_invalid_rate_limit() {
        let temp_file = write_config("[defaults]\nrate_limit = 0\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(BulkDnsError::ConfigError { .. })));
    }

    #[test]
    fn test_invalid_duration() {
        let temp_file = write_config("[defaults]\nrate_duration = \"fast\"\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("rate_duration"));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::new(false).load_file("/nonexistent/bulkdns.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                rate_limit: Some(10),
                input: Some("old.txt".to_string()),
                verbose: Some(false),
                ..Default::default()
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                rate_limit: Some(25),
                verbose: Some(true),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.rate_limit, Some(25)); // Higher wins
        assert_eq!(defaults.input, Some("old.txt".to_string())); // Lower preserved
        assert_eq!(defaults.verbose, Some(true)); // Higher wins
    }

    #[test]
    fn test_merge_with_missing_side() {
        let manager = ConfigManager::new(false);
        let only_lower = FileConfig {
            defaults: Some(DefaultsConfig {
                rate_limit: Some(7),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(only_lower, FileConfig::default());
        assert_eq!(merged.defaults.unwrap().rate_limit, Some(7));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("BULKDNS_INPUT", "list.txt"),
            ("BULKDNS_RATE_LIMIT", "40"),
            ("BULKDNS_RATE_DURATION", "2s"),
            ("BULKDNS_STATUS_DURATION", "5s"),
            ("BULKDNS_VERBOSE", "yes"),
            ("BULKDNS_RESOLVER", "hickory"),
            ("BULKDNS_MAX_IN_FLIGHT", "64"),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(env_config.input, Some("list.txt".to_string()));
        assert_eq!(env_config.rate_limit, Some(40));
        assert_eq!(env_config.rate_duration, Some(Duration::from_secs(2)));
        assert_eq!(env_config.status_duration, Some(Duration::from_secs(5)));
        assert_eq!(env_config.verbose, Some(true));
        assert_eq!(env_config.resolver, Some(ResolverKind::Hickory));
        assert_eq!(env_config.max_in_flight, Some(64));
        assert_eq!(env_config.log_file, None);
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let vars: HashMap<&str, &str> = [
            ("BULKDNS_RATE_LIMIT", "0"),
            ("BULKDNS_RATE_DURATION", "whenever"),
            ("BULKDNS_VERBOSE", "maybe"),
            ("BULKDNS_RESOLVER", "bind"),
            ("BULKDNS_INPUT", "   "),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config, EnvConfig::default());
    }
}
