//! bulkdns CLI Application
//!
//! Resolves every domain name in a text file at a bounded launch rate,
//! appending one line per lookup to a log file and printing throughput
//! status lines to stdout.

mod logging;

use bulkdns_lib::{load_env_config, ConfigManager, EnvConfig, FileConfig};
use bulkdns_lib::{parse_duration, BulkDnsError, ResolverKind};
use bulkdns_lib::{DispatchConfig, Dispatcher, LogSink, QueryStats, TracingSink};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const DEFAULT_INPUT: &str = "source.txt";
const DEFAULT_LOG_FILE: &str = "lookup.log";

/// CLI arguments for bulkdns
#[derive(Parser, Debug)]
#[command(name = "bulkdns")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve a list of domain names in bulk at a bounded rate")]
#[command(
    long_about = "Resolve a list of domain names in bulk at a bounded rate.\n\nEvery lookup outcome is appended to the log file. Throughput is printed to stdout on a fixed cadence and once more when the run completes."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// File with one domain name per line (default: source.txt)
    #[arg(
        short = 'i',
        long = "input",
        value_name = "FILE",
        help_heading = "Input"
    )]
    pub input: Option<String>,

    /// Lookups launched per rate window (default: 100)
    #[arg(
        long = "rate-limit",
        alias = "ratelimit",
        value_name = "N",
        help_heading = "Rate Limiting"
    )]
    pub rate_limit: Option<usize>,

    /// Length of the rate window, e.g. 500ms, 1s, 2m (default: 1s)
    #[arg(
        long = "rate-duration",
        alias = "rateduration",
        value_name = "DURATION",
        value_parser = parse_duration_arg,
        help_heading = "Rate Limiting"
    )]
    pub rate_duration: Option<Duration>,

    /// Cap on lookups running at once (default: unbounded)
    #[arg(long = "max-in-flight", value_name = "N", help_heading = "Rate Limiting")]
    pub max_in_flight: Option<usize>,

    /// Resolver backend: system or hickory (default: system)
    #[arg(
        long = "resolver",
        value_name = "KIND",
        value_parser = parse_resolver_arg,
        help_heading = "Resolution"
    )]
    pub resolver: Option<ResolverKind>,

    /// Time between status lines (default: 10s)
    #[arg(
        long = "status-duration",
        alias = "statusduration",
        value_name = "DURATION",
        value_parser = parse_duration_arg,
        help_heading = "Output"
    )]
    pub status_duration: Option<Duration>,

    /// File lookup outcomes are appended to (default: lookup.log)
    #[arg(long = "log-file", value_name = "FILE", help_heading = "Output")]
    pub log_file: Option<String>,

    /// Also print every lookup outcome to stdout
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,

    /// Use a specific config file instead of discovered ones
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,
}

/// Everything a run needs, after defaults, config files, environment and
/// CLI arguments have been layered.
#[derive(Debug, Clone, PartialEq)]
struct RunSettings {
    input: String,
    log_file: String,
    verbose: bool,
    resolver: ResolverKind,
    dispatch: DispatchConfig,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            verbose: false,
            resolver: ResolverKind::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_bulk_lookup(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Reject argument values no run could use.
fn validate_args(args: &Args) -> Result<(), String> {
    if args.rate_limit == Some(0) {
        return Err("Rate limit must be at least 1".to_string());
    }

    if args.rate_duration.is_some_and(|d| d.is_zero()) {
        return Err("Rate duration must be greater than zero".to_string());
    }

    if args.status_duration.is_some_and(|d| d.is_zero()) {
        return Err("Status duration must be greater than zero".to_string());
    }

    if args.max_in_flight == Some(0) {
        return Err("Max in-flight lookups must be at least 1".to_string());
    }

    if args.input.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err("Input path cannot be empty".to_string());
    }

    if args.log_file.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err("Log file path cannot be empty".to_string());
    }

    Ok(())
}

async fn run_bulk_lookup(args: Args) -> Result<(), BulkDnsError> {
    let settings = build_settings(&args)?;
    settings.dispatch.validate()?;

    // Statistics start before anything else so the startup cost is counted
    let stats = Arc::new(QueryStats::new());

    let log_file = logging::open_log_file(&settings.log_file)?;
    logging::init(log_file, settings.verbose)?;

    let sink: Arc<dyn LogSink> = Arc::new(TracingSink::new());
    sink.record_status("[*] bulkdns firing up!");

    let dispatcher = Dispatcher::new(
        settings.dispatch.clone(),
        settings.resolver.build(),
        sink.clone(),
    )?
    .with_stats(stats);

    // Runs until the process exits
    let _reporter = dispatcher.spawn_metrics();

    sink.record_status(&format!("[*] Source file {}", settings.input));
    tracing::debug!(resolver = %settings.resolver, config = ?dispatcher.config(), "Starting run");

    let input = tokio::fs::File::open(&settings.input)
        .await
        .map_err(|e| BulkDnsError::input_error(&settings.input, e.to_string()))?;

    dispatcher.run(BufReader::new(input)).await?;

    Ok(())
}

/// Build run settings with proper precedence: CLI > env > config files > defaults.
fn build_settings(args: &Args) -> Result<RunSettings, BulkDnsError> {
    let env_config = load_env_config();

    // Step 1: Config files, explicit path first, discovery otherwise
    let config_manager = ConfigManager::new(args.verbose);
    let file_config = if let Some(explicit_config_path) = &args.config {
        load_explicit_config(&config_manager, explicit_config_path)?
    } else if let Some(env_config_path) = &env_config.config {
        load_explicit_config(&config_manager, env_config_path)?
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => file_config,
            Err(e) => {
                if args.verbose {
                    eprintln!("Config discovery warning: {}", e);
                }
                FileConfig::default()
            }
        }
    };

    let settings = merge_file_config_into_settings(RunSettings::default(), file_config);

    // Step 2: Environment variables (BULKDNS_*)
    let settings = apply_environment_config(settings, &env_config);

    // Step 3: CLI arguments (highest precedence)
    Ok(apply_cli_args_to_settings(settings, args))
}

fn load_explicit_config(manager: &ConfigManager, path: &str) -> Result<FileConfig, BulkDnsError> {
    manager.load_file(path).map_err(|e| {
        BulkDnsError::config(format!("Failed to load config file '{}': {}", path, e))
    })
}

/// Apply the `[defaults]` table of a config file.
fn merge_file_config_into_settings(
    mut settings: RunSettings,
    file_config: FileConfig,
) -> RunSettings {
    let Some(defaults) = file_config.defaults else {
        return settings;
    };

    if let Some(input) = defaults.input {
        settings.input = input;
    }
    if let Some(rate_limit) = defaults.rate_limit {
        settings.dispatch.rate_limit = rate_limit;
    }
    if let Some(window) = defaults.rate_duration.as_deref().and_then(parse_duration) {
        settings.dispatch.rate_window = window;
    }
    if let Some(interval) = defaults.status_duration.as_deref().and_then(parse_duration) {
        settings.dispatch.metrics_interval = interval;
    }
    if let Some(verbose) = defaults.verbose {
        settings.verbose = verbose;
    }
    if let Some(log_file) = defaults.log_file {
        settings.log_file = log_file;
    }
    if defaults.max_in_flight.is_some() {
        settings.dispatch.max_in_flight = defaults.max_in_flight;
    }
    if let Some(resolver) = defaults.resolver {
        settings.resolver = resolver;
    }

    settings
}

fn apply_environment_config(mut settings: RunSettings, env_config: &EnvConfig) -> RunSettings {
    if let Some(input) = &env_config.input {
        settings.input = input.clone();
    }
    if let Some(rate_limit) = env_config.rate_limit {
        settings.dispatch.rate_limit = rate_limit;
    }
    if let Some(window) = env_config.rate_duration {
        settings.dispatch.rate_window = window;
    }
    if let Some(interval) = env_config.status_duration {
        settings.dispatch.metrics_interval = interval;
    }
    if let Some(verbose) = env_config.verbose {
        settings.verbose = verbose;
    }
    if let Some(log_file) = &env_config.log_file {
        settings.log_file = log_file.clone();
    }
    if env_config.max_in_flight.is_some() {
        settings.dispatch.max_in_flight = env_config.max_in_flight;
    }
    if let Some(resolver) = env_config.resolver {
        settings.resolver = resolver;
    }

    settings
}

fn apply_cli_args_to_settings(mut settings: RunSettings, args: &Args) -> RunSettings {
    if let Some(input) = &args.input {
        settings.input = input.clone();
    }
    if let Some(rate_limit) = args.rate_limit {
        settings.dispatch.rate_limit = rate_limit;
    }
    if let Some(window) = args.rate_duration {
        settings.dispatch.rate_window = window;
    }
    if let Some(interval) = args.status_duration {
        settings.dispatch.metrics_interval = interval;
    }
    // A flag can only switch verbose output on
    if args.verbose {
        settings.verbose = true;
    }
    if let Some(log_file) = &args.log_file {
        settings.log_file = log_file.clone();
    }
    if args.max_in_flight.is_some() {
        settings.dispatch.max_in_flight = args.max_in_flight;
    }
    if let Some(resolver) = args.resolver {
        settings.resolver = resolver;
    }

    settings
}

fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value)
        .ok_or_else(|| format!("invalid duration '{}', use a format like 500ms, 1s or 2m", value))
}

fn parse_resolver_arg(value: &str) -> Result<ResolverKind, String> {
    value.parse::<ResolverKind>().map_err(|e| e.to_string())
}
