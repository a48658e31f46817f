//! nucat - read package catalog feeds from the command line
//!
//! Every command reads a window `(start, end]` of the catalog. Omitting
//! both bounds reads the full history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nucat_core::cancel::{cancel_pair, CancelHandle};
use nucat_core::catalog::{parse_commit_timestamp, CatalogReader, TimeWindow};
use nucat_core::config::CatalogConfig;

mod commands;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "nucat",
    about = "Incremental reader for package catalog feeds",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: commands::Command,

    /// Catalog index URL (overrides config and NUCAT_INDEX_URL)
    #[clap(long, global = true)]
    index_url: Option<String>,

    /// Maximum page fetches in flight
    #[clap(long, global = true)]
    max_concurrency: Option<usize>,

    /// Configuration file (defaults to the user config directory)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit structured JSON logs with source locations
    #[clap(long, global = true)]
    trace: bool,
}

/// Time bounds shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct WindowArgs {
    /// Exclusive lower bound (RFC 3339), e.g. the previous run's end
    #[clap(long, value_parser = parse_time)]
    start: Option<DateTime<Utc>>,

    /// Inclusive upper bound (RFC 3339), defaults to now
    #[clap(long, value_parser = parse_time)]
    end: Option<DateTime<Utc>>,
}

impl WindowArgs {
    /// `None` means the full history
    pub fn window(&self) -> Result<Option<TimeWindow>> {
        let window = match (self.start, self.end) {
            (None, None) => return Ok(None),
            (Some(start), None) => TimeWindow::since(start)?,
            (None, Some(end)) => TimeWindow::until(end),
            (Some(start), Some(end)) => TimeWindow::new(start, end)?,
        };
        Ok(Some(window))
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    parse_commit_timestamp(value)
        .ok_or_else(|| format!("'{value}' is not an RFC 3339 timestamp with offset"))
}

/// Initialize tracing with CLI flags
fn initialize_tracing(log_level: &LogLevel, structured: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if structured {
        // JSON output for structured tracing - MUST go to stderr
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<CatalogConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            let mut config = CatalogConfig::load_from_path(path)?;
            config.apply_env()?;
            config
        }
        None => CatalogConfig::load()?,
    };

    if let Some(url) = &cli.index_url {
        config.index_url = url.clone();
    }
    if let Some(max_concurrency) = cli.max_concurrency {
        config.set_concurrency(max_concurrency);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Cancel reads on Ctrl-C
fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling catalog read");
            handle.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.trace);

    let config = load_config(&cli)?;
    tracing::debug!("Using catalog index {}", config.index_url);

    let (handle, token) = cancel_pair();
    cancel_on_ctrl_c(handle);

    let reader = CatalogReader::from_config(&config)?.with_cancellation(token);

    cli.command.execute(&reader).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_window_args() {
        let cli = Cli::parse_from([
            "nucat",
            "entries",
            "--start",
            "2016-07-30T00:05:22.6952071Z",
            "--end",
            "2016-07-30T00:06:21.8534934Z",
        ]);
        let commands::Command::Entries { window, .. } = cli.command else {
            panic!("expected entries command");
        };
        let window = window.window().unwrap().unwrap();
        assert!(window.start() < window.end());
    }

    #[test]
    fn test_missing_window_is_full_history() {
        let cli = Cli::parse_from(["nucat", "rollup"]);
        let commands::Command::Rollup { window, .. } = cli.command else {
            panic!("expected rollup command");
        };
        assert!(window.window().unwrap().is_none());
    }

    #[test]
    fn test_rejects_timestamp_without_offset() {
        let result = Cli::try_parse_from(["nucat", "entries", "--start", "2016-07-30T00:05:22"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let cli = Cli::parse_from([
            "nucat",
            "pages",
            "--start",
            "2016-07-31T00:00:00Z",
            "--end",
            "2016-07-30T00:00:00Z",
        ]);
        let commands::Command::Pages { window } = cli.command else {
            panic!("expected pages command");
        };
        assert!(window.window().is_err());
    }

    #[test]
    fn test_packages_exclude_deleted_flag() {
        let cli = Cli::parse_from(["nucat", "packages", "--exclude-deleted", "-o", "packages.json"]);
        let commands::Command::Packages {
            exclude_deleted,
            output,
            ..
        } = cli.command
        else {
            panic!("expected packages command");
        };
        assert!(exclude_deleted);
        assert_eq!(output, Some(PathBuf::from("packages.json")));
    }

    #[test]
    fn test_global_overrides() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "max_concurrency: 4\n").unwrap();

        let cli = Cli::parse_from([
            "nucat",
            "packages",
            "--config",
            path.to_str().unwrap(),
            "--index-url",
            "https://mirror.example.org/catalog0/index.json",
            "--max-concurrency",
            "8",
        ]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.index_url, "https://mirror.example.org/catalog0/index.json");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.full_scan_concurrency, 8);
    }
}
