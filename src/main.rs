//! Strata main entry point
//!
//! This is the command-line interface for the Strata crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use strata::config::{load_config, validate, Config};
use strata::output::print_statistics;
use strata::url::HostFilter;
use strata::{CrawlRequest, Crawler, HttpSource, ShutdownReport};
use tracing_subscriber::EnvFilter;

/// Strata: a layered breadth-first web crawler
///
/// Downloads pages breadth-first from URL, following links up to DEPTH hops,
/// with bounded concurrent downloads, link extraction and per-host downloads.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "A layered breadth-first web crawler", long_about = None)]
struct Cli {
    /// Seed URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Link hops to follow from the seed
    #[arg(value_name = "DEPTH")]
    depth: Option<u32>,

    /// Maximum concurrent downloads
    #[arg(value_name = "DOWNLOADERS")]
    downloaders: Option<usize>,

    /// Maximum concurrent link extractions
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Maximum concurrent downloads per host
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only download discovered pages on this host (repeatable, `*.domain` allowed)
    #[arg(long = "allow-host", value_name = "HOST", conflicts_with = "exclude")]
    allow_hosts: Vec<String>,

    /// Skip hosts containing this substring (repeatable)
    #[arg(long, value_name = "SUBSTR")]
    exclude: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let request = CrawlRequest::new(cli.url.clone(), config.crawler.depth)
        .with_filter(host_filter(&config));

    let source = HttpSource::from_config(&config).context("Failed to build HTTP client")?;
    let crawler = Crawler::from_config(&config, Arc::new(source))
        .context("Failed to start crawler")?;

    // Ctrl-C closes the crawler; the crawl still returns what it settled
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let (result, report) = crawler.run_until(request, interrupt).await;
    if let Some(report) = report {
        log_shutdown(report);
    }

    if !cli.quiet {
        print_statistics(&result);
    }

    log_shutdown(crawler.close().await);

    Ok(())
}

fn log_shutdown(report: ShutdownReport) {
    if let ShutdownReport::TimedOut { outstanding } = report {
        tracing::error!("{} tasks still running at exit", outstanding);
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("strata=info,warn"),
            1 => EnvFilter::new("strata=debug,info"),
            2 => EnvFilter::new("strata=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.depth {
        config.crawler.depth = depth;
    }
    if cli.downloaders.is_some() {
        config.crawler.downloaders = cli.downloaders;
    }
    if cli.extractors.is_some() {
        config.crawler.extractors = cli.extractors;
    }
    if cli.per_host.is_some() {
        config.crawler.per_host = cli.per_host;
    }
    if !cli.allow_hosts.is_empty() {
        config.filter.allowed_hosts = cli.allow_hosts.clone();
        config.filter.excluded_hosts.clear();
    }
    if !cli.exclude.is_empty() {
        config.filter.excluded_hosts = cli.exclude.clone();
        config.filter.allowed_hosts.clear();
    }

    validate(&config).context("Invalid settings")?;
    Ok(config)
}

fn host_filter(config: &Config) -> HostFilter {
    if !config.filter.allowed_hosts.is_empty() {
        HostFilter::allow(config.filter.allowed_hosts.iter().cloned())
    } else if !config.filter.excluded_hosts.is_empty() {
        HostFilter::exclude(config.filter.excluded_hosts.iter().cloned())
    } else {
        HostFilter::Any
    }
}
