//! metascrape - a scraper for extracting cloud provider instance metadata.
//!
//! Crawls an EC2-style instance metadata service, sanitizes every captured
//! value, and writes the aggregated routes to a JSON file. Nothing is
//! written when the crawl fails fatally (wrong service, unreachable apex).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use metascrape_core::{Crawler, ScrapeConfig};
use metascrape_fetch::ReqwestClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// A scraper for extracting cloud provider instance metadata.
#[derive(Parser, Debug)]
#[command(name = "metascrape", version, about)]
struct Cli {
    /// The host where the instance metadata service lives
    #[arg(short = 'H', long, default_value = "169.254.169.254")]
    host: String,

    /// The output file to store scraped information in
    #[arg(short, long, default_value = "metadata.json")]
    output: PathBuf,

    /// The port where the instance metadata service is listening
    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Cap on parallel in-flight fetches
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    /// Set logging verbosity; pass multiple times to increase
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("starting scraper");

    let config = ScrapeConfig {
        max_concurrency: cli.concurrency,
        output_path: cli.output.clone(),
        ..ScrapeConfig::default()
    };
    let output_path = config.output_path.clone();

    let client = ReqwestClient::new().context("failed to build HTTP client")?;
    let crawler = Crawler::new(client, &cli.host, cli.port, config);

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(crawler.crawl())?;

    for failure in &outcome.failures {
        warn!(path = %failure.path, error = %failure.error, "path skipped");
    }

    let json = serde_json::to_string_pretty(&outcome.result)?;
    fs::write(&output_path, json)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    info!(
        routes = outcome.result.len(),
        skipped = outcome.failures.len(),
        output = %output_path.display(),
        "scrape complete"
    );

    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "metascrape={level},metascrape_core={level},metascrape_fetch={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
