//! # AllSides Harvest
//!
//! An incremental, resumable harvester for AllSides headline roundups. It
//! walks three tiers of pages (roundup listings, story pages, and the
//! external articles each story cites), turns each tier into structured
//! records, and compiles everything into one date-sorted JSON lines dataset.
//!
//! ## Usage
//!
//! ```sh
//! allsides_harvest ./data --roundup --scrape --compile
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Roundups**: paginate the listing and write `roundups.tsv`
//! 2. **Stories**: fetch each story page and extract its article list
//! 3. **Articles**: fetch each cited article and extract its readable text
//! 4. **Compile**: merge stories and articles into `allsides.jsonl`
//!
//! Every stage persists raw pages before parsing and skips work already on
//! disk, so an interrupted run resumes where it stopped. Requests are
//! strictly sequential and spaced by a configurable delay.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod collectors;
mod config;
mod error;
mod fetch;
mod ledger;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::HarvestConfig;
use fetch::{HttpFetcher, Paced};
use pipeline::Pipeline;
use store::DirStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("allsides_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Configuration ---
    let mut config = match &args.config {
        Some(path) => HarvestConfig::load(path)?,
        None => HarvestConfig::default(),
    };
    if let Some(delay) = args.delay {
        config.delay_secs = delay;
    }
    config.validate()?;
    info!(base_url = %config.base_url, delay_secs = config.delay_secs, "Configuration ready");

    // Early check: the working directory must be writable
    if let Err(e) = ensure_writable_dir(&args.output_dir) {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let store = DirStore::new(args.output_dir.clone());
    let fetcher = Paced::new(
        HttpFetcher::new(&config.user_agent, config.request_timeout())?,
        config.delay(),
    );

    let summary = Pipeline::new(&store, &fetcher, &config)
        .run(&args.run_options())
        .await
        .inspect_err(|e| error!(error = %e, "Harvest aborted"))?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        roundups = ?summary.roundups,
        compiled = ?summary.compiled,
        failures = summary.failures(),
        "Execution complete"
    );

    Ok(())
}
