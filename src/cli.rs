//! Command-line interface definitions.
//!
//! Phases are opt-in: pass any combination of `--roundup`, `--scrape` and
//! `--compile`. They always run in that order.

use crate::models::FetchMode;
use crate::pipeline::RunOptions;
use clap::Parser;
use std::path::PathBuf;

/// Harvest AllSides headline roundups, their stories and the articles they
/// cite, and compile them into a JSON lines dataset.
///
/// # Examples
///
/// ```sh
/// # Everything, from scratch or resuming
/// allsides_harvest ./data -r -s -c
///
/// # Retry failed article downloads, then rebuild the dataset
/// allsides_harvest ./data -s -c --retry-errors
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Working directory for raw pages, records and the dataset
    pub output_dir: PathBuf,

    /// Download roundup listing pages and write roundups.tsv
    #[arg(short, long)]
    pub roundup: bool,

    /// Download and parse stories, then download and parse their articles
    #[arg(short, long)]
    pub scrape: bool,

    /// Compile extracted articles into allsides.jsonl
    #[arg(short, long)]
    pub compile: bool,

    /// Download pages again even if they already exist
    #[arg(long)]
    pub redownload: bool,

    /// Retry articles whose previous download failed
    #[arg(long)]
    pub retry_errors: bool,

    /// Seconds to wait between requests (overrides the config file)
    #[arg(short, long, env = "ALLSIDES_DELAY")]
    pub delay: Option<f64>,

    /// Optional path to a YAML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Leave top_image and images out of the compiled dataset
    #[arg(long)]
    pub no_images: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            roundup: self.roundup,
            scrape: self.scrape,
            compile: self.compile,
            mode: FetchMode::from_flags(self.redownload, self.retry_errors),
            include_images: !self.no_images,
        }
    }
}
