//! Phase orchestration.
//!
//! A run is any combination of three phases, executed in this order:
//!
//! 1. **roundup**: collect listing pages and write `roundups.tsv`
//! 2. **scrape**: fetch and extract stories, then fetch and extract articles
//! 3. **compile**: merge everything into `allsides.jsonl`
//!
//! Every phase reads only what earlier phases left in the store, so each can
//! be run on its own against an existing working directory.

use crate::collectors::{ArticleCollector, RoundupCollector, StageReport, StoryCollector};
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::fetch::Fetch;
use crate::models::FetchMode;
use crate::outputs::dataset::{compile, write_jsonl};
use crate::outputs::roundup_index::read_index;
use crate::store::StateStore;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub roundup: bool,
    pub scrape: bool,
    pub compile: bool,
    pub mode: FetchMode,
    pub include_images: bool,
}

impl RunOptions {
    /// Every phase in normal mode, images included.
    #[cfg(test)]
    pub fn all() -> Self {
        Self {
            roundup: true,
            scrape: true,
            compile: true,
            mode: FetchMode::Normal,
            include_images: true,
        }
    }

    pub fn any_phase(&self) -> bool {
        self.roundup || self.scrape || self.compile
    }
}

/// What a run did, phase by phase. Phases that did not run are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub roundups: Option<usize>,
    pub story_fetch: Option<StageReport>,
    pub story_extract: Option<StageReport>,
    pub article_fetch: Option<StageReport>,
    pub article_extract: Option<StageReport>,
    pub compiled: Option<usize>,
}

impl RunSummary {
    /// Items that failed in any stage that ran.
    pub fn failures(&self) -> usize {
        [
            self.story_fetch,
            self.story_extract,
            self.article_fetch,
            self.article_extract,
        ]
        .iter()
        .flatten()
        .map(|r| r.failed)
        .sum()
    }
}

pub struct Pipeline<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
    config: &'a HarvestConfig,
}

impl<'a, S: StateStore, F: Fetch> Pipeline<'a, S, F> {
    pub fn new(store: &'a S, fetcher: &'a F, config: &'a HarvestConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Run the selected phases.
    ///
    /// # Errors
    ///
    /// Only structural failures abort: a missing pager on the first listing
    /// page, a missing roundup index when scraping, or a store failure.
    #[instrument(level = "info", skip_all, fields(roundup = opts.roundup, scrape = opts.scrape, compile = opts.compile, mode = ?opts.mode))]
    pub async fn run(&self, opts: &RunOptions) -> Result<RunSummary, HarvestError> {
        let mut summary = RunSummary::default();
        if !opts.any_phase() {
            warn!("No phase selected; pass --roundup, --scrape or --compile");
            return Ok(summary);
        }

        if opts.roundup {
            info!("Collecting roundups");
            let roundups = RoundupCollector::new(self.store, self.fetcher, self.config, opts.mode.is_force())
                .collect()
                .await?;
            summary.roundups = Some(roundups.len());
        }

        if opts.scrape {
            let roundups = read_index(self.store)?;
            info!(count = roundups.len(), "Collecting stories");
            let stories = StoryCollector::new(self.store, self.fetcher, self.config);
            summary.story_fetch = Some(stories.fetch_all(&roundups, opts.mode.is_force()).await?);
            summary.story_extract = Some(stories.extract_all()?);

            info!("Collecting articles; this might take a while");
            let articles = ArticleCollector::new(self.store, self.fetcher);
            summary.article_fetch = Some(articles.fetch_all(opts.mode).await?);
            summary.article_extract = Some(articles.extract_all()?);
        }

        if opts.compile {
            info!("Compiling dataset");
            let records = compile(self.store, opts.include_images)?;
            write_jsonl(self.store, &records)?;
            summary.compiled = Some(records.len());
        }

        Ok(summary)
    }
}
