//! Story page collection and extraction.
//!
//! Fetching walks the roundup index and stores each story page as
//! `story/<date>.<slug>/story.html`. Extraction walks the story directories
//! and writes `story.json` once per directory. The article list in that record
//! fixes every article's id, so it is never rewritten, even on a forced refetch.

use crate::collectors::{FetchOutcome, StageReport};
use crate::config::HarvestConfig;
use crate::error::StoreError;
use crate::fetch::{Fetch, Method};
use crate::models::{Roundup, Story, StoryKey};
use crate::scrapers::story::{StoryPage, parse_story};
use crate::store::{StateStore, layout};
use tracing::{debug, info, instrument, warn};

/// What extracting one story directory did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// `story.json` already exists.
    AlreadyDone,
    /// No `story.html` in the directory.
    MissingPage,
    Extracted(Story),
    NoCoverage,
    Failed,
}

pub struct StoryCollector<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
    config: &'a HarvestConfig,
}

impl<'a, S: StateStore, F: Fetch> StoryCollector<'a, S, F> {
    pub fn new(store: &'a S, fetcher: &'a F, config: &'a HarvestConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    #[instrument(level = "info", skip_all, fields(roundups = roundups.len(), force_refetch = force_refetch))]
    pub async fn fetch_all(&self, roundups: &[Roundup], force_refetch: bool) -> Result<StageReport, StoreError> {
        let mut report = StageReport::default();
        for roundup in roundups {
            report.record(self.fetch_story(roundup, force_refetch).await?);
        }
        report.log("story fetch");
        Ok(report)
    }

    /// Fetch one story page unless it is already stored.
    ///
    /// Failed fetches leave nothing behind, so the story is tried again on
    /// the next run.
    ///
    /// # Arguments
    ///
    /// * `roundup` - The index row naming the story and its date
    /// * `force_refetch` - Fetch even when `story.html` already exists
    ///
    /// # Returns
    ///
    /// `Fetched`, `Skipped`, or `Failed` for an error status, a transport
    /// failure, or a url without a usable slug. Only store errors are `Err`.
    pub async fn fetch_story(&self, roundup: &Roundup, force_refetch: bool) -> Result<FetchOutcome, StoreError> {
        let Some(key) = roundup.story_key() else {
            warn!(url = %roundup.url, "Roundup url has no usable story slug");
            return Ok(FetchOutcome::Failed);
        };
        let html_key = layout::story_html(&key);
        if !force_refetch && self.store.exists(&html_key)? {
            debug!(story = %key, "Story page already on disk");
            return Ok(FetchOutcome::Skipped);
        }

        let Some(url) = self.config.story_url(&roundup.url) else {
            warn!(story = %key, url = %roundup.url, "Cannot build story url");
            return Ok(FetchOutcome::Failed);
        };

        match self.fetcher.fetch(Method::Get, &url).await {
            Ok(response) if response.is_success() => {
                self.store.write(&html_key, response.body.as_bytes())?;
                info!(story = %key, bytes = response.body.len(), "Fetched story");
                Ok(FetchOutcome::Fetched)
            }
            Ok(response) => {
                warn!(story = %key, status = response.status, %url, "Story page returned an error status");
                Ok(FetchOutcome::Failed)
            }
            Err(e) => {
                warn!(story = %key, %url, error = %e, "Story page fetch failed");
                Ok(FetchOutcome::Failed)
            }
        }
    }

    /// Extract every story directory that has no `story.json` yet.
    #[instrument(level = "info", skip_all)]
    pub fn extract_all(&self) -> Result<StageReport, StoreError> {
        let mut report = StageReport::default();
        for dir in self.store.list(layout::STORY_ROOT)? {
            let Some(key) = StoryKey::parse(&dir) else {
                warn!(%dir, "Skipping directory with unrecognized name");
                continue;
            };
            match self.extract_story(&key)? {
                ExtractOutcome::AlreadyDone | ExtractOutcome::MissingPage => report.skipped += 1,
                ExtractOutcome::Extracted(_) => report.extracted += 1,
                ExtractOutcome::NoCoverage => report.empty += 1,
                ExtractOutcome::Failed => report.failed += 1,
            }
        }
        report.log("story extract");
        Ok(report)
    }

    /// Turn a stored `story.html` into `story.json`, at most once.
    ///
    /// # Returns
    ///
    /// The [`ExtractOutcome`]; parse failures are `Failed`, not `Err`.
    pub fn extract_story(&self, key: &StoryKey) -> Result<ExtractOutcome, StoreError> {
        let json_key = layout::story_json(key);
        if self.store.exists(&json_key)? {
            debug!(story = %key, "Story already extracted");
            return Ok(ExtractOutcome::AlreadyDone);
        }
        let Some(html) = self.store.read_string(&layout::story_html(key))? else {
            debug!(story = %key, "No story page to extract");
            return Ok(ExtractOutcome::MissingPage);
        };

        match parse_story(&html) {
            Ok(StoryPage::Story(story)) => {
                self.store.write_json(&json_key, &story)?;
                info!(story = %key, articles = story.articles.len(), "Extracted story");
                Ok(ExtractOutcome::Extracted(story))
            }
            Ok(StoryPage::NoCoverage) => {
                info!(story = %key, "No featured coverage; skipping");
                Ok(ExtractOutcome::NoCoverage)
            }
            Err(e) => {
                warn!(story = %key, error = %e, "Story extraction failed");
                Ok(ExtractOutcome::Failed)
            }
        }
    }
}
