//! Article page collection and extraction.
//!
//! Articles are addressed by their position in a story's persisted article
//! list. Each one has an [`ArticleLedger`] that decides whether it needs a
//! fetch under the current [`FetchMode`] and records every transition.
//!
//! A non-2xx response or transport failure writes a `<id>.err` marker holding
//! the reason. Errored articles are left alone until the operator asks for a
//! retry or a forced refetch. Extraction failures are different: they are
//! appended to `<id>.extract.err` and the page is extracted again on the
//! next pass.

use crate::collectors::{FetchOutcome, StageReport};
use crate::error::StoreError;
use crate::fetch::{Fetch, Method};
use crate::ledger::{ArticleLedger, ArticleStatus, should_fetch};
use crate::models::{ArticleId, ArticleRef, FetchMode, Story, StoryKey};
use crate::scrapers::article::extract_article;
use crate::store::{StateStore, layout};
use crate::utils::truncate_for_log;
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

/// What extracting one article did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    Extracted,
    /// Not in the fetched state: already extracted, errored, or never fetched.
    NotReady,
    Failed,
}

pub struct ArticleCollector<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
}

/// The message stored in an `.err` marker for a non-2xx response.
pub fn status_message(status: u16, url: &str) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    format!("HTTP {status} {reason} for {url}")
}

impl<'a, S: StateStore, F: Fetch> ArticleCollector<'a, S, F> {
    pub fn new(store: &'a S, fetcher: &'a F) -> Self {
        Self { store, fetcher }
    }

    /// Story directories with a persisted story record, in directory order.
    fn stories(&self) -> Result<Vec<(StoryKey, Story)>, StoreError> {
        let mut stories = Vec::new();
        for dir in self.store.list(layout::STORY_ROOT)? {
            let Some(key) = StoryKey::parse(&dir) else {
                continue;
            };
            match self.store.read_json::<Story>(&layout::story_json(&key)) {
                Ok(Some(story)) => stories.push((key, story)),
                Ok(None) => debug!(story = %key, "No story record; no articles to collect"),
                Err(e) => warn!(story = %key, error = %e, "Unreadable story record; skipping"),
            }
        }
        Ok(stories)
    }

    #[instrument(level = "info", skip_all, fields(mode = ?mode))]
    pub async fn fetch_all(&self, mode: FetchMode) -> Result<StageReport, StoreError> {
        let mut report = StageReport::default();
        for (key, story) in self.stories()? {
            for (id, reference) in story.indexed_articles() {
                report.record(self.fetch_article(&key, id, reference, mode).await?);
            }
        }
        report.log("article fetch");
        Ok(report)
    }

    /// Fetch one article if its current state and `mode` call for it.
    ///
    /// # Arguments
    ///
    /// * `story` - Directory the article's artifacts live in
    /// * `id` - Position of the article in the story record
    /// * `reference` - The article's url and source
    /// * `mode` - Which states are eligible for a fetch
    ///
    /// # Returns
    ///
    /// `Skipped` when the ledger says no, `Fetched` after the page is stored,
    /// or `Failed` after an `.err` marker is written. Only store errors are
    /// returned as `Err`.
    pub async fn fetch_article(
        &self,
        story: &StoryKey,
        id: ArticleId,
        reference: &ArticleRef,
        mode: FetchMode,
    ) -> Result<FetchOutcome, StoreError> {
        let ledger = ArticleLedger::new(self.store, story, id);
        let state = ledger.state()?;
        if !should_fetch(state.status, mode) {
            debug!(%story, %id, status = ?state.status, "Skipping article");
            return Ok(FetchOutcome::Skipped);
        }

        match self.fetcher.fetch(Method::Get, &reference.url).await {
            Ok(response) if response.is_success() => {
                ledger.mark_fetched(&state, &response.body)?;
                info!(%story, %id, source = %reference.source, url = %response.url, bytes = response.body.len(), "Fetched article");
                Ok(FetchOutcome::Fetched)
            }
            Ok(response) => {
                let message = status_message(response.status, &reference.url);
                warn!(%story, %id, status = response.status, url = %reference.url, "Article returned an error status");
                ledger.mark_fetch_error(&state, &message)?;
                Ok(FetchOutcome::Failed)
            }
            Err(e) => {
                warn!(%story, %id, url = %reference.url, error = %e, "Article fetch failed");
                ledger.mark_fetch_error(&state, &e.to_string())?;
                Ok(FetchOutcome::Failed)
            }
        }
    }

    /// Extract every fetched article that has no extraction result.
    #[instrument(level = "info", skip_all)]
    pub fn extract_all(&self) -> Result<StageReport, StoreError> {
        let mut report = StageReport::default();
        for (key, story) in self.stories()? {
            for (id, reference) in story.indexed_articles() {
                match self.extract_article(&key, id, reference)? {
                    ExtractOutcome::Extracted => report.extracted += 1,
                    ExtractOutcome::NotReady => report.skipped += 1,
                    ExtractOutcome::Failed => report.failed += 1,
                }
            }
        }
        report.log("article extract");
        Ok(report)
    }

    /// Run readability over a fetched article and store the result.
    ///
    /// # Arguments
    ///
    /// * `story` - Directory the article's artifacts live in
    /// * `id` - Position of the article in the story record
    /// * `reference` - Carries the url readability resolves links against
    ///
    /// # Returns
    ///
    /// `NotReady` unless the article is in the fetched state, otherwise
    /// `Extracted` or `Failed`. An extraction failure is appended to the
    /// article's extract log and the article stays fetched.
    pub fn extract_article(
        &self,
        story: &StoryKey,
        id: ArticleId,
        reference: &ArticleRef,
    ) -> Result<ExtractOutcome, StoreError> {
        let ledger = ArticleLedger::new(self.store, story, id);
        let state = ledger.state()?;
        if state.status != ArticleStatus::Fetched {
            return Ok(ExtractOutcome::NotReady);
        }
        let Some(html) = self.store.read_string(&ledger.html_key())? else {
            return Ok(ExtractOutcome::NotReady);
        };

        match extract_article(&html, &reference.url) {
            Ok(article) => {
                ledger.mark_extracted(&state, &article)?;
                debug!(%story, %id, title = %truncate_for_log(&article.title, 80), "Extracted article");
                Ok(ExtractOutcome::Extracted)
            }
            Err(e) => {
                warn!(%story, %id, error = %e, "Article extraction failed; will retry next pass");
                ledger.log_extract_error(&state, &e.to_string())?;
                Ok(ExtractOutcome::Failed)
            }
        }
    }
}
