//! The three collection stages.
//!
//! Each collector borrows the shared [`StateStore`](crate::store::StateStore)
//! and [`Fetch`](crate::fetch::Fetch) implementation and decides, item by
//! item, whether to fetch, skip, or record a failure:
//!
//! | Stage | Module | Skips when |
//! |-------|--------|------------|
//! | Roundups | [`roundups`] | the listing page is already on disk |
//! | Stories | [`stories`] | `story.html` exists; extraction when `story.json` exists |
//! | Articles | [`articles`] | the article ledger says fetched, or errored without a retry |
//!
//! Per-item failures are logged and tallied in a [`StageReport`]; only
//! structural failures end a stage early.

pub mod articles;
pub mod roundups;
pub mod stories;

pub use articles::ArticleCollector;
pub use roundups::RoundupCollector;
pub use stories::StoryCollector;

/// What a single fetch decision did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    /// Nothing requested; a completed artifact is already stored.
    Skipped,
    Failed,
}

/// Per-stage counts, logged when a stage finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Items fetched from the network.
    pub fetched: usize,
    /// Items left alone because a completed artifact exists.
    pub skipped: usize,
    /// Items whose fetch or extraction failed this run.
    pub failed: usize,
    /// Items turned into structured records this run.
    pub extracted: usize,
    /// Items with no usable content, such as stories without coverage.
    pub empty: usize,
}

impl StageReport {
    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Fetched => self.fetched += 1,
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Failed => self.failed += 1,
        }
    }

    pub fn log(&self, stage: &'static str) {
        tracing::info!(
            stage,
            fetched = self.fetched,
            skipped = self.skipped,
            failed = self.failed,
            extracted = self.extracted,
            empty = self.empty,
            "Stage complete"
        );
    }
}
