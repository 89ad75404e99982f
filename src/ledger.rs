//! Per-article fetch and extraction state.
//!
//! Every article moves through a small state machine:
//!
//! ```text
//!            fetch ok              extract ok
//! Pending ───────────▶ Fetched ───────────────▶ Extracted
//!    │                   ▲  │ extract error: stays Fetched,
//!    │ fetch error       │  │ appended to <id>.extract.err
//!    ▼        retry ok   │
//! Errored ───────────────┘
//! ```
//!
//! The current state is written to `<id>.state.json` after each transition.
//! Artifacts are written before the record, so a crash can leave the record
//! one step behind. [`ArticleLedger::state`] therefore trusts the record only
//! when the artifacts on disk agree with it, and otherwise infers the state
//! from the artifacts alone. Working directories from runs that predate the
//! record are handled the same way.
//!
//! Fetched and errored are mutually exclusive: each transition removes the
//! opposing artifact before writing its own.

use crate::error::StoreError;
use crate::models::{ArticleId, ExtractedArticle, FetchMode, StoryKey};
use crate::store::{StateStore, layout};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Pending,
    Fetched,
    Errored,
    Extracted,
}

/// Which artifacts exist for one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Artifacts {
    pub html: bool,
    pub err: bool,
    pub json: bool,
}

impl ArticleStatus {
    fn inferred(a: Artifacts) -> Self {
        match (a.html, a.json, a.err) {
            (true, true, _) => ArticleStatus::Extracted,
            (true, false, _) => ArticleStatus::Fetched,
            (false, _, true) => ArticleStatus::Errored,
            (false, _, false) => ArticleStatus::Pending,
        }
    }

    fn consistent_with(self, a: Artifacts) -> bool {
        match self {
            ArticleStatus::Pending => !a.html && !a.err,
            ArticleStatus::Fetched => a.html && !a.err && !a.json,
            ArticleStatus::Extracted => a.html && !a.err && a.json,
            ArticleStatus::Errored => a.err && !a.html,
        }
    }
}

/// Persisted state of one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleState {
    pub status: ArticleStatus,
    /// Number of fetch attempts made so far.
    pub attempts: u32,
    /// Time of the last recorded transition; `None` if never recorded.
    pub updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ArticleState {
    fn pending() -> Self {
        Self {
            status: ArticleStatus::Pending,
            attempts: 0,
            updated_at: None,
            last_error: None,
        }
    }
}

/// Whether the article stage should hit the network for an item.
///
/// Fetched items are refetched only when forced; errored items when forced
/// or when errors are being retried.
pub fn should_fetch(status: ArticleStatus, mode: FetchMode) -> bool {
    match status {
        ArticleStatus::Pending => true,
        ArticleStatus::Fetched | ArticleStatus::Extracted => mode == FetchMode::ForceRefetch,
        ArticleStatus::Errored => {
            matches!(mode, FetchMode::ForceRefetch | FetchMode::RetryErrors)
        }
    }
}

/// Reads and records state for one article of one story.
pub struct ArticleLedger<'a, S> {
    store: &'a S,
    story: &'a StoryKey,
    id: ArticleId,
}

impl<'a, S: StateStore> ArticleLedger<'a, S> {
    pub fn new(store: &'a S, story: &'a StoryKey, id: ArticleId) -> Self {
        Self { store, story, id }
    }

    pub fn html_key(&self) -> String {
        layout::article_html(self.story, self.id)
    }

    pub fn err_key(&self) -> String {
        layout::article_err(self.story, self.id)
    }

    pub fn json_key(&self) -> String {
        layout::article_json(self.story, self.id)
    }

    fn state_key(&self) -> String {
        layout::article_state(self.story, self.id)
    }

    fn artifacts(&self) -> Result<Artifacts, StoreError> {
        Ok(Artifacts {
            html: self.store.exists(&self.html_key())?,
            err: self.store.exists(&self.err_key())?,
            json: self.store.exists(&self.json_key())?,
        })
    }

    /// Current state, reconciled against the artifacts on disk.
    ///
    /// A record that does not deserialize is treated like a missing one.
    /// Any other store failure is returned.
    pub fn state(&self) -> Result<ArticleState, StoreError> {
        let artifacts = self.artifacts()?;
        let recorded = match self.store.read_json::<ArticleState>(&self.state_key()) {
            Ok(recorded) => recorded,
            Err(e @ StoreError::Json { .. }) => {
                warn!(story = %self.story, id = self.id.0, error = %e, "Ignoring corrupt state record");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(match recorded {
            Some(state) if state.status.consistent_with(artifacts) => state,
            Some(state) => ArticleState {
                status: ArticleStatus::inferred(artifacts),
                ..state
            },
            None => ArticleState {
                status: ArticleStatus::inferred(artifacts),
                ..ArticleState::pending()
            },
        })
    }

    /// Record a successful fetch, replacing any error marker and any
    /// extraction made from a previous copy of the page.
    pub fn mark_fetched(&self, prev: &ArticleState, body: &str) -> Result<ArticleState, StoreError> {
        self.store.remove(&self.err_key())?;
        self.store.remove(&self.json_key())?;
        self.store.write(&self.html_key(), body.as_bytes())?;
        self.save(ArticleState {
            status: ArticleStatus::Fetched,
            attempts: prev.attempts + 1,
            updated_at: Some(Utc::now()),
            last_error: None,
        })
    }

    /// Record a failed fetch, replacing any previously fetched page.
    pub fn mark_fetch_error(&self, prev: &ArticleState, message: &str) -> Result<ArticleState, StoreError> {
        self.store.remove(&self.html_key())?;
        self.store.remove(&self.json_key())?;
        self.store.write(&self.err_key(), format!("{message}\n").as_bytes())?;
        self.save(ArticleState {
            status: ArticleStatus::Errored,
            attempts: prev.attempts + 1,
            updated_at: Some(Utc::now()),
            last_error: Some(message.to_string()),
        })
    }

    pub fn mark_extracted(&self, prev: &ArticleState, article: &ExtractedArticle) -> Result<ArticleState, StoreError> {
        self.store.write_json(&self.json_key(), article)?;
        self.save(ArticleState {
            status: ArticleStatus::Extracted,
            updated_at: Some(Utc::now()),
            last_error: None,
            ..prev.clone()
        })
    }

    /// Append an extraction failure to the article's error log. The page
    /// stays fetched, so the next extraction pass retries it.
    pub fn log_extract_error(&self, prev: &ArticleState, message: &str) -> Result<ArticleState, StoreError> {
        let now = Utc::now();
        let line = format!("{} {message}\n", now.to_rfc3339());
        self.store
            .append(&layout::article_extract_err(self.story, self.id), line.as_bytes())?;
        self.save(ArticleState {
            status: ArticleStatus::Fetched,
            updated_at: Some(now),
            last_error: Some(message.to_string()),
            ..prev.clone()
        })
    }

    fn save(&self, state: ArticleState) -> Result<ArticleState, StoreError> {
        self.store.write_json(&self.state_key(), &state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn story() -> StoryKey {
        StoryKey::parse("2020-01-05.foo-bar").unwrap()
    }

    #[test]
    fn test_should_fetch_matrix() {
        use ArticleStatus::*;
        use FetchMode::*;
        assert!(should_fetch(Pending, Normal));
        assert!(!should_fetch(Fetched, Normal));
        assert!(!should_fetch(Extracted, RetryErrors));
        assert!(should_fetch(Extracted, ForceRefetch));
        assert!(!should_fetch(Errored, Normal));
        assert!(should_fetch(Errored, RetryErrors));
        assert!(should_fetch(Errored, ForceRefetch));
    }

    #[test]
    fn test_state_inferred_without_record() {
        let store = MemoryStore::new();
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(0));
        assert_eq!(ledger.state().unwrap().status, ArticleStatus::Pending);

        store.write(&ledger.err_key(), b"HTTP 500").unwrap();
        assert_eq!(ledger.state().unwrap().status, ArticleStatus::Errored);

        store.remove(&ledger.err_key()).unwrap();
        store.write(&ledger.html_key(), b"<html/>").unwrap();
        assert_eq!(ledger.state().unwrap().status, ArticleStatus::Fetched);

        store.write(&ledger.json_key(), b"{}").unwrap();
        assert_eq!(ledger.state().unwrap().status, ArticleStatus::Extracted);
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let store = MemoryStore::new();
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(0));
        store.write(&ledger.html_key(), b"<html/>").unwrap();
        store.write(&ledger.state_key(), b"{\"status\": ").unwrap();
        assert_eq!(ledger.state().unwrap().status, ArticleStatus::Fetched);
    }

    #[test]
    fn test_unreadable_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::store::DirStore::new(dir.path().to_path_buf());
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(0));
        // A directory where the record should be cannot be read as a file.
        std::fs::create_dir_all(dir.path().join(ledger.state_key())).unwrap();

        assert!(matches!(ledger.state(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_fetch_error_then_retry_replaces_marker() {
        let store = MemoryStore::new();
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(1));

        let s0 = ledger.state().unwrap();
        let s1 = ledger.mark_fetch_error(&s0, "HTTP 404 Not Found").unwrap();
        assert_eq!(s1.status, ArticleStatus::Errored);
        assert_eq!(s1.attempts, 1);
        assert!(store.exists(&ledger.err_key()).unwrap());
        assert!(!store.exists(&ledger.html_key()).unwrap());

        let s2 = ledger.mark_fetched(&s1, "<html>ok</html>").unwrap();
        assert_eq!(s2.status, ArticleStatus::Fetched);
        assert_eq!(s2.attempts, 2);
        assert_eq!(s2.last_error, None);
        assert!(!store.exists(&ledger.err_key()).unwrap());
        assert!(store.exists(&ledger.html_key()).unwrap());
        assert_eq!(ledger.state().unwrap(), s2);
    }

    #[test]
    fn test_failed_refetch_replaces_page() {
        let store = MemoryStore::new();
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(0));
        let s = ledger.mark_fetched(&ledger.state().unwrap(), "<html/>").unwrap();
        let s = ledger
            .mark_extracted(
                &s,
                &ExtractedArticle {
                    title: "t".into(),
                    text: "x".into(),
                    top_image: None,
                    images: Default::default(),
                },
            )
            .unwrap();
        assert_eq!(s.status, ArticleStatus::Extracted);

        let s = ledger.mark_fetch_error(&s, "connection reset").unwrap();
        assert_eq!(s.status, ArticleStatus::Errored);
        assert!(!store.exists(&ledger.html_key()).unwrap());
        assert!(!store.exists(&ledger.json_key()).unwrap());
    }

    #[test]
    fn test_stale_record_yields_to_artifacts() {
        let store = MemoryStore::new();
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(0));
        let s = ledger.mark_fetch_error(&ledger.state().unwrap(), "timeout").unwrap();

        // A retry wrote the page and removed the marker, then the process died
        // before the record was updated.
        store.remove(&ledger.err_key()).unwrap();
        store.write(&ledger.html_key(), b"<html/>").unwrap();

        let state = ledger.state().unwrap();
        assert_eq!(state.status, ArticleStatus::Fetched);
        assert_eq!(state.attempts, s.attempts);
    }

    #[test]
    fn test_extract_error_appends_and_stays_fetched() {
        let store = MemoryStore::new();
        let story = story();
        let ledger = ArticleLedger::new(&store, &story, ArticleId(3));
        let s = ledger.mark_fetched(&ledger.state().unwrap(), "<html/>").unwrap();
        let s = ledger.log_extract_error(&s, "no readable content").unwrap();
        let s = ledger.log_extract_error(&s, "no readable content").unwrap();
        assert_eq!(s.status, ArticleStatus::Fetched);

        let log = store
            .read_string("story/2020-01-05.foo-bar/3.extract.err")
            .unwrap()
            .unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(!store.exists(&ledger.err_key()).unwrap());
        assert_eq!(ledger.state().unwrap().status, ArticleStatus::Fetched);
    }

    #[test]
    fn test_state_record_serializes_snake_case() {
        let state = ArticleState {
            status: ArticleStatus::Extracted,
            attempts: 1,
            updated_at: None,
            last_error: None,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "extracted");
    }
}
