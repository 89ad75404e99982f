//! Records produced and consumed by the pipeline.
//!
//! This module defines the data structures passed between the stages:
//! - [`Roundup`]: one listing row pointing at a story
//! - [`Story`] and [`ArticleRef`]: a story page and the articles it references
//! - [`ExtractedArticle`]: the readable content of one article page
//! - [`CompiledRecord`] and [`CompiledArticle`]: the merged dataset rows
//!
//! Identity types ([`StoryKey`], [`ArticleId`]) tie records to their location
//! in the working directory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Format used for every date written by the pipeline.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A headline roundup entry as listed on a roundup page.
///
/// Roundups are created once by listing collection and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roundup {
    /// The headline shown in the listing.
    pub title: String,
    /// Site-relative path to the story, e.g. `/story/foo-bar`.
    pub url: String,
    /// The topic column; empty cells become `None`.
    pub topic: Option<String>,
    /// The listing date. Rows without one never become a `Roundup`.
    pub date: NaiveDate,
}

impl Roundup {
    /// The on-disk identity of the story this roundup points at.
    ///
    /// Returns `None` when the url has no path segment that can name a
    /// directory.
    pub fn story_key(&self) -> Option<StoryKey> {
        StoryKey::new(self.date, crate::utils::last_path_segment(&self.url)?)
    }
}

/// Identity of a story directory: `<date>.<slug>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoryKey {
    pub date: NaiveDate,
    pub slug: String,
}

impl StoryKey {
    /// Build a key, rejecting slugs that cannot be a single path component.
    pub fn new(date: NaiveDate, slug: &str) -> Option<Self> {
        if slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']) {
            return None;
        }
        Some(Self {
            date,
            slug: slug.to_string(),
        })
    }

    /// Parse a directory name of the form `2020-01-05.foo-bar`.
    pub fn parse(dir_name: &str) -> Option<Self> {
        let (date, slug) = dir_name.split_once('.')?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Self::new(date, slug)
    }
}

impl fmt::Display for StoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.date.format(DATE_FORMAT), self.slug)
    }
}

/// Position of an article in its story's persisted article list.
///
/// The list is written once, so the position is a stable identifier and is
/// reused as the file stem of every per-article artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleId(pub usize);

impl ArticleId {
    /// Parse the numeric stem of an artifact file name such as `12.json`.
    pub fn from_file_name(name: &str, extension: &str) -> Option<Self> {
        let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok().map(ArticleId)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A story page: the topic summary plus the coverage from each side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Story {
    pub title: String,
    /// Tag slugs in page order.
    pub tags: Vec<String>,
    pub summary: String,
    /// Referenced articles in page order. Position is identity.
    pub articles: Vec<ArticleRef>,
}

impl Story {
    /// Articles paired with their stable ids.
    pub fn indexed_articles(&self) -> impl Iterator<Item = (ArticleId, &ArticleRef)> {
        self.articles
            .iter()
            .enumerate()
            .map(|(i, a)| (ArticleId(i), a))
    }

    pub fn article(&self, id: ArticleId) -> Option<&ArticleRef> {
        self.articles.get(id.0)
    }
}

/// An article as referenced from a story page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRef {
    pub title: String,
    /// Bias label at the time the story was published, e.g. `Lean Left`.
    pub side: String,
    /// Publisher name.
    pub source: String,
    /// Absolute URL of the external article.
    pub url: String,
}

/// Readable content extracted from one raw article page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub text: String,
    pub top_image: Option<String>,
    pub images: BTreeSet<String>,
}

/// Image fields of a compiled article, dropped entirely when images are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleImages {
    pub top_image: Option<String>,
    pub images: BTreeSet<String>,
}

/// An extracted article merged with its story-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompiledArticle {
    pub title: String,
    pub text: String,
    #[serde(flatten)]
    pub images: Option<ArticleImages>,
    pub side: String,
    pub source: String,
    pub url: String,
}

impl CompiledArticle {
    /// Merge extraction output with the reference it was fetched from.
    pub fn merge(extracted: ExtractedArticle, reference: &ArticleRef, include_images: bool) -> Self {
        let images = include_images.then(|| ArticleImages {
            top_image: extracted.top_image,
            images: extracted.images,
        });
        Self {
            title: extracted.title,
            text: extracted.text,
            images,
            side: reference.side.clone(),
            source: reference.source.clone(),
            url: reference.url.clone(),
        }
    }
}

/// One line of the compiled dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompiledRecord {
    pub title: String,
    pub tags: Vec<String>,
    pub summary: String,
    /// Keyed by article position; serialized as `"0"`, `"1"`, ...
    pub articles: BTreeMap<usize, CompiledArticle>,
    pub date: NaiveDate,
}

/// How the article stage treats items that already have a terminal artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Only fetch items never attempted.
    #[default]
    Normal,
    /// Refetch everything, replacing existing artifacts.
    ForceRefetch,
    /// Also refetch items whose previous fetch errored.
    RetryErrors,
}

impl FetchMode {
    /// `redownload` wins over `retry_errors`, since it covers it.
    pub fn from_flags(redownload: bool, retry_errors: bool) -> Self {
        match (redownload, retry_errors) {
            (true, _) => FetchMode::ForceRefetch,
            (false, true) => FetchMode::RetryErrors,
            (false, false) => FetchMode::Normal,
        }
    }

    pub fn is_force(self) -> bool {
        self == FetchMode::ForceRefetch
    }
}
