//! Key layout of the working directory.
//!
//! ```text
//! <output>/
//! ├── roundups/<page>                   raw roundup page
//! ├── roundups.tsv                      title \t url \t topic \t date
//! ├── story/<date>.<slug>/
//! │   ├── story.html                    raw story page
//! │   ├── story.json                    Story record
//! │   ├── <id>.html                     raw article page
//! │   ├── <id>.err                      fetch-error marker
//! │   ├── <id>.extract.err              extraction error log
//! │   ├── <id>.state.json               ArticleState
//! │   └── <id>.json                     ExtractedArticle
//! └── allsides.jsonl                    compiled dataset
//! ```

use crate::models::{ArticleId, StoryKey};

pub const ROUNDUP_DIR: &str = "roundups";
pub const ROUNDUP_INDEX: &str = "roundups.tsv";
pub const STORY_ROOT: &str = "story";
pub const DATASET: &str = "allsides.jsonl";

pub const STORY_HTML: &str = "story.html";
pub const STORY_JSON: &str = "story.json";

/// Extension of extraction artifacts (`<id>.json`).
pub const EXTRACTED_EXT: &str = "json";

pub fn roundup_page(page: u32) -> String {
    format!("{ROUNDUP_DIR}/{page}")
}

pub fn story_dir(story: &StoryKey) -> String {
    format!("{STORY_ROOT}/{story}")
}

pub fn story_html(story: &StoryKey) -> String {
    format!("{}/{STORY_HTML}", story_dir(story))
}

pub fn story_json(story: &StoryKey) -> String {
    format!("{}/{STORY_JSON}", story_dir(story))
}

pub fn article_html(story: &StoryKey, id: ArticleId) -> String {
    format!("{}/{id}.html", story_dir(story))
}

pub fn article_err(story: &StoryKey, id: ArticleId) -> String {
    format!("{}/{id}.err", story_dir(story))
}

pub fn article_extract_err(story: &StoryKey, id: ArticleId) -> String {
    format!("{}/{id}.extract.err", story_dir(story))
}

pub fn article_state(story: &StoryKey, id: ArticleId) -> String {
    format!("{}/{id}.state.json", story_dir(story))
}

pub fn article_json(story: &StoryKey, id: ArticleId) -> String {
    format!("{}/{id}.{EXTRACTED_EXT}", story_dir(story))
}
