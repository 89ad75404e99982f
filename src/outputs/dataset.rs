//! Compile story records and extracted articles into `allsides.jsonl`.
//!
//! Compilation is a pure read-and-merge of the working directory. For each
//! story directory, the `Story` record is loaded and every `<id>.json`
//! extraction artifact is merged with the `ArticleRef` at the same position.
//! Stories without a single extracted article contribute nothing; that is the
//! normal state for stories whose articles are unprocessed or all failed.

use crate::error::StoreError;
use crate::models::{ArticleId, CompiledArticle, CompiledRecord, ExtractedArticle, Story, StoryKey};
use crate::store::{StateStore, layout};
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Merge every story in the working directory, sorted by date.
///
/// Records with the same date keep directory order.
#[instrument(level = "info", skip_all, fields(include_images = include_images))]
pub fn compile<S: StateStore>(store: &S, include_images: bool) -> Result<Vec<CompiledRecord>, StoreError> {
    let mut records = Vec::new();
    let mut without_story = 0usize;

    for dir in store.list(layout::STORY_ROOT)? {
        let Some(key) = StoryKey::parse(&dir) else {
            warn!(%dir, "Skipping directory with unrecognized name");
            continue;
        };
        let story: Story = match store.read_json(&layout::story_json(&key)) {
            Ok(Some(story)) => story,
            Ok(None) => {
                info!(story = %key, "No story record; skipping");
                without_story += 1;
                continue;
            }
            Err(e) => {
                warn!(story = %key, error = %e, "Unreadable story record; skipping");
                continue;
            }
        };

        if let Some(record) = compile_story(store, &key, story, include_images)? {
            records.push(record);
        }
    }

    info!(records = records.len(), without_story, "Compiled dataset");
    Ok(records
        .into_iter()
        .sorted_by_key(|r| r.date)
        .collect())
}

/// Merge one story with its extracted articles.
///
/// # Arguments
///
/// * `store` - Working directory holding the story's artifacts
/// * `key` - The story directory
/// * `story` - The persisted story record
/// * `include_images` - Keep `top_image` and `images` on each article
///
/// # Returns
///
/// `Ok(None)` when the story has no extracted articles.
pub fn compile_story<S: StateStore>(
    store: &S,
    key: &StoryKey,
    story: Story,
    include_images: bool,
) -> Result<Option<CompiledRecord>, StoreError> {
    let mut articles = BTreeMap::new();

    for name in store.list(&layout::story_dir(key))? {
        let Some(id) = ArticleId::from_file_name(&name, layout::EXTRACTED_EXT) else {
            continue;
        };
        let Some(reference) = story.article(id) else {
            warn!(story = %key, %id, "Extraction artifact has no matching article; ignoring");
            continue;
        };
        let extracted: ExtractedArticle = match store.read_json(&layout::article_json(key, id)) {
            Ok(Some(extracted)) => extracted,
            Ok(None) => continue,
            Err(e) => {
                warn!(story = %key, %id, error = %e, "Unreadable extraction artifact; ignoring");
                continue;
            }
        };
        articles.insert(id.0, CompiledArticle::merge(extracted, reference, include_images));
    }

    if articles.is_empty() {
        debug!(story = %key, "No extracted articles; excluded from dataset");
        return Ok(None);
    }

    Ok(Some(CompiledRecord {
        title: story.title,
        tags: story.tags,
        summary: story.summary,
        articles,
        date: key.date,
    }))
}

/// Write records as JSON lines to `allsides.jsonl`, replacing the previous file.
#[instrument(level = "info", skip_all, fields(count = records.len()))]
pub fn write_jsonl<S: StateStore>(store: &S, records: &[CompiledRecord]) -> Result<(), StoreError> {
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| StoreError::Json {
            key: layout::DATASET.to_string(),
            source,
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    store.write(layout::DATASET, out.as_bytes())?;
    info!(path = layout::DATASET, "Wrote dataset");
    Ok(())
}
