//! The tab-separated roundup index (`roundups.tsv`).
//!
//! One roundup per line, date-sorted:
//!
//! ```text
//! title \t url \t topic \t date
//! ```
//!
//! A missing topic is an empty field. Fields are whitespace-collapsed before
//! writing, so they never contain tabs or newlines.

use crate::error::{HarvestError, StoreError};
use crate::models::{DATE_FORMAT, Roundup};
use crate::store::{StateStore, layout};
use crate::utils::{collapse_whitespace, truncate_for_log};
use chrono::NaiveDate;
use std::fmt::Write;
use tracing::{info, instrument, warn};

/// Render roundups as index lines.
pub fn to_tsv(roundups: &[Roundup]) -> String {
    let mut out = String::new();
    for r in roundups {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            collapse_whitespace(&r.title),
            collapse_whitespace(&r.url),
            r.topic.as_deref().map(collapse_whitespace).unwrap_or_default(),
            r.date.format(DATE_FORMAT)
        );
    }
    out
}

/// Parse index lines, skipping malformed ones with a warning.
pub fn from_tsv(raw: &str) -> Vec<Roundup> {
    let mut roundups = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let [title, url, topic, date] = fields[..] else {
            warn!(line = lineno + 1, content = %truncate_for_log(line, 120), "Malformed roundup index line");
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT) else {
            warn!(line = lineno + 1, date, "Bad date in roundup index line");
            continue;
        };
        roundups.push(Roundup {
            title: title.to_string(),
            url: url.to_string(),
            topic: Some(topic.to_string()).filter(|t| !t.is_empty()),
            date,
        });
    }
    roundups
}

/// Write the roundup index, replacing any previous one.
///
/// # Arguments
///
/// * `store` - Working directory
/// * `roundups` - Rows in the order they should appear, normally date-sorted
///
/// # Returns
///
/// `Ok(())` once `roundups.tsv` is in place, or the store error.
#[instrument(level = "info", skip_all, fields(count = roundups.len()))]
pub fn write_index<S: StateStore>(store: &S, roundups: &[Roundup]) -> Result<(), StoreError> {
    store.write(layout::ROUNDUP_INDEX, to_tsv(roundups).as_bytes())?;
    info!(path = layout::ROUNDUP_INDEX, "Wrote roundup index");
    Ok(())
}

/// Load the index written by the roundup phase.
///
/// # Errors
///
/// [`HarvestError::MissingRoundupIndex`] when the roundup phase never ran.
pub fn read_index<S: StateStore>(store: &S) -> Result<Vec<Roundup>, HarvestError> {
    let raw = store
        .read_string(layout::ROUNDUP_INDEX)?
        .ok_or_else(|| HarvestError::MissingRoundupIndex(layout::ROUNDUP_INDEX.to_string()))?;
    Ok(from_tsv(&raw))
}
