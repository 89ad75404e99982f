//! Utility functions for string handling, dates, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for logging and whitespace normalization for TSV fields
//! - Capitalization used by the side-label fallback
//! - URL path and listing-date parsing
//! - File system validation for the output directory

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a character
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse every run of whitespace (tabs and newlines included) into one space.
///
/// Used for fields written to the tab-separated roundup index.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first character and lowercase the rest.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(capitalize("center"), "Center");
/// assert_eq!(capitalize("LEFT"), "Left");
/// assert_eq!(capitalize(""), "");
/// ```
pub fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + &c.as_str().to_lowercase(),
    }
}

/// Last non-empty path segment of a site-relative or absolute URL.
///
/// Query strings and fragments are ignored, so `/story/foo-bar?x=1` yields `foo-bar`.
pub fn last_path_segment(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|segment| !segment.is_empty())
}

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

const LISTING_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%m/%d/%Y", "%m/%d/%y"];

/// Parse a date cell from a roundup listing.
///
/// Accepts ISO dates, long and short month names with optional ordinal
/// suffixes (`January 5th, 2020`), and US numeric dates. Blank or unknown
/// values yield `None`.
pub fn parse_listing_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = collapse_whitespace(raw);
    if cleaned.is_empty() {
        return None;
    }
    let cleaned = ORDINAL_SUFFIX.replace_all(&cleaned, "$1");
    LISTING_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    stdfs::create_dir_all(path)?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
