//! Page parsers for the three tiers of the source site.
//!
//! Parsers are pure: raw markup in, record (or a reason there is none) out.
//! They never touch the network or the working directory; the collectors in
//! [`crate::collectors`] decide when to call them and what to persist.
//!
//! | Page | Module | Produces |
//! |------|--------|----------|
//! | Headline roundup listing | [`roundups`] | `Vec<Roundup>`, last page index |
//! | Story page | [`story`] | `Story` or "no coverage" |
//! | External article | [`article`] | `ExtractedArticle` |
//!
//! Selectors are compiled once into `Lazy` statics.

pub mod article;
pub mod roundups;
pub mod story;

use scraper::ElementRef;

/// Concatenated text of an element with surrounding whitespace trimmed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
