//! Readable content of external article pages.
//!
//! Title and body come from Readability. Images are collected separately
//! because Readability drops them: the lead image is the page's `og:image`
//! (or `image_src` link, or first `<img>`), and the image set is every
//! `<img src>` on the page resolved to an absolute URL.

use crate::error::ExtractError;
use crate::models::ExtractedArticle;
use once_cell::sync::Lazy;
use readability::extractor;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, instrument};
use url::Url;

static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static IMAGE_SRC_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="image_src"]"#).unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

/// Extract title, text and images from a raw article page.
///
/// `page_url` is the article's address; relative image paths resolve against it.
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn extract_article(html: &str, page_url: &str) -> Result<ExtractedArticle, ExtractError> {
    let base = Url::parse(page_url).map_err(|_| ExtractError::InvalidUrl(page_url.to_string()))?;

    let mut input = html.as_bytes();
    let product = extractor::extract(&mut input, &base)
        .map_err(|e| ExtractError::Readability(format!("{e:?}")))?;

    let document = Html::parse_document(html);

    let mut title = product.title.trim().to_string();
    if title.is_empty() {
        title = document
            .select(&OG_TITLE)
            .filter_map(|m| m.value().attr("content"))
            .map(|t| t.trim().to_string())
            .next()
            .unwrap_or_default();
    }

    let images: BTreeSet<String> = document
        .select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| resolve(&base, src))
        .collect();

    let top_image = document
        .select(&OG_IMAGE)
        .filter_map(|m| m.value().attr("content"))
        .chain(document.select(&IMAGE_SRC_LINK).filter_map(|l| l.value().attr("href")))
        .filter_map(|src| resolve(&base, src))
        .next()
        .or_else(|| images.iter().next().cloned());

    let mut images = images;
    if let Some(top) = &top_image {
        images.insert(top.clone());
    }

    let text = product.text.trim().to_string();
    debug!(chars = text.len(), images = images.len(), "Extracted article");

    Ok(ExtractedArticle {
        title,
        text,
        top_image,
        images,
    })
}

fn resolve(base: &Url, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    base.join(src).ok().map(|u| u.to_string())
}
