//! Story pages: title, tags, summary, and the featured coverage list.
//!
//! # Side labels
//!
//! Each coverage item carries a bias label. It is resolved with a fixed
//! precedence ([`SideStrategy`]):
//!
//! 1. **Image alt text.** The rating badge's `alt` reads
//!    `"AllSides Media Bias Rating: Lean Left"`; the part after `": "` is the side.
//! 2. **Container class.** Without a usable badge, the last class on the
//!    `news-item` container is capitalized (`left` → `Left`).
//!
//! The class tier cannot produce `Lean Left` or `Lean Right`. Earlier
//! datasets were built with exactly this behavior, so it is kept as is.

use super::element_text;
use crate::error::ExtractError;
use crate::models::{ArticleRef, Story};
use crate::utils::capitalize;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TAG_LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("div.page-tags a").unwrap());
static SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.story-id-page-description").unwrap());
static COVERAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.featured-coverage").unwrap());
static NEWS_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("div.news-item").unwrap());
static NEWS_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.news-title").unwrap());
static NEWS_SOURCE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.news-source").unwrap());
static EXTERNAL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.external-link").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Result of parsing a story page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryPage {
    Story(Story),
    /// The page has no featured coverage block. Some historical stories are
    /// published this way; it is not an error.
    NoCoverage,
}

/// Which tier of the side precedence produced a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideStrategy {
    ImageAlt,
    ContainerClass,
}

/// Parse a raw story page.
///
/// # Errors
///
/// Missing title or summary, or a coverage item without its title, source,
/// link or any side label. A story is persisted whole or not at all, so one
/// bad item fails the page.
pub fn parse_story(html: &str) -> Result<StoryPage, ExtractError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(element_text)
        .ok_or(ExtractError::MissingElement("h1"))?;

    let tags = document
        .select(&TAG_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| href.rsplit('/').next())
        .map(str::to_string)
        .collect();

    let summary = document
        .select(&SUMMARY)
        .next()
        .map(element_text)
        .ok_or(ExtractError::MissingElement("div.story-id-page-description"))?;

    let Some(coverage) = document.select(&COVERAGE).next() else {
        return Ok(StoryPage::NoCoverage);
    };

    let articles = coverage
        .select(&NEWS_ITEM)
        .map(parse_news_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StoryPage::Story(Story {
        title,
        tags,
        summary,
        articles,
    }))
}

fn parse_news_item(item: ElementRef<'_>) -> Result<ArticleRef, ExtractError> {
    let title = item
        .select(&NEWS_TITLE)
        .next()
        .map(element_text)
        .ok_or(ExtractError::MissingElement("a.news-title"))?;

    let (side, strategy) = resolve_side(item).ok_or_else(|| ExtractError::NoSide(title.clone()))?;
    if strategy == SideStrategy::ContainerClass {
        debug!(%title, %side, "Side taken from container class");
    }

    let source = item
        .select(&NEWS_SOURCE)
        .next()
        .map(element_text)
        .ok_or(ExtractError::MissingElement("div.news-source"))?;

    let url = item
        .select(&EXTERNAL_LINK)
        .next()
        .ok_or(ExtractError::MissingElement("a.external-link"))?
        .value()
        .attr("href")
        .ok_or(ExtractError::MissingAttribute {
            element: "a.external-link",
            attr: "href",
        })?
        .trim()
        .to_string();

    Ok(ArticleRef {
        title,
        side,
        source,
        url,
    })
}

/// Resolve the side label of a coverage item, reporting which tier matched.
pub fn resolve_side(item: ElementRef<'_>) -> Option<(String, SideStrategy)> {
    side_from_image_alt(item)
        .map(|side| (side, SideStrategy::ImageAlt))
        .or_else(|| side_from_class(item).map(|side| (side, SideStrategy::ContainerClass)))
}

fn side_from_image_alt(item: ElementRef<'_>) -> Option<String> {
    let alt = item.select(&IMAGE).next()?.value().attr("alt")?;
    alt.split(": ").nth(1).map(str::to_string)
}

fn side_from_class(item: ElementRef<'_>) -> Option<String> {
    item.value()
        .attr("class")?
        .split_whitespace()
        .last()
        .map(capitalize)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{Item, item, story_page};
    use super::*;

    #[test]
    fn test_parse_full_story() {
        let html = story_page(
            "Budget Deal",
            &["economy", "budget"],
            "Lawmakers agreed.",
            Some(&[
                item("Left take", "Outlet L", "https://l.example/1", "Lean Left"),
                item("Right take", "Outlet R", "https://r.example/2", "Right"),
            ]),
        );
        let StoryPage::Story(story) = parse_story(&html).unwrap() else {
            panic!("expected a story");
        };
        assert_eq!(story.title, "Budget Deal");
        assert_eq!(story.tags, vec!["economy", "budget"]);
        assert_eq!(story.summary, "Lawmakers agreed.");
        assert_eq!(story.articles.len(), 2);
        assert_eq!(story.articles[0].title, "Left take");
        assert_eq!(story.articles[0].side, "Lean Left");
        assert_eq!(story.articles[0].source, "Outlet L");
        assert_eq!(story.articles[0].url, "https://l.example/1");
        assert_eq!(story.articles[1].side, "Right");
    }

    #[test]
    fn test_missing_coverage_is_not_an_error() {
        let html = story_page("Iran Hearing", &[], "Nothing yet.", None);
        assert_eq!(parse_story(&html).unwrap(), StoryPage::NoCoverage);
    }

    #[test]
    fn test_side_falls_back_to_container_class() {
        let items = [Item {
            title: "No badge",
            source: "Outlet",
            url: "https://o.example/a",
            class_side: "center",
            alt: None,
        }];
        let html = story_page("ACA Hours", &[], "Summary", Some(&items));
        let StoryPage::Story(story) = parse_story(&html).unwrap() else {
            panic!("expected a story");
        };
        assert_eq!(story.articles[0].side, "Center");
    }

    #[test]
    fn test_class_fallback_cannot_recover_lean_labels() {
        let items = [Item {
            title: "No badge",
            source: "Outlet",
            url: "https://o.example/a",
            class_side: "lean-left",
            alt: None,
        }];
        let html = story_page("S", &[], "Summary", Some(&items));
        let StoryPage::Story(story) = parse_story(&html).unwrap() else {
            panic!("expected a story");
        };
        assert_eq!(story.articles[0].side, "Lean-left");
    }

    #[test]
    fn test_unparsable_alt_uses_class() {
        let items = [Item {
            title: "Odd badge",
            source: "Outlet",
            url: "https://o.example/a",
            class_side: "right",
            alt: None,
        }];
        let html = story_page("S", &[], "Summary", Some(&items))
            .replace("<a class=\"external-link\"", "<img alt=\"no rating here\"><a class=\"external-link\"");
        let document = Html::parse_document(&html);
        let item = document.select(&NEWS_ITEM).next().unwrap();
        assert_eq!(
            resolve_side(item),
            Some(("Right".to_string(), SideStrategy::ContainerClass))
        );
    }

    #[test]
    fn test_missing_summary_is_an_error() {
        let html = "<html><body><h1>T</h1><div class=\"featured-coverage\"></div></body></html>";
        assert!(matches!(
            parse_story(html),
            Err(ExtractError::MissingElement("div.story-id-page-description"))
        ));
    }

    #[test]
    fn test_item_without_link_fails_whole_story() {
        let html = story_page(
            "S",
            &[],
            "Summary",
            Some(&[item("A", "Outlet", "https://o.example/a", "Left")]),
        )
        .replace("class=\"external-link\"", "class=\"other-link\"");
        assert!(matches!(
            parse_story(&html),
            Err(ExtractError::MissingElement("a.external-link"))
        ));
    }
}
