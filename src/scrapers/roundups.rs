//! Headline roundup listing pages.
//!
//! Each listing page is a table with one row per story:
//!
//! ```text
//! <tr>
//!   <td><a href="/story/foo-bar">Title</a></td>
//!   <td><a href="/topics/economy">Economy</a></td>
//!   <td><span>2020-01-05</span></td>
//! </tr>
//! ```
//!
//! The pager carries a `Go to last page` link whose `page=N` query parameter
//! is the index of the final page.

use super::element_text;
use crate::models::Roundup;
use crate::utils::{collapse_whitespace, parse_listing_date};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

static LAST_PAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[title="Go to last page"]"#).unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static PAGE_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]page=(\d+)").unwrap());

/// Index of the last listing page, read from the pager.
///
/// Returns `None` when the page has no last-page control, which means the
/// page count cannot be known.
pub fn last_page(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    document
        .select(&LAST_PAGE)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAGE_PARAM.captures(href))
        .filter_map(|caps| caps[1].parse().ok())
        .last()
}

/// Parse every dated row of a listing page, in page order.
///
/// Header rows (no cells), rows without a story link, and rows whose date
/// cell is empty or unparseable are dropped.
pub fn parse_listing(html: &str) -> Vec<Roundup> {
    let document = Html::parse_document(html);
    let mut roundups = Vec::new();

    for row in document.select(&ROW) {
        let cells: Vec<_> = row.select(&CELL).collect();
        if cells.is_empty() {
            continue;
        }
        if cells.len() < 3 {
            debug!(cells = cells.len(), "Skipping short listing row");
            continue;
        }

        let Some(link) = cells[0].select(&LINK).next() else {
            debug!("Skipping listing row without a story link");
            continue;
        };
        let Some(url) = link.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
            debug!("Skipping listing row with an empty story link");
            continue;
        };

        let topic = cells[1]
            .select(&LINK)
            .next()
            .map(|a| collapse_whitespace(&element_text(a)))
            .filter(|t| !t.is_empty());

        let raw_date = cells[2].select(&SPAN).next().map(element_text).unwrap_or_default();
        let Some(date) = parse_listing_date(&raw_date) else {
            debug!(%url, raw_date, "Dropping listing row without a usable date");
            continue;
        };

        roundups.push(Roundup {
            title: collapse_whitespace(&element_text(link)),
            url: url.to_string(),
            topic,
            date,
        });
    }

    roundups
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Render a listing page. Rows are `(title, url, topic, date)`.
    pub fn listing_page(rows: &[(&str, &str, &str, &str)], last_page: Option<u32>) -> String {
        let mut html = String::from(
            "<html><body><table><thead><tr><th>Title</th><th>Topic</th><th>Date</th></tr></thead><tbody>",
        );
        for (title, url, topic, date) in rows {
            let topic_cell = if topic.is_empty() {
                String::new()
            } else {
                format!("<a href=\"/topics/{}\">{}</a>", topic.to_lowercase(), topic)
            };
            let date_cell = if date.is_empty() {
                String::new()
            } else {
                format!("<span class=\"date-display-single\">{date}</span>")
            };
            html.push_str(&format!(
                "<tr><td class=\"views-field-name\"><a href=\"{url}\">{title}</a></td><td>{topic_cell}</td><td>{date_cell}</td></tr>"
            ));
        }
        html.push_str("</tbody></table>");
        if let Some(last) = last_page {
            html.push_str(&format!(
                "<ul class=\"pager\"><li><a title=\"Go to next page\" href=\"/headline-roundups?page=1\">next</a></li>\
                 <li><a title=\"Go to last page\" href=\"/headline-roundups?page={last}\">last »</a></li></ul>"
            ));
        }
        html.push_str("</body></html>");
        html
    }
}
