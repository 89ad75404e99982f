//! Roundup listing collection.
//!
//! Page 0 is fetched first to learn the page count from its pager, then pages
//! `1..=last` follow in order. Every page is persisted verbatim before any
//! parsing happens, and the parsed rows from all persisted pages are written
//! to the date-sorted roundup index.
//!
//! Already persisted pages are read from disk instead of refetched unless
//! `force_refetch` is set. The source lists newest stories first, so picking
//! up new stories requires a forced run.
//!
//! A stored page that cannot be used is fetched again: page 0 must carry the
//! pager and later pages must yield at least one row. This keeps a throttle
//! or error page served with a 200 from sticking across runs.

use crate::collectors::StageReport;
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::fetch::{Fetch, Method};
use crate::models::Roundup;
use crate::outputs::roundup_index::write_index;
use crate::scrapers::roundups::{last_page, parse_listing};
use crate::store::{StateStore, layout};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

pub struct RoundupCollector<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
    config: &'a HarvestConfig,
    force_refetch: bool,
}

/// Where a listing page came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageBody {
    Stored(String),
    Fetched(String),
}

impl<'a, S: StateStore, F: Fetch> RoundupCollector<'a, S, F> {
    pub fn new(store: &'a S, fetcher: &'a F, config: &'a HarvestConfig, force_refetch: bool) -> Self {
        Self {
            store,
            fetcher,
            config,
            force_refetch,
        }
    }

    /// Collect every listing page and write the roundup index.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::PaginationMissing`] if page 0 has no last-page control
    /// - [`HarvestError::RoundupStatus`] or a fetch error if page 0 cannot be fetched
    /// - store errors
    ///
    /// Failures on later pages are logged; those pages are retried next run.
    #[instrument(level = "info", skip_all, fields(force_refetch = self.force_refetch))]
    pub async fn collect(&self) -> Result<Vec<Roundup>, HarvestError> {
        let mut report = StageReport::default();

        let first = match self.page(0).await? {
            PageBody::Stored(body) => {
                report.skipped += 1;
                body
            }
            PageBody::Fetched(body) => {
                report.fetched += 1;
                body
            }
        };
        let last = last_page(&first).ok_or(HarvestError::PaginationMissing)?;
        info!(last_page = last, "Discovered roundup page count");

        for page in 1..=last {
            match self.page(page).await {
                Ok(PageBody::Stored(_)) => report.skipped += 1,
                Ok(PageBody::Fetched(body)) if !usable(page, &body) => {
                    warn!(page, "Roundup page has no rows; will retry next run");
                    report.failed += 1;
                }
                Ok(PageBody::Fetched(_)) => report.fetched += 1,
                Err(HarvestError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    error!(page, error = %e, "Roundup page failed; will retry next run");
                    report.failed += 1;
                }
            }
        }

        let roundups = self.parse_pages()?;
        report.extracted = roundups.len();
        write_index(self.store, &roundups)?;
        report.log("roundups");
        Ok(roundups)
    }

    async fn page(&self, page: u32) -> Result<PageBody, HarvestError> {
        let key = layout::roundup_page(page);
        if !self.force_refetch {
            match self.store.read_string(&key)? {
                Some(body) if usable(page, &body) => {
                    debug!(page, "Roundup page already on disk");
                    return Ok(PageBody::Stored(body));
                }
                Some(_) => warn!(page, "Stored roundup page is unusable; refetching"),
                None => {}
            }
        }

        let url = self.config.roundup_url(page);
        let response = self.fetcher.fetch(Method::Post, &url).await?;
        if !response.is_success() {
            return Err(HarvestError::RoundupStatus {
                page,
                status: response.status,
            });
        }
        self.store.write(&key, response.body.as_bytes())?;
        debug!(page, bytes = response.body.len(), "Stored roundup page");
        Ok(PageBody::Fetched(response.body))
    }

    /// Parse every persisted page in page order and sort the rows by date.
    fn parse_pages(&self) -> Result<Vec<Roundup>, HarvestError> {
        let pages: Vec<u32> = self
            .store
            .list(layout::ROUNDUP_DIR)?
            .iter()
            .filter_map(|name| name.parse().ok())
            .sorted()
            .collect();

        let mut roundups = Vec::new();
        for page in pages {
            let Some(body) = self.store.read_string(&layout::roundup_page(page))? else {
                continue;
            };
            let rows = parse_listing(&body);
            debug!(page, rows = rows.len(), "Parsed roundup page");
            roundups.extend(rows);
        }

        Ok(roundups.into_iter().sorted_by_key(|r| r.date).collect())
    }
}

/// Whether a listing page is worth keeping: page 0 must carry the pager,
/// later pages must hold at least one dated row.
fn usable(page: u32, body: &str) -> bool {
    if page == 0 {
        last_page(body).is_some()
    } else {
        !parse_listing(body).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::ScriptedFetcher;
    use crate::outputs::roundup_index::read_index;
    use crate::scrapers::roundups::fixtures::listing_page;
    use crate::store::MemoryStore;

    fn config() -> HarvestConfig {
        HarvestConfig::default()
    }

    fn three_page_site(config: &HarvestConfig) -> ScriptedFetcher {
        ScriptedFetcher::new()
            .page(
                &config.roundup_url(0),
                &listing_page(
                    &[
                        ("Newest", "/story/newest", "Politics", "2020-03-01"),
                        ("Undated", "/story/undated", "", ""),
                    ],
                    Some(2),
                ),
            )
            .page(
                &config.roundup_url(1),
                &listing_page(&[("Middle", "/story/middle", "Economy", "2020-02-01")], Some(2)),
            )
            .page(
                &config.roundup_url(2),
                &listing_page(&[("Oldest", "/story/oldest", "", "January 5th, 2020")], Some(2)),
            )
    }

    #[tokio::test]
    async fn test_collect_all_pages_sorted() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = three_page_site(&config);

        let roundups = RoundupCollector::new(&store, &fetcher, &config, false)
            .collect()
            .await
            .unwrap();

        let urls: Vec<_> = roundups.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["/story/oldest", "/story/middle", "/story/newest"]);
        assert!(fetcher.calls().iter().all(|(m, _)| *m == Method::Post));
        assert_eq!(fetcher.call_count(), 3);
        assert!(store.exists("roundups/0").unwrap());
        assert!(store.exists("roundups/2").unwrap());

        let index = store.read_string(layout::ROUNDUP_INDEX).unwrap().unwrap();
        assert_eq!(index.lines().next(), Some("Oldest\t/story/oldest\t\t2020-01-05"));
        assert_eq!(read_index(&store).unwrap(), roundups);
    }

    #[tokio::test]
    async fn test_missing_pager_is_fatal() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = ScriptedFetcher::new().page(
            &config.roundup_url(0),
            &listing_page(&[("A", "/story/a", "", "2020-01-01")], None),
        );

        let result = RoundupCollector::new(&store, &fetcher, &config, false)
            .collect()
            .await;
        assert!(matches!(result, Err(HarvestError::PaginationMissing)));
        assert!(store.exists("roundups/0").unwrap());
        assert!(!store.exists(layout::ROUNDUP_INDEX).unwrap());
    }

    #[tokio::test]
    async fn test_first_page_error_status_is_fatal() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = ScriptedFetcher::new().status(&config.roundup_url(0), 503);

        let result = RoundupCollector::new(&store, &fetcher, &config, false)
            .collect()
            .await;
        assert!(matches!(
            result,
            Err(HarvestError::RoundupStatus { page: 0, status: 503 })
        ));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_makes_no_requests() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = three_page_site(&config);
        let collector = RoundupCollector::new(&store, &fetcher, &config, false);

        let first = collector.collect().await.unwrap();
        let before = store.snapshot();
        fetcher.reset_calls();

        let second = collector.collect().await.unwrap();
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(first, second);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_failed_middle_page_is_retried_next_run() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = three_page_site(&config);
        fetcher.set(
            &config.roundup_url(1),
            crate::fetch::testing::Scripted::TransportError("reset".into()),
        );

        let partial = RoundupCollector::new(&store, &fetcher, &config, false)
            .collect()
            .await
            .unwrap();
        assert_eq!(partial.len(), 2);
        assert!(!store.exists("roundups/1").unwrap());

        let healthy = three_page_site(&config);
        let full = RoundupCollector::new(&store, &healthy, &config, false)
            .collect()
            .await
            .unwrap();
        assert_eq!(full.len(), 3);
        assert_eq!(healthy.calls(), vec![(Method::Post, config.roundup_url(1))]);
    }

    #[tokio::test]
    async fn test_force_refetch_requests_every_page() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = three_page_site(&config);
        RoundupCollector::new(&store, &fetcher, &config, false)
            .collect()
            .await
            .unwrap();
        fetcher.reset_calls();

        RoundupCollector::new(&store, &fetcher, &config, true)
            .collect()
            .await
            .unwrap();
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_stored_first_page_without_pager_is_refetched() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = three_page_site(&config);
        fetcher.set(
            &config.roundup_url(0),
            crate::fetch::testing::Scripted::Page(200, "<html><body>Too many requests</body></html>".into()),
        );

        let throttled = RoundupCollector::new(&store, &fetcher, &config, false)
            .collect()
            .await;
        assert!(matches!(throttled, Err(HarvestError::PaginationMissing)));

        let healthy = three_page_site(&config);
        let roundups = RoundupCollector::new(&store, &healthy, &config, false)
            .collect()
            .await
            .unwrap();
        assert_eq!(roundups.len(), 3);
        assert_eq!(healthy.calls()[0], (Method::Post, config.roundup_url(0)));
        assert!(last_page(&store.read_string("roundups/0").unwrap().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_empty_later_page_is_fetched_again() {
        let config = config();
        let store = MemoryStore::new();
        let fetcher = three_page_site(&config);
        fetcher.set(
            &config.roundup_url(2),
            crate::fetch::testing::Scripted::Page(200, "<html><body>Service busy</body></html>".into()),
        );

        let collector = RoundupCollector::new(&store, &fetcher, &config, false);
        assert_eq!(collector.collect().await.unwrap().len(), 2);

        let healthy = three_page_site(&config);
        let roundups = RoundupCollector::new(&store, &healthy, &config, false)
            .collect()
            .await
            .unwrap();
        assert_eq!(roundups[0].url, "/story/oldest");
        assert_eq!(healthy.calls(), vec![(Method::Post, config.roundup_url(2))]);
    }
}
