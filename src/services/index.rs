// src/services/index.rs

//! Index page parsing and pagination.
//!
//! The site exposes no total page count, so the walker requests pages in
//! order until one carries the "no results" marker.

use std::pin::pin;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use futures::stream::{self, Stream, StreamExt};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::{CrawlerConfig, ListingSelectors, ListingSummary};
use crate::services::PageFetcher;
use crate::utils::{canonical_url, static_regex};

static STYLE_URL: LazyLock<Regex> = LazyLock::new(|| static_regex(r#"url\(\s*['"]?([^'")\s]+)"#));

/// One parsed index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexPage {
    Listings(Vec<ListingSummary>),
    /// Past the last page
    Terminal,
}

/// A page produced by the walker.
#[derive(Debug, Clone)]
pub struct WalkedPage {
    pub page: u32,
    pub summaries: Vec<ListingSummary>,
}

/// Extracts listing summaries from index HTML.
pub struct IndexParser {
    row: Selector,
    title: Selector,
    rooms: Selector,
    size: Selector,
    rent: Selector,
    location: Selector,
    date: Selector,
    date_attr: String,
    link: Selector,
    terminal_marker: String,
}

impl IndexParser {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            rooms: parse_selector(&selectors.rooms_selector)?,
            size: parse_selector(&selectors.size_selector)?,
            rent: parse_selector(&selectors.rent_selector)?,
            location: parse_selector(&selectors.location_selector)?,
            date: parse_selector(&selectors.date_selector)?,
            date_attr: selectors.date_attr.clone(),
            link: parse_selector(&selectors.link_selector)?,
            terminal_marker: selectors.terminal_marker.clone(),
        })
    }

    /// Parse one index document fetched from `page_url`.
    ///
    /// Rows without a detail link are skipped. A missing or unreadable
    /// posting timestamp falls back to `now`.
    pub fn parse(&self, html: &str, page_url: &Url, now: DateTime<Utc>) -> IndexPage {
        if html.contains(&self.terminal_marker) {
            return IndexPage::Terminal;
        }

        let document = Html::parse_document(html);
        let summaries = document
            .select(&self.row)
            .filter_map(|row| self.parse_row(&row, page_url, now))
            .collect();
        IndexPage::Listings(summaries)
    }

    fn parse_row(&self, row: &ElementRef, page_url: &Url, now: DateTime<Utc>) -> Option<ListingSummary> {
        let anchor = row.select(&self.link).next()?;
        let href = anchor.value().attr("href")?;
        if href.trim().is_empty() {
            return None;
        }

        let thumbnail = anchor
            .value()
            .attr("style")
            .and_then(|style| STYLE_URL.captures(style))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let posted_at = row
            .select(&self.date)
            .next()
            .and_then(|e| e.value().attr(&self.date_attr))
            .and_then(parse_timestamp)
            .unwrap_or(now);

        Some(ListingSummary {
            title: element_text(row, &self.title),
            rent: element_text(row, &self.rent),
            rooms: element_text(row, &self.rooms),
            size: element_text(row, &self.size),
            location: element_text(row, &self.location),
            posted_at,
            url: canonical_url(page_url, href),
            thumbnail,
        })
    }
}

/// Drives an [`IndexParser`] across sequential pages.
pub struct PaginationWalker {
    fetcher: Arc<dyn PageFetcher>,
    parser: IndexParser,
    config: CrawlerConfig,
}

impl PaginationWalker {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: IndexParser, config: CrawlerConfig) -> Self {
        Self {
            fetcher,
            parser,
            config,
        }
    }

    /// Lazy sequence of index pages starting at `first_page`.
    ///
    /// Ends after the terminal page, after `max_pages` pages, or right after
    /// yielding the first fetch error. Each call starts a fresh walk.
    pub fn pages(&self, first_page: u32) -> impl Stream<Item = Result<WalkedPage>> + '_ {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let max_pages = self.config.max_pages;

        stream::unfold(Some(first_page), move |next| async move {
            let page = next?;
            if page.saturating_sub(first_page) >= max_pages {
                log::warn!("Stopping pagination at max_pages={max_pages} without terminal marker");
                return None;
            }
            if page > first_page && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.fetch_page(page).await {
                Ok(IndexPage::Terminal) => {
                    log::debug!("Page {page} is terminal");
                    None
                }
                Ok(IndexPage::Listings(summaries)) => {
                    log::debug!("Page {page}: {} summaries", summaries.len());
                    Some((Ok(WalkedPage { page, summaries }), Some(page + 1)))
                }
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Collect every summary of a walk; any page failure fails the walk.
    pub async fn walk(&self, first_page: u32) -> Result<Vec<ListingSummary>> {
        let mut pages = pin!(self.pages(first_page));
        let mut summaries = Vec::new();
        let mut page_count = 0;

        while let Some(page) = pages.next().await {
            let page = page?;
            page_count += 1;
            summaries.extend(page.summaries);
        }

        log::info!(
            "Walked {page_count} index pages, collected {} summaries",
            summaries.len()
        );
        Ok(summaries)
    }

    async fn fetch_page(&self, page: u32) -> Result<IndexPage> {
        let url = self.config.page_url(page);
        let page_url = Url::parse(&url)?;
        let html = self.fetcher.fetch(&url).await?;
        Ok(self.parser.parse(&html, &page_url, Utc::now()))
    }
}

/// Parse a CSS selector, mapping failures into [`crate::error::AppError::Selector`].
pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| crate::error::AppError::selector(s, format!("{e:?}")))
}

/// Whitespace-collapsed text of the first match of `selector` under `root`.
pub(crate) fn element_text(root: &ElementRef, selector: &Selector) -> String {
    root.select(selector)
        .next()
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .unwrap_or_default()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Site timestamps are RFC 3339 or local `YYYY-MM-DD HH:MM:SS`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::fetcher::fake::FakeFetcher;

    const PAGE_ONE: &str = r#"
        <html><body>
        <div itemtype="http://schema.org/Offer">
            <a href="https://www.blocket.se/stockholm/rum_i_vasastan_101.htm?ca=11'n"
               style="background-image: url('https://img.blocket.se/101.jpg')"></a>
            <h1 class="media-heading">  Rum i
                Vasastan </h1>
            <span class="rooms">1 rum</span>
            <span class="li_detail_params size">14 m²</span>
            <span class="monthly_rent">4 500 kr/mån</span>
            <span class="address">Stockholm, Vasastan</span>
            <time class="jlist_date_image" datetime="2026-10-10T09:30:00+02:00"></time>
        </div>
        <div itemtype="http://schema.org/Offer">
            <a href="/stockholm/tvaa_102.htm"></a>
            <h1 class="media-heading">Tvåa på Söder</h1>
            <span class="monthly_rent">9 800 kr/mån</span>
            <span class="address">Stockholm, Södermalm</span>
            <time class="jlist_date_image" datetime="garbage"></time>
        </div>
        <div itemtype="http://schema.org/Offer">
            <h1 class="media-heading">Utan länk</h1>
        </div>
        </body></html>
    "#;

    const PAGE_TWO: &str = r#"
        <div itemtype="http://schema.org/Offer">
            <a href="/stockholm/etta_201.htm"></a>
            <h1 class="media-heading">Etta i Solna</h1>
            <span class="monthly_rent">6 000 kr/mån</span>
        </div>
    "#;

    const TERMINAL: &str = r#"<div class="ads-not-found-container">Inga annonser</div>"#;

    fn parser() -> IndexParser {
        IndexParser::new(&ListingSelectors::default()).unwrap()
    }

    fn config() -> CrawlerConfig {
        CrawlerConfig {
            base_url: "https://www.blocket.se/bostad/uthyres/stockholm?o={page}".to_string(),
            ..CrawlerConfig::default()
        }
    }

    #[test]
    fn test_parse_index_rows() {
        let page_url = Url::parse("https://www.blocket.se/bostad/uthyres/stockholm?o=1").unwrap();
        let now = Utc::now();
        let IndexPage::Listings(rows) = parser().parse(PAGE_ONE, &page_url, now) else {
            panic!("expected listings");
        };

        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.title, "Rum i Vasastan");
        assert_eq!(first.rent, "4 500 kr/mån");
        assert_eq!(first.price(), Some(4500));
        assert_eq!(first.size, "14 m²");
        assert_eq!(
            first.url,
            "https://www.blocket.se/stockholm/rum_i_vasastan_101.htm?ca=11"
        );
        assert_eq!(
            first.thumbnail.as_deref(),
            Some("https://img.blocket.se/101.jpg")
        );
        assert_eq!(first.posted_at.to_rfc3339(), "2026-10-10T07:30:00+00:00");

        let second = &rows[1];
        assert_eq!(second.url, "https://www.blocket.se/stockholm/tvaa_102.htm");
        assert_eq!(second.posted_at, now);
        assert_eq!(second.rooms, "");
        assert!(second.thumbnail.is_none());
    }

    #[test]
    fn test_terminal_marker() {
        let page_url = Url::parse("https://www.blocket.se/").unwrap();
        assert_eq!(
            parser().parse(TERMINAL, &page_url, Utc::now()),
            IndexPage::Terminal
        );
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = ListingSelectors {
            row_selector: "[[invalid".to_string(),
            ..ListingSelectors::default()
        };
        assert!(matches!(
            IndexParser::new(&selectors),
            Err(AppError::Selector { .. })
        ));
    }

    #[tokio::test]
    async fn test_walk_until_terminal() {
        let config = config();
        let fetcher = FakeFetcher::new()
            .with_page(config.page_url(1), PAGE_ONE)
            .with_page(config.page_url(2), PAGE_TWO)
            .with_page(config.page_url(3), TERMINAL);
        let fetcher = Arc::new(fetcher);
        let walker = PaginationWalker::new(fetcher.clone(), parser(), config);

        let summaries = walker.walk(1).await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[2].title, "Etta i Solna");
        assert_eq!(fetcher.request_count(), 3);

        // Walking again restarts from the first page.
        let again = walker.walk(1).await.unwrap();
        let urls = |items: &[ListingSummary]| items.iter().map(|s| s.url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&again), urls(&summaries));
    }

    #[tokio::test]
    async fn test_walk_fails_on_page_error() {
        let config = config();
        let fetcher = FakeFetcher::new().with_page(config.page_url(1), PAGE_ONE);
        let walker = PaginationWalker::new(Arc::new(fetcher), parser(), config);

        let err = walker.walk(1).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_walk_respects_max_pages() {
        let mut config = config();
        config.max_pages = 2;
        let fetcher = FakeFetcher::new()
            .with_page(config.page_url(1), PAGE_TWO)
            .with_page(config.page_url(2), PAGE_TWO)
            .with_page(config.page_url(3), PAGE_TWO);
        let fetcher = Arc::new(fetcher);
        let walker = PaginationWalker::new(fetcher.clone(), parser(), config);

        let summaries = walker.walk(1).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(fetcher.request_count(), 2);
    }
}
