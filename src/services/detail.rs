// src/services/detail.rs

//! Detail page parsing and batched enrichment.

use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::{ListingDetails, ListingRecord, ListingSelectors, ListingSummary};
use crate::services::PageFetcher;
use crate::services::index::{collapse_whitespace, parse_selector};
use crate::utils::static_regex;

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)<br\s*/?>"));
static OWNER_PREFIX: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)^\s*uthyres av:\s*"));

/// Extracts owner, body, address and images from a detail page.
pub struct DetailParser {
    body: Selector,
    owner: Selector,
    address: Selector,
    image: Selector,
    withdrawn_marker: String,
}

impl DetailParser {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            body: parse_selector(&selectors.body_selector)?,
            owner: parse_selector(&selectors.owner_selector)?,
            address: parse_selector(&selectors.address_selector)?,
            image: parse_selector(&selectors.image_selector)?,
            withdrawn_marker: selectors.withdrawn_marker.clone(),
        })
    }

    pub fn parse(&self, html: &str) -> ListingDetails {
        let withdrawn = html.contains(&self.withdrawn_marker);
        let html = LINE_BREAK.replace_all(html, "\n");
        let document = Html::parse_document(&html);

        let first_text = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default()
        };

        let owner = OWNER_PREFIX
            .replace(&collapse_whitespace(&first_text(&self.owner)), "")
            .into_owned();
        let images = document
            .select(&self.image)
            .filter_map(|e| e.value().attr("content"))
            .map(str::to_string)
            .collect();

        ListingDetails {
            owner,
            body: clean_body(&first_text(&self.body)),
            address: collapse_whitespace(&first_text(&self.address)),
            images,
            withdrawn,
        }
    }
}

/// Collapse runs of horizontal whitespace and drop blank lines.
fn clean_body(raw: &str) -> String {
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of enriching a batch of summaries.
#[derive(Debug, Default)]
pub struct EnrichOutcome {
    /// One record per input summary, in input order
    pub records: Vec<ListingRecord>,
    /// Detail pages that could not be fetched
    pub failures: usize,
}

/// Fetches detail pages and merges them into summaries.
pub struct DetailEnricher {
    fetcher: Arc<dyn PageFetcher>,
    parser: DetailParser,
    batch_size: usize,
}

impl DetailEnricher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: DetailParser, batch_size: usize) -> Self {
        Self {
            fetcher,
            parser,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch and parse the detail page of one listing.
    pub async fn fetch_details(&self, url: &str) -> Result<ListingDetails> {
        let html = self.fetcher.fetch(url).await?;
        Ok(self.parser.parse(&html))
    }

    /// Enrich one summary, surfacing the fetch error.
    pub async fn enrich_one(&self, summary: ListingSummary) -> Result<ListingRecord> {
        let details = self.fetch_details(&summary.url).await?;
        Ok(ListingRecord::new(summary, details))
    }

    /// Enrich summaries in bounded batches.
    ///
    /// Each batch settles completely before the next starts. A failed detail
    /// fetch yields a record without details instead of failing the batch.
    pub async fn enrich(&self, summaries: Vec<ListingSummary>) -> EnrichOutcome {
        let total = summaries.len();
        let mut outcome = EnrichOutcome {
            records: Vec::with_capacity(total),
            failures: 0,
        };

        let mut pending = summaries.into_iter();
        loop {
            let batch: Vec<ListingSummary> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let results = join_all(batch.iter().map(|s| self.fetch_details(&s.url))).await;
            for (summary, result) in batch.into_iter().zip(results) {
                match result {
                    Ok(details) => outcome.records.push(ListingRecord::new(summary, details)),
                    Err(e) => {
                        log::warn!("Detail fetch failed for {}: {}", summary.url, e);
                        outcome.failures += 1;
                        outcome.records.push(ListingRecord::without_details(summary));
                    }
                }
            }
        }

        log::info!(
            "Enriched {} of {} listings ({} detail fetches failed)",
            total - outcome.failures,
            total,
            outcome.failures
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::fake::FakeFetcher;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const DETAIL: &str = r#"
        <html><head>
            <meta property="og:image" content="https://img.blocket.se/1.jpg">
            <meta property="og:image" content="https://img.blocket.se/2.jpg">
        </head><body>
            <h2 class="h4">Uthyres av:   Anna   Svensson</h2>
            <span class="area_label">Odengatan 12</span>
            <div class="object-text">Rum   i lägenhet<br/>Tillgång  till kök<br>
            <br />Hyra 4500 kr</div>
        </body></html>
    "#;

    fn parser() -> DetailParser {
        DetailParser::new(&ListingSelectors::default()).unwrap()
    }

    fn summary(url: &str) -> ListingSummary {
        ListingSummary {
            title: "Rum".to_string(),
            rent: "4 500 kr".to_string(),
            rooms: String::new(),
            size: String::new(),
            location: "Stockholm".to_string(),
            posted_at: Utc::now(),
            url: url.to_string(),
            thumbnail: None,
        }
    }

    #[test]
    fn test_parse_detail_page() {
        let details = parser().parse(DETAIL);
        assert_eq!(details.owner, "Anna Svensson");
        assert_eq!(details.address, "Odengatan 12");
        assert_eq!(details.body, "Rum i lägenhet\nTillgång till kök\nHyra 4500 kr");
        assert_eq!(details.images.len(), 2);
        assert!(!details.withdrawn);
    }

    #[test]
    fn test_withdrawn_marker() {
        let details = parser().parse("<h1>Hittade inte annonsen</h1>");
        assert!(details.withdrawn);
        assert!(details.body.is_empty());
    }

    #[tokio::test]
    async fn test_enrich_keeps_order_and_absorbs_failures() {
        let fetcher = FakeFetcher::new()
            .with_page("https://x/1", DETAIL)
            .with_page("https://x/3", DETAIL);
        let enricher = DetailEnricher::new(Arc::new(fetcher), parser(), 2);

        let outcome = enricher
            .enrich(vec![summary("https://x/1"), summary("https://x/2"), summary("https://x/3")])
            .await;

        assert_eq!(outcome.failures, 1);
        let urls: Vec<_> = outcome.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://x/1", "https://x/2", "https://x/3"]);
        assert_eq!(outcome.records[0].owner, "Anna Svensson");
        assert!(outcome.records[1].body.is_empty());
        assert!(outcome.records[1].details_missing);
        assert!(!outcome.records[0].details_missing);
        assert_eq!(outcome.records[1].price, Some(4500));
    }

    /// Sleeps per request and records concurrency and request order.
    #[derive(Default)]
    struct SlowFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        /// `(url, started)` in the order events happened
        events: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl PageFetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.events.lock().unwrap().push((url.to_string(), true));

            // Later URLs finish sooner, so an unbatched run would interleave.
            let n: u64 = url.rsplit('/').next().and_then(|n| n.parse().ok()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(5 + (10 - n.min(10)) * 3)).await;

            self.events.lock().unwrap().push((url.to_string(), false));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(DETAIL.to_string())
        }
    }

    #[tokio::test]
    async fn test_enrich_bounds_concurrency_per_batch() {
        let fetcher = Arc::new(SlowFetcher::default());
        let enricher = DetailEnricher::new(fetcher.clone(), parser(), 3);
        let summaries: Vec<_> = (1..=7).map(|n| summary(&format!("https://x/{n}"))).collect();

        let outcome = enricher.enrich(summaries).await;
        assert_eq!(outcome.records.len(), 7);
        assert_eq!(outcome.failures, 0);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);

        // Every request of batch k finishes before any request of batch k + 1 starts.
        let batch_of = |url: &str| {
            let n: usize = url.rsplit('/').next().unwrap().parse().unwrap();
            (n - 1) / 3
        };
        let events = fetcher.events.lock().unwrap();
        assert_eq!(events.len(), 14);
        for (i, (url, started)) in events.iter().enumerate() {
            if !*started {
                continue;
            }
            let batch = batch_of(url);
            let unfinished_earlier = events[..i]
                .iter()
                .filter(|(u, s)| *s && batch_of(u) < batch)
                .count()
                != events[..i].iter().filter(|(u, s)| !*s && batch_of(u) < batch).count();
            assert!(!unfinished_earlier, "{url} started before the previous batch settled");
        }
    }

    #[tokio::test]
    async fn test_enrich_one_surfaces_error() {
        let enricher = DetailEnricher::new(Arc::new(FakeFetcher::new()), parser(), 50);
        assert!(enricher.enrich_one(summary("https://x/missing")).await.is_err());
    }
}
