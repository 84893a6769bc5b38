// src/pipeline/crawl.rs

//! Detailed and summary pipeline runs.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use futures::future::join_all;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, StoredListing};
use crate::notifier::{DispatchMode, Dispatcher, UrlShortener, attach_short_urls};
use crate::pipeline::diff::reconcile;
use crate::services::{
    Classifier, DetailEnricher, DetailParser, IndexParser, PageFetcher, PaginationWalker,
    match_profiles,
};
use crate::storage::{Filter, ListingStore, ProfileStore, RecordPatch};

/// Hours a summary run looks back.
const SUMMARY_WINDOW_HOURS: i64 = 24;

/// Counts describing one run, stage by stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub summaries: usize,
    pub detail_failures: usize,
    pub inserted: usize,
    pub disabled: usize,
    pub persistence_failures: usize,
    /// Stored listings considered for notification
    pub candidates: usize,
    pub matched_profiles: usize,
    pub sends_succeeded: usize,
    pub sends_failed: usize,
    pub notified: usize,
}

/// The crawl → reconcile → match → notify pipeline.
pub struct CrawlPipeline {
    config: Arc<Config>,
    walker: PaginationWalker,
    enricher: DetailEnricher,
    classifier: Classifier,
    listings: Arc<dyn ListingStore>,
    profiles: Arc<dyn ProfileStore>,
    dispatcher: Dispatcher,
    shortener: Option<Arc<dyn UrlShortener>>,
}

impl CrawlPipeline {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn PageFetcher>,
        listings: Arc<dyn ListingStore>,
        profiles: Arc<dyn ProfileStore>,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let walker = PaginationWalker::new(
            fetcher.clone(),
            IndexParser::new(&config.selectors)?,
            config.crawler.clone(),
        );
        let enricher = DetailEnricher::new(
            fetcher,
            DetailParser::new(&config.selectors)?,
            config.crawler.detail_batch_size,
        );
        let classifier = Classifier::new(&config.crawler.base_url);

        Ok(Self {
            config,
            walker,
            enricher,
            classifier,
            listings,
            profiles,
            dispatcher,
            shortener: None,
        })
    }

    pub fn with_shortener(mut self, shortener: Arc<dyn UrlShortener>) -> Self {
        self.shortener = Some(shortener);
        self
    }

    /// Crawl, store changes, and notify subscribers about new listings.
    ///
    /// Fails only when the walk or a store query fails; per-listing and
    /// per-send failures are counted in the returned stats.
    pub async fn run(&self) -> Result<RunStats> {
        let mut stats = RunStats {
            start_time: Some(Utc::now()),
            ..RunStats::default()
        };
        log::info!("Starting crawl of {}", self.config.crawler.base_url);

        let summaries = self.walker.walk(self.config.crawler.first_page).await?;
        stats.summaries = summaries.len();

        let enriched = self.enricher.enrich(summaries).await;
        stats.detail_failures = enriched.failures;

        let today = Local::now().date_naive();
        let records = self.classifier.analyse_all(enriched.records, today);

        let outcome = reconcile(self.listings.as_ref(), records, Utc::now()).await?;
        stats.inserted = outcome.inserted.len();
        stats.disabled = outcome.disabled.len();
        stats.persistence_failures =
            outcome.disable_failures.len() + usize::from(outcome.insert_failure.is_some());

        let since = Utc::now() - Duration::hours(self.config.notify.notify_window_hours);
        let filter = Filter::and(vec![
            Filter::live(),
            Filter::eq("notified", false),
            Filter::since("date_created", since),
        ]);
        self.notify(&filter, DispatchMode::Detailed, &mut stats).await?;

        stats.end_time = Some(Utc::now());
        log_stats("Crawl", &stats);
        Ok(stats)
    }

    /// Email every subscriber a digest of the last day's listings.
    ///
    /// Leaves the `notified` flags untouched.
    pub async fn run_summary(&self) -> Result<RunStats> {
        let mut stats = RunStats {
            start_time: Some(Utc::now()),
            ..RunStats::default()
        };
        log::info!("Starting daily summary");

        let since = Utc::now() - Duration::hours(SUMMARY_WINDOW_HOURS);
        let filter = Filter::and(vec![Filter::live(), Filter::since("date_created", since)]);
        self.notify(&filter, DispatchMode::Summary, &mut stats).await?;

        stats.end_time = Some(Utc::now());
        log_stats("Summary", &stats);
        Ok(stats)
    }

    async fn notify(&self, filter: &Filter, mode: DispatchMode, stats: &mut RunStats) -> Result<()> {
        let mut pending = self.listings.find(filter).await?;
        stats.candidates = pending.len();
        if pending.is_empty() {
            log::info!("No listings to notify about");
            return Ok(());
        }

        let profiles = self.profiles.load_profiles().await?;
        let wanted: HashSet<String> = match_profiles(&profiles, &pending)
            .iter()
            .flat_map(|m| m.records.iter().map(|l| l.id.clone()))
            .collect();
        pending.retain(|l| wanted.contains(&l.id));

        if let Some(shortener) = &self.shortener {
            self.shorten(shortener.as_ref(), &mut pending, stats).await;
        }

        let matches = match_profiles(&profiles, &pending);
        stats.matched_profiles = matches.len();
        log::info!(
            "{} of {} profiles match {} listings",
            matches.len(),
            profiles.len(),
            pending.len()
        );

        let tasks = self.dispatcher.plan(&matches, mode);
        let report = self.dispatcher.dispatch(tasks).await;
        stats.sends_succeeded = report.succeeded();
        stats.sends_failed = report.failed();

        if mode == DispatchMode::Detailed {
            let delivered = report.delivered_listing_ids();
            let patch = RecordPatch::notified();
            let results = join_all(delivered.iter().map(|id| self.listings.update(id, &patch))).await;
            for (id, result) in delivered.iter().zip(results) {
                match result {
                    Ok(_) => stats.notified += 1,
                    Err(e) => {
                        log::error!("Failed to mark {id} as notified: {e}");
                        stats.persistence_failures += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Attach short links and persist them; failures fall back to full URLs.
    async fn shorten(
        &self,
        shortener: &dyn UrlShortener,
        pending: &mut [StoredListing],
        stats: &mut RunStats,
    ) {
        let attached =
            attach_short_urls(shortener, pending, self.config.notify.max_concurrent_sends).await;
        let results = join_all(attached.iter().map(|(id, short)| async move {
            self.listings
                .update(id, &RecordPatch::short_url(short.as_str()))
                .await
        }))
        .await;
        for ((id, _), result) in attached.iter().zip(results) {
            if let Err(e) = result {
                log::warn!("Could not store short URL for {id}: {e}");
                stats.persistence_failures += 1;
            }
        }
        log::debug!("Attached {} short URLs", attached.len());
    }
}

fn log_stats(run: &str, stats: &RunStats) {
    let elapsed = match (stats.start_time, stats.end_time) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    };
    log::info!(
        "{run} finished in {elapsed:.1}s: {} summaries ({} detail failures), {} inserted, \
         {} disabled, {} candidates, {} profiles matched, {} sent, {} failed, {} notified, \
         {} persistence failures",
        stats.summaries,
        stats.detail_failures,
        stats.inserted,
        stats.disabled,
        stats.candidates,
        stats.matched_profiles,
        stats.sends_succeeded,
        stats.sends_failed,
        stats.notified,
        stats.persistence_failures
    );
}
