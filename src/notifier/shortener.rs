// src/notifier/shortener.rs

//! Short links for outbound messages.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{ShortenerConfig, StoredListing};

/// Turns a long URL into a shareable one.
#[async_trait]
pub trait UrlShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String>;
}

/// Bitly v3 `shorten` endpoint.
pub struct BitlyShortener {
    client: Client,
    config: ShortenerConfig,
}

#[derive(Deserialize)]
struct BitlyResponse {
    data: BitlyData,
}

#[derive(Deserialize)]
struct BitlyData {
    url: String,
}

impl BitlyShortener {
    pub fn new(client: Client, config: ShortenerConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl UrlShortener for BitlyShortener {
    async fn shorten(&self, url: &str) -> Result<String> {
        let response: BitlyResponse = self
            .client
            .get(&self.config.endpoint)
            .query(&[("access_token", self.config.access_token.as_str()), ("longUrl", url)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AppError::shortener)?
            .json()
            .await
            .map_err(AppError::shortener)?;
        Ok(response.data.url)
    }
}

/// Attach short URLs to listings that lack one.
///
/// Each distinct URL is shortened once, concurrently. Failures leave the
/// listing without a short URL so messages fall back to the full link.
/// Returns `(listing id, short url)` for every listing that got one.
pub async fn attach_short_urls(
    shortener: &dyn UrlShortener,
    listings: &mut [StoredListing],
    max_concurrent: usize,
) -> Vec<(String, String)> {
    let mut distinct: Vec<String> = listings
        .iter()
        .filter(|l| l.record.short_url.is_none())
        .map(|l| l.record.url.clone())
        .collect();
    distinct.sort();
    distinct.dedup();

    let shortened: HashMap<String, String> = stream::iter(distinct)
        .map(|url| async move {
            let result = shortener.shorten(&url).await;
            (url, result)
        })
        .buffer_unordered(max_concurrent.max(1))
        .filter_map(|(url, result)| async move {
            match result {
                Ok(short) => Some((url, short)),
                Err(e) => {
                    log::warn!("Could not shorten {url}: {e}");
                    None
                }
            }
        })
        .collect()
        .await;

    let mut attached = Vec::new();
    for listing in listings.iter_mut().filter(|l| l.record.short_url.is_none()) {
        if let Some(short) = shortened.get(&listing.record.url) {
            listing.record.short_url = Some(short.clone());
            attached.push((listing.id.clone(), short.clone()));
        }
    }
    attached
}


#[cfg(test)]
mod tests {
    use super::fake::CountingShortener;
    use super::*;
    use crate::models::{ListingRecord, ListingSummary};
    use chrono::Utc;

    fn stored(url: &str) -> StoredListing {
        let record = ListingRecord::without_details(ListingSummary {
            title: "Rum".to_string(),
            rent: String::new(),
            rooms: String::new(),
            size: String::new(),
            location: String::new(),
            posted_at: Utc::now(),
            url: url.to_string(),
            thumbnail: None,
        });
        StoredListing::new_active(record, Utc::now())
    }

    #[tokio::test]
    async fn test_each_url_shortened_once_and_failures_fall_back() {
        let shortener = CountingShortener::default();
        let mut listings = vec![
            stored("https://x/1"),
            stored("https://x/1"),
            stored("https://x/fail"),
        ];
        listings[1].id = "second".to_string();

        let attached = attach_short_urls(&shortener, &mut listings, 4).await;

        assert_eq!(shortener.calls.lock().unwrap().len(), 2);
        assert_eq!(attached.len(), 2);
        assert_eq!(listings[0].record.short_url, listings[1].record.short_url);
        assert!(listings[0].record.short_url.is_some());
        assert_eq!(listings[2].record.share_url(), "https://x/fail");
    }
}
