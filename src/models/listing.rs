//! Listing data structures.
//!
//! A [`ListingSummary`] is what an index page shows. The detail enricher
//! merges it with [`ListingDetails`] into a [`ListingRecord`], which is
//! persisted as a [`StoredListing`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{ClassificationFacets, TemporalSpan};

/// Minimal listing fields extracted from an index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,

    /// Rent as displayed, e.g. "7 500 kr/mån"
    pub rent: String,

    /// Room count as displayed
    pub rooms: String,

    /// Size as displayed
    pub size: String,

    /// Rough location, e.g. "Stockholm, Södermalm"
    pub location: String,

    pub posted_at: DateTime<Utc>,

    /// Canonical URL of the detail page
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl ListingSummary {
    /// Monthly rent parsed from the rent text.
    pub fn price(&self) -> Option<u32> {
        parse_price(&self.rent)
    }
}

/// Fields extracted from a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDetails {
    pub owner: String,
    pub body: String,
    pub address: String,
    pub images: Vec<String>,
    /// The site reports the ad as removed
    pub withdrawn: bool,
}

/// A fully enriched and classified listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    pub rent: String,
    pub rooms: String,
    pub size: String,
    pub location: String,
    pub posted_at: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub withdrawn: bool,
    /// The detail page could not be fetched; detail fields are empty
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub details_missing: bool,

    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub facets: ClassificationFacets,
    pub span: TemporalSpan,
    #[serde(default)]
    pub region: Option<String>,

    /// Shareable link, attached when notifying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
}

impl ListingRecord {
    /// Merge an index summary with its detail page.
    pub fn new(summary: ListingSummary, details: ListingDetails) -> Self {
        let price = summary.price();
        let span = TemporalSpan::open(summary.posted_at.date_naive());
        Self {
            title: summary.title,
            rent: summary.rent,
            rooms: summary.rooms,
            size: summary.size,
            location: summary.location,
            posted_at: summary.posted_at,
            url: summary.url,
            thumbnail: summary.thumbnail,
            owner: details.owner,
            body: details.body,
            address: details.address,
            images: details.images,
            withdrawn: details.withdrawn,
            details_missing: false,
            price,
            facets: ClassificationFacets::default(),
            span,
            region: None,
            short_url: None,
        }
    }

    /// A record for a summary whose detail page could not be fetched.
    ///
    /// Marked with `details_missing`, so reconciling it keeps any stored
    /// version instead of superseding it with empty details.
    pub fn without_details(summary: ListingSummary) -> Self {
        Self {
            details_missing: true,
            ..Self::new(summary, ListingDetails::default())
        }
    }

    /// Title and body joined, the input of every text heuristic.
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }

    /// Whether the scraped content equals `other`.
    ///
    /// Derived fields (facets, span, region) and the short URL are not
    /// compared: the former are functions of the compared text, and the
    /// span may be anchored at the crawl date.
    pub fn same_content(&self, other: &ListingRecord) -> bool {
        self.title == other.title
            && self.rent == other.rent
            && self.rooms == other.rooms
            && self.size == other.size
            && self.location == other.location
            && self.posted_at == other.posted_at
            && self.url == other.url
            && self.thumbnail == other.thumbnail
            && self.owner == other.owner
            && self.body == other.body
            && self.address == other.address
            && self.images == other.images
            && self.withdrawn == other.withdrawn
            && self.price == other.price
    }

    /// Link to use in outbound messages.
    pub fn share_url(&self) -> &str {
        self.short_url.as_deref().unwrap_or(&self.url)
    }
}

impl AsRef<ListingRecord> for ListingRecord {
    fn as_ref(&self) -> &ListingRecord {
        self
    }
}

/// Lifecycle state of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordState {
    pub active: bool,
    pub disabled: bool,
    #[serde(default)]
    pub notified: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_removed: Option<DateTime<Utc>>,
}

/// A record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredListing {
    pub id: String,
    #[serde(flatten)]
    pub record: ListingRecord,
    #[serde(flatten)]
    pub state: RecordState,
}

impl StoredListing {
    /// Wrap a freshly inserted record as active.
    pub fn new_active(record: ListingRecord, now: DateTime<Utc>) -> Self {
        let id = record_id(&record.url, now);
        Self {
            id,
            record,
            state: RecordState {
                active: true,
                disabled: false,
                notified: false,
                date_created: now,
                date_modified: now,
                date_removed: None,
            },
        }
    }

    /// Active and not soft-deleted.
    pub fn is_live(&self) -> bool {
        self.state.active && !self.state.disabled
    }
}

impl AsRef<ListingRecord> for StoredListing {
    fn as_ref(&self) -> &ListingRecord {
        &self.record
    }
}

/// Stable id for one version of a listing.
fn record_id(url: &str, created: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(created.to_rfc3339().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..24].to_string()
}

/// Parse the first number of a rent text, allowing thousands separators.
fn parse_price(rent: &str) -> Option<u32> {
    let start = rent.find(|c: char| c.is_ascii_digit())?;
    let digits: String = rent[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ' ' || *c == '\u{a0}')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_summary() -> ListingSummary {
        ListingSummary {
            title: "Ljus tvåa i Vasastan".to_string(),
            rent: "7 500 kr/mån".to_string(),
            rooms: "2 rum".to_string(),
            size: "48 m²".to_string(),
            location: "Stockholm, Vasastan".to_string(),
            posted_at: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
            url: "https://www.blocket.se/stockholm/ljus_tvaa_1234.htm".to_string(),
            thumbnail: None,
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("7 500 kr/mån"), Some(7500));
        assert_eq!(parse_price("12\u{a0}000 kr"), Some(12000));
        assert_eq!(parse_price("4500:- (el ingår, 2 mån)"), Some(4500));
        assert_eq!(parse_price("Hyra ej angiven"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_new_record_takes_posting_date_as_start() {
        let record = ListingRecord::without_details(sample_summary());
        assert_eq!(record.price, Some(7500));
        assert_eq!(record.span.start, record.posted_at.date_naive());
        assert!(record.span.is_open_ended());
        assert!(record.body.is_empty());
        assert!(record.details_missing);
    }

    #[test]
    fn test_same_content_ignores_derived_fields() {
        let a = ListingRecord::without_details(sample_summary());
        let mut b = a.clone();
        b.facets.shared = true;
        b.short_url = Some("https://bit.ly/x".to_string());
        b.region = Some("Stockholm".to_string());
        assert!(a.same_content(&b));

        b.body = "Nu med diskmaskin".to_string();
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_stored_listing_serializes_flat() {
        let now = Utc.with_ymd_and_hms(2026, 10, 2, 8, 0, 0).unwrap();
        let stored = StoredListing::new_active(ListingRecord::without_details(sample_summary()), now);
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["url"], stored.record.url.as_str());
        assert_eq!(value["active"], true);
        assert_eq!(value["disabled"], false);
        assert_eq!(stored.id.len(), 24);

        let back: StoredListing = serde_json::from_value(value).unwrap();
        assert_eq!(back, stored);
    }
}
