//! Record store abstractions.
//!
//! The pipeline talks to the store only through [`ListingStore`] and
//! [`ProfileStore`], with queries expressed in the [`Filter`] vocabulary.
//!
//! ## Backends
//!
//! ```text
//! MemoryStore     in-process, for tests and dry runs
//! LocalStorage    {root}/listings.json + {root}/profiles.json
//! ```

pub mod filter;
pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{ListingRecord, StoredListing, SubscriberProfile};

// Re-export for convenience
pub use filter::Filter;
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Partial update of a stored record's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub active: Option<bool>,
    pub disabled: Option<bool>,
    pub notified: Option<bool>,
    pub date_removed: Option<DateTime<Utc>>,
    pub short_url: Option<String>,
}

impl RecordPatch {
    /// Soft-delete: inactive, disabled, timestamped.
    pub fn disable(now: DateTime<Utc>) -> Self {
        Self {
            active: Some(false),
            disabled: Some(true),
            date_removed: Some(now),
            ..Self::default()
        }
    }

    pub fn notified() -> Self {
        Self {
            notified: Some(true),
            ..Self::default()
        }
    }

    pub fn short_url(url: impl Into<String>) -> Self {
        Self {
            short_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Apply to a stored listing, bumping its modification time.
    pub fn apply(&self, listing: &mut StoredListing, now: DateTime<Utc>) {
        let state = &mut listing.state;
        if let Some(active) = self.active {
            state.active = active;
        }
        if let Some(disabled) = self.disabled {
            state.disabled = disabled;
        }
        if let Some(notified) = self.notified {
            state.notified = notified;
        }
        if let Some(removed) = self.date_removed {
            state.date_removed = Some(removed);
        }
        if let Some(url) = &self.short_url {
            listing.record.short_url = Some(url.clone());
        }
        state.date_modified = now;
    }
}

/// Persisted listing history.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Records matching `filter`, in insertion order.
    async fn find(&self, filter: &Filter) -> Result<Vec<StoredListing>>;

    /// Insert records as fresh active versions.
    async fn insert(&self, records: Vec<ListingRecord>) -> Result<Vec<StoredListing>>;

    /// Apply a patch to the record with `id`.
    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<StoredListing>;

    /// Insert a single record.
    async fn insert_one(&self, record: ListingRecord) -> Result<StoredListing> {
        self.insert(vec![record])
            .await?
            .pop()
            .ok_or_else(|| AppError::persistence("insert returned no record"))
    }
}

/// Read access to subscriber profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profiles(&self) -> Result<Vec<SubscriberProfile>>;
}

/// Record counts by lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub live: usize,
    pub disabled: usize,
    pub notified: usize,
}

/// Count stored records by state.
pub async fn store_stats(store: &dyn ListingStore) -> Result<StoreStats> {
    let all = store.find(&Filter::all()).await?;
    Ok(StoreStats {
        total: all.len(),
        live: all.iter().filter(|l| l.is_live()).count(),
        disabled: all.iter().filter(|l| l.state.disabled).count(),
        notified: all.iter().filter(|l| l.state.notified).count(),
    })
}

/// Shared find over an in-memory slice.
pub(crate) fn select(listings: &[StoredListing], filter: &Filter) -> Result<Vec<StoredListing>> {
    let mut found = Vec::new();
    for listing in listings {
        if filter.matches(&serde_json::to_value(listing)?) {
            found.push(listing.clone());
        }
    }
    Ok(found)
}

/// Build the stored form of freshly inserted records.
pub(crate) fn new_versions(records: Vec<ListingRecord>, now: DateTime<Utc>) -> Vec<StoredListing> {
    records
        .into_iter()
        .map(|record| StoredListing::new_active(record, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;
    use chrono::TimeZone;

    fn stored(url: &str) -> StoredListing {
        let record = ListingRecord::without_details(ListingSummary {
            title: "Etta".to_string(),
            rent: "6 000 kr".to_string(),
            rooms: String::new(),
            size: String::new(),
            location: "Stockholm".to_string(),
            posted_at: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
            url: url.to_string(),
            thumbnail: None,
        });
        StoredListing::new_active(record, Utc.with_ymd_and_hms(2026, 10, 2, 8, 0, 0).unwrap())
    }

    #[test]
    fn test_disable_patch() {
        let mut listing = stored("https://x/1");
        let now = Utc.with_ymd_and_hms(2026, 10, 3, 8, 0, 0).unwrap();
        RecordPatch::disable(now).apply(&mut listing, now);

        assert!(!listing.state.active);
        assert!(listing.state.disabled);
        assert_eq!(listing.state.date_removed, Some(now));
        assert_eq!(listing.state.date_modified, now);
        assert!(!listing.is_live());
    }

    #[test]
    fn test_short_url_patch_leaves_state() {
        let mut listing = stored("https://x/1");
        let now = Utc::now();
        RecordPatch::short_url("https://bit.ly/abc").apply(&mut listing, now);
        assert_eq!(listing.record.share_url(), "https://bit.ly/abc");
        assert!(listing.is_live());
        assert!(!listing.state.notified);
    }

    #[test]
    fn test_select_by_url_membership() {
        let listings = vec![stored("https://x/1"), stored("https://x/2"), stored("https://x/3")];
        let filter = Filter::and(vec![
            Filter::is_in("url", ["https://x/1", "https://x/3"]),
            Filter::eq("active", true),
        ]);
        let found = select(&listings, &filter).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].record.url, "https://x/3");
    }
}
