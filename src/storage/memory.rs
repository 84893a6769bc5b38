// src/storage/memory.rs

//! In-process store.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{ListingRecord, StoredListing, SubscriberProfile};
use crate::storage::{Filter, ListingStore, ProfileStore, RecordPatch, new_versions, select};

/// Store holding everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    listings: RwLock<Vec<StoredListing>>,
    profiles: RwLock<Vec<SubscriberProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<SubscriberProfile>) -> Self {
        Self {
            listings: RwLock::default(),
            profiles: RwLock::new(profiles),
        }
    }

    /// Seed stored listings as-is, keeping their ids and state.
    pub async fn seed(&self, listings: Vec<StoredListing>) {
        self.listings.write().await.extend(listings);
    }

    /// Snapshot of every stored listing.
    pub async fn all(&self) -> Vec<StoredListing> {
        self.listings.read().await.clone()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn find(&self, filter: &Filter) -> Result<Vec<StoredListing>> {
        select(&self.listings.read().await, filter)
    }

    async fn insert(&self, records: Vec<ListingRecord>) -> Result<Vec<StoredListing>> {
        let inserted = new_versions(records, Utc::now());
        self.listings.write().await.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<StoredListing> {
        let mut listings = self.listings.write().await;
        let listing = listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::persistence(format!("no record with id {id}")))?;
        patch.apply(listing, Utc::now());
        Ok(listing.clone())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load_profiles(&self) -> Result<Vec<SubscriberProfile>> {
        Ok(self.profiles.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;

    fn record(url: &str) -> ListingRecord {
        ListingRecord::without_details(ListingSummary {
            title: "Etta".to_string(),
            rent: "6 000 kr".to_string(),
            rooms: String::new(),
            size: String::new(),
            location: "Stockholm".to_string(),
            posted_at: Utc::now(),
            url: url.to_string(),
            thumbnail: None,
        })
    }

    #[tokio::test]
    async fn test_insert_find_update() {
        let store = MemoryStore::new();
        let inserted = store
            .insert(vec![record("https://x/1"), record("https://x/2")])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert!(inserted.iter().all(StoredListing::is_live));

        let updated = store
            .update(&inserted[0].id, &RecordPatch::notified())
            .await
            .unwrap();
        assert!(updated.state.notified);

        let pending = store
            .find(&Filter::and(vec![Filter::live(), Filter::eq("notified", false)]))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record.url, "https://x/2");
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = MemoryStore::new();
        let err = store.update("nope", &RecordPatch::notified()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_insert_one_and_profiles() {
        let store = MemoryStore::with_profiles(vec![SubscriberProfile::new("u1")]);
        let stored = store.insert_one(record("https://x/9")).await.unwrap();
        assert_eq!(stored.record.url, "https://x/9");
        assert_eq!(store.load_profiles().await.unwrap().len(), 1);
    }
}
