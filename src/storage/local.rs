//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── listings.json         # Every listing version, append-only history
//! └── profiles.json         # Subscriber profiles (maintained externally)
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so a crash
//! never leaves a truncated `listings.json`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{ListingRecord, StoredListing, SubscriberProfile};
use crate::storage::{Filter, ListingStore, ProfileStore, RecordPatch, new_versions, select};

const LISTINGS_KEY: &str = "listings.json";
const PROFILES_KEY: &str = "profiles.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles on `listings.json`
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_listings(&self) -> Result<Vec<StoredListing>> {
        Ok(self.read_json(LISTINGS_KEY).await?.unwrap_or_default())
    }

    /// Replace the stored subscriber profiles.
    pub async fn save_profiles(&self, profiles: &[SubscriberProfile]) -> Result<()> {
        self.write_json(PROFILES_KEY, profiles).await
    }
}

#[async_trait]
impl ListingStore for LocalStorage {
    async fn find(&self, filter: &Filter) -> Result<Vec<StoredListing>> {
        select(&self.load_listings().await?, filter)
    }

    async fn insert(&self, records: Vec<ListingRecord>) -> Result<Vec<StoredListing>> {
        let _guard = self.write_lock.lock().await;
        let mut listings = self.load_listings().await?;
        let inserted = new_versions(records, Utc::now());
        listings.extend(inserted.iter().cloned());
        self.write_json(LISTINGS_KEY, &listings)
            .await
            .map_err(|e| AppError::persistence(format!("insert failed: {e}")))?;
        Ok(inserted)
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<StoredListing> {
        let _guard = self.write_lock.lock().await;
        let mut listings = self.load_listings().await?;
        let listing = listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::persistence(format!("no record with id {id}")))?;
        patch.apply(listing, Utc::now());
        let updated = listing.clone();
        self.write_json(LISTINGS_KEY, &listings)
            .await
            .map_err(|e| AppError::persistence(format!("update of {id} failed: {e}")))?;
        Ok(updated)
    }
}

#[async_trait]
impl ProfileStore for LocalStorage {
    async fn load_profiles(&self) -> Result<Vec<SubscriberProfile>> {
        match self.read_json(PROFILES_KEY).await? {
            Some(profiles) => Ok(profiles),
            None => {
                log::warn!("No {PROFILES_KEY} found in {:?}", self.root_dir);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;
    use tempfile::TempDir;

    fn record(url: &str) -> ListingRecord {
        ListingRecord::without_details(ListingSummary {
            title: "Tvåa".to_string(),
            rent: "9 000 kr".to_string(),
            rooms: "2 rum".to_string(),
            size: "50 m²".to_string(),
            location: "Stockholm, Hornstull".to_string(),
            posted_at: Utc::now(),
            url: url.to_string(),
            thumbnail: None,
        })
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!storage.path("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read_bytes("nope.txt").await.unwrap().is_none());
        assert!(storage.find(&Filter::all()).await.unwrap().is_empty());
        assert!(storage.load_profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listings_persist_across_instances() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"));

        let inserted = storage
            .insert(vec![record("https://x/1"), record("https://x/2")])
            .await
            .unwrap();
        storage
            .update(&inserted[1].id, &RecordPatch::disable(Utc::now()))
            .await
            .unwrap();

        let reopened = LocalStorage::new(tmp.path().join("nested"));
        let live = reopened.find(&Filter::live()).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].record.url, "https://x/1");
        assert_eq!(reopened.find(&Filter::all()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_profiles_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut profile = SubscriberProfile::new("u1");
        profile.max_price = Some(8000);

        storage.save_profiles(&[profile.clone()]).await.unwrap();
        assert_eq!(storage.load_profiles().await.unwrap(), vec![profile]);
    }
}
