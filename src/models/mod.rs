// src/models/mod.rs

//! Domain models for the rental watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod facets;
mod listing;
mod profile;
mod selectors;
mod span;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, EmailConfig, LoggingConfig, NotifyConfig, QuietHours, ScheduleConfig,
    ShortenerConfig, SmsConfig, StorageConfig,
};
pub use facets::{ClassificationFacets, Facet};
pub use listing::{ListingDetails, ListingRecord, ListingSummary, RecordState, StoredListing};
pub use profile::{FacetAllowances, NotifyToggles, SubscriberProfile};
pub use selectors::ListingSelectors;
pub use span::TemporalSpan;
