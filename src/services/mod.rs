//! Service layer for the rental watcher.
//!
//! This module contains the business logic for:
//! - Page fetching (`PageFetcher`, `HttpFetcher`)
//! - Index parsing and pagination (`IndexParser`, `PaginationWalker`)
//! - Detail enrichment (`DetailParser`, `DetailEnricher`)
//! - Classification and lease span inference (`Classifier`)
//! - Interest matching (`match_profiles`)

pub mod classifier;
pub mod detail;
pub mod fetcher;
pub mod index;
pub mod matcher;
pub mod timespan;

pub use classifier::{Classifier, classify, classify_text};
pub use detail::{DetailEnricher, DetailParser, EnrichOutcome};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use index::{IndexPage, IndexParser, PaginationWalker, WalkedPage};
pub use matcher::{ProfileMatch, is_interested, match_profiles};
pub use timespan::extract_span;
