// src/pipeline/diff.rs

//! Historical diff of freshly crawled records against stored state.
//!
//! The store keeps an append-only history per URL: a changed listing is
//! stored as a new active version and the previous version is disabled.
//!
//! Two overlapping runs may both see a URL as unseen and insert it twice.
//! Runs are spaced by the scheduler interval, and the next reconcile
//! disables the surplus copy, so this window is accepted rather than locked.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::error::{AppError, Result};
use crate::models::{ListingRecord, StoredListing};
use crate::storage::{Filter, ListingStore, RecordPatch};

/// What reconciling a batch should do, before touching the store.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    /// New or changed records to insert as active
    pub insert: Vec<ListingRecord>,
    /// Ids of stored versions to disable
    pub disable: Vec<String>,
    /// Candidates identical to their stored version
    pub unchanged: usize,
    /// Withdrawn candidates, never inserted
    pub withdrawn: usize,
}

/// Result of applying a [`ReconcilePlan`].
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub inserted: Vec<StoredListing>,
    /// Ids successfully disabled
    pub disabled: Vec<String>,
    pub disable_failures: Vec<(String, AppError)>,
    pub insert_failure: Option<AppError>,
    pub unchanged: usize,
}

impl ReconcileOutcome {
    pub fn has_failures(&self) -> bool {
        !self.disable_failures.is_empty() || self.insert_failure.is_some()
    }
}

/// Plan inserts and disables for `candidates` given the live stored
/// versions of their URLs.
///
/// Candidates are deduplicated by URL, first occurrence winning. When
/// several live versions share a URL, the newest is the counterpart and the
/// rest are disabled. A candidate whose details could not be fetched never
/// supersedes its counterpart; it is inserted only for an unseen URL.
pub fn plan_reconcile(live: &[StoredListing], candidates: Vec<ListingRecord>) -> ReconcilePlan {
    let mut by_url: HashMap<&str, Vec<&StoredListing>> = HashMap::new();
    for listing in live {
        by_url.entry(listing.record.url.as_str()).or_default().push(listing);
    }

    let mut plan = ReconcilePlan::default();
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in candidates {
        if !seen.insert(candidate.url.clone()) {
            log::debug!("Skipping duplicate candidate {}", candidate.url);
            continue;
        }

        let mut versions = by_url.remove(candidate.url.as_str()).unwrap_or_default();
        versions.sort_by_key(|l| l.state.date_created);
        let counterpart = versions.pop();
        plan.disable.extend(versions.into_iter().map(|l| l.id.clone()));

        if candidate.withdrawn {
            plan.withdrawn += 1;
            plan.disable.extend(counterpart.map(|stored| stored.id.clone()));
            continue;
        }

        match counterpart {
            None => plan.insert.push(candidate),
            Some(_) if candidate.details_missing => plan.unchanged += 1,
            Some(stored) if stored.record.same_content(&candidate) => plan.unchanged += 1,
            Some(stored) => {
                plan.disable.push(stored.id.clone());
                plan.insert.push(candidate);
            }
        }
    }
    plan
}

/// Reconcile a batch of classified records with the store.
///
/// Only a failure of the initial lookup is returned as an error. Disables
/// and the insert run side by side; their failures are reported in the
/// outcome without blocking each other.
pub async fn reconcile(
    store: &dyn ListingStore,
    candidates: Vec<ListingRecord>,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome> {
    if candidates.is_empty() {
        log::info!("Nothing to reconcile");
        return Ok(ReconcileOutcome::default());
    }

    let urls: HashSet<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
    let filter = Filter::and(vec![Filter::live(), Filter::is_in("url", urls)]);
    let live = store.find(&filter).await?;

    let total = candidates.len();
    let ReconcilePlan {
        insert,
        disable,
        unchanged,
        withdrawn,
    } = plan_reconcile(&live, candidates);
    log::debug!(
        "Reconcile plan: {} candidates, {} live, {} to insert, {} to disable, {} unchanged, {} withdrawn",
        total,
        live.len(),
        insert.len(),
        disable.len(),
        unchanged,
        withdrawn
    );

    let patch = RecordPatch::disable(now);
    let disables = join_all(disable.iter().map(|id| store.update(id, &patch)));
    let inserts = async move {
        if insert.is_empty() {
            Ok(Vec::new())
        } else {
            store.insert(insert).await
        }
    };
    let (disable_results, insert_result) = futures::join!(disables, inserts);

    let mut outcome = ReconcileOutcome {
        unchanged,
        ..ReconcileOutcome::default()
    };
    for (id, result) in disable.into_iter().zip(disable_results) {
        match result {
            Ok(_) => outcome.disabled.push(id),
            Err(e) => {
                log::error!("Failed to disable record {id}: {e}");
                outcome.disable_failures.push((id, e));
            }
        }
    }
    match insert_result {
        Ok(inserted) => outcome.inserted = inserted,
        Err(e) => {
            log::error!("Failed to insert new records: {e}");
            outcome.insert_failure = Some(e);
        }
    }

    log::info!(
        "Reconciled {} candidates: {} inserted, {} disabled, {} unchanged, {} disable failures{}",
        total,
        outcome.inserted.len(),
        outcome.disabled.len(),
        outcome.unchanged,
        outcome.disable_failures.len(),
        if outcome.insert_failure.is_some() {
            ", insert failed"
        } else {
            ""
        }
    );
    Ok(outcome)
}
