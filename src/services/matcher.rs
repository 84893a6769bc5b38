// src/services/matcher.rs

//! Subscriber interest matching.

use crate::models::{Facet, ListingRecord, SubscriberProfile};

/// A profile together with the records it is interested in.
///
/// `T` is anything carrying a [`ListingRecord`], so stored listings can be
/// matched without losing their ids.
#[derive(Debug, Clone)]
pub struct ProfileMatch<'a, T = ListingRecord> {
    pub profile: &'a SubscriberProfile,
    pub records: Vec<&'a T>,
}

/// Whether `record` satisfies every filter of `profile`.
pub fn is_interested(profile: &SubscriberProfile, record: &ListingRecord) -> bool {
    price_matches(profile, record) && facets_match(profile, record) && time_matches(profile, record)
}

/// Absent price or absent bound never excludes.
fn price_matches(profile: &SubscriberProfile, record: &ListingRecord) -> bool {
    let Some(price) = record.price else {
        return true;
    };
    profile.min_price.is_none_or(|min| price >= min)
        && profile.max_price.is_none_or(|max| price <= max)
}

/// Every facet the record carries must be allowed.
fn facets_match(profile: &SubscriberProfile, record: &ListingRecord) -> bool {
    Facet::ALL
        .into_iter()
        .all(|facet| !record.facets.get(facet) || profile.allowed.allows(facet))
}

/// An unknown duration counts as long enough.
fn time_matches(profile: &SubscriberProfile, record: &ListingRecord) -> bool {
    let span = &record.span;
    let Some(min_period) = profile.min_period else {
        return true;
    };
    span.end.is_none()
        || span.is_long_term
        || span.period.is_some_and(|period| period >= min_period)
}

/// Match every profile against every record.
///
/// Profiles without matching records are left out; record order follows
/// the input.
pub fn match_profiles<'a, T: AsRef<ListingRecord>>(
    profiles: &'a [SubscriberProfile],
    records: &'a [T],
) -> Vec<ProfileMatch<'a, T>> {
    profiles
        .iter()
        .filter_map(|profile| {
            let records: Vec<&T> = records
                .iter()
                .filter(|record| is_interested(profile, (*record).as_ref()))
                .collect();
            (!records.is_empty()).then_some(ProfileMatch { profile, records })
        })
        .collect()
}
