// src/services/classifier.rs

//! Rule-based listing classification.
//!
//! Rules are Swedish and English keyword patterns matched case-insensitively
//! against the title and body separately; a facet holds if either matches.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{ClassificationFacets, ListingRecord};
use crate::services::timespan::extract_span;
use crate::utils::static_regex;

static GIRLS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)tjej|kvinn|flick|girl|wom[ae]n"));

static COMMUTERS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)pendlare|veckopendlare"));

static SHARED: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(concat!(
        r"(?i)dela|del (i|med)|delas med|dela en|uthyrningsdel|inneboende",
        r"|rum.{1,15}(i|till)|rum.{1,20}hyr|hyr.{1,15}möblerat.{1,10}rum|hyr.{1,20}rum",
        r"|room|mate|share (an|a)|a room|room.{1,40}for rent|rent.{1,15}room| room is|furnished room",
    ))
});

static SWAP_WANTED: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)byte"));

/// Phrases saying the kitchen is missing or off limits.
static NO_KITCHEN: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)kök saknas|inget kök| (ej|ingen).{1,15}tillgång.{1,15}kök|ej kök|no( | access.{1,5})kitchen",
    )
});

static REGION_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)uthyres/(stockholm|goteborg)"));

static REGION_IN_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)^\s*(stockholm|göteborg)"));

/// Derive the facet set of a text.
pub fn classify_text(text: &str) -> ClassificationFacets {
    ClassificationFacets {
        girls_only: GIRLS_ONLY.is_match(text),
        commuters_only: COMMUTERS_ONLY.is_match(text),
        shared: SHARED.is_match(text),
        swap_wanted: SWAP_WANTED.is_match(text),
        lacks_kitchen: NO_KITCHEN.is_match(text),
    }
}

/// Derive the facet set of a record from its title and body.
pub fn classify(record: &ListingRecord) -> ClassificationFacets {
    let title = classify_text(&record.title);
    let body = classify_text(&record.body);
    ClassificationFacets {
        girls_only: title.girls_only || body.girls_only,
        commuters_only: title.commuters_only || body.commuters_only,
        shared: title.shared || body.shared,
        swap_wanted: title.swap_wanted || body.swap_wanted,
        lacks_kitchen: title.lacks_kitchen || body.lacks_kitchen,
    }
}

fn region_label(matched: &str) -> String {
    let lower = matched.to_lowercase();
    if lower.contains("goteborg") || lower.contains("göteborg") {
        "Göteborg".to_string()
    } else {
        "Stockholm".to_string()
    }
}

/// Applies every text heuristic to enriched records.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Region implied by the crawled index URL, if any
    region_hint: Option<String>,
}

impl Classifier {
    pub fn new(base_url: &str) -> Self {
        let region_hint = REGION_IN_URL
            .captures(base_url)
            .and_then(|caps| caps.get(1))
            .map(|m| region_label(m.as_str()));
        Self { region_hint }
    }

    /// Region label from the index URL, else from the location text.
    pub fn region(&self, record: &ListingRecord) -> Option<String> {
        self.region_hint.clone().or_else(|| {
            REGION_IN_LOCATION
                .captures(&record.location)
                .and_then(|caps| caps.get(1))
                .map(|m| region_label(m.as_str()))
        })
    }

    /// Attach facets, span and region to one record.
    pub fn analyse(&self, mut record: ListingRecord, today: NaiveDate) -> ListingRecord {
        record.facets = classify(&record);
        record.span = extract_span(&record, today);
        record.region = self.region(&record);
        record
    }

    /// Batch form of [`Classifier::analyse`].
    pub fn analyse_all(&self, records: Vec<ListingRecord>, today: NaiveDate) -> Vec<ListingRecord> {
        records
            .into_iter()
            .map(|record| self.analyse(record, today))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Facet, ListingSummary};
    use chrono::{TimeZone, Utc};

    fn record(title: &str, body: &str, location: &str) -> ListingRecord {
        let mut record = ListingRecord::without_details(ListingSummary {
            title: title.to_string(),
            rent: "5 000 kr".to_string(),
            rooms: String::new(),
            size: String::new(),
            location: location.to_string(),
            posted_at: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
            url: "https://www.blocket.se/a.htm".to_string(),
            thumbnail: None,
        });
        record.body = body.to_string();
        record
    }

    #[test]
    fn test_shared_room_scenario() {
        let facets = classify_text("Rum i lägenhet, 6 månader, tillsammans med 2 andra");
        assert!(facets.shared);
        assert!(!facets.lacks_kitchen);
        assert!(!facets.girls_only);
        assert!(!facets.swap_wanted);
    }

    #[test]
    fn test_kitchen_assumed_present_without_negative_phrase() {
        assert!(!classify_text("Ljus tvåa med balkong").lacks_kitchen);
        assert!(!classify_text("Tillgång till kök och badrum").lacks_kitchen);
        assert!(classify_text("Rummet har ej tillgång till kök").lacks_kitchen);
        assert!(classify_text("Kök saknas men mikro finns").lacks_kitchen);
        assert!(classify_text("Nice studio, no kitchen though").lacks_kitchen);
    }

    #[test]
    fn test_other_facets() {
        assert!(classify_text("Uthyres till tjej").girls_only);
        assert!(classify_text("Passar veckopendlare").commuters_only);
        assert!(classify_text("Byte mot större önskas").swap_wanted);
        assert!(classify_text("Furnished room for rent").shared);
    }

    #[test]
    fn test_classify_is_total_on_empty_input() {
        let facets = classify_text("");
        assert!(facets.active().is_empty());
    }

    #[test]
    fn test_classify_is_total_over_generated_texts() {
        let fragments = [
            "",
            "   \n\t ",
            "Rum i delad lägenhet",
            "Endast tjejer, ej tillgång till kök",
            "Veckopendlare sökes",
            "Byte mot trea önskas",
            "Furnished ROOM for rent",
            "Kök saknas",
            "ÅÄÖ åäö ü ß 日本語 🙂",
            "1/12 - 28/2, 6 månader, tills vidare",
        ];

        for title in fragments {
            for body in fragments {
                let facets = classify(&record(title, body, ""));
                let (t, b) = (classify_text(title), classify_text(body));
                for facet in Facet::ALL {
                    assert_eq!(facets.get(facet), t.get(facet) || b.get(facet), "{title:?} / {body:?}");
                }

                let upper = classify(&record(&title.to_uppercase(), &body.to_uppercase(), ""));
                assert_eq!(upper, facets, "{title:?} / {body:?}");
            }
        }
    }

    #[test]
    fn test_facet_from_title_or_body() {
        let r = record("Lägenhet för tjejer", "Fin utsikt", "Stockholm");
        let facets = classify(&r);
        assert!(facets.get(Facet::GirlsOnly));
        assert!(!facets.get(Facet::Shared));
    }

    #[test]
    fn test_region_from_url_then_location() {
        let from_url = Classifier::new("https://www.blocket.se/bostad/uthyres/goteborg?o={page}");
        let r = record("Etta", "", "Stockholm, Kungsholmen");
        assert_eq!(from_url.region(&r).as_deref(), Some("Göteborg"));

        let no_hint = Classifier::new("https://www.blocket.se/bostad/uthyres?o={page}");
        assert_eq!(no_hint.region(&r).as_deref(), Some("Stockholm"));
        let elsewhere = record("Etta", "", "Uppsala");
        assert_eq!(no_hint.region(&elsewhere), None);
        let gbg = record("Etta", "", "Göteborg, Majorna");
        assert_eq!(no_hint.region(&gbg).as_deref(), Some("Göteborg"));
    }

    #[test]
    fn test_analyse_fills_derived_fields() {
        let classifier = Classifier::new("https://www.blocket.se/bostad/uthyres/stockholm?o={page}");
        let r = record("Rum uthyres", "Uthyres i 6 månader", "Solna");
        let today = NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
        let analysed = classifier.analyse(r, today);
        assert!(analysed.facets.shared);
        assert_eq!(analysed.span.period, Some(6));
        assert_eq!(analysed.region.as_deref(), Some("Stockholm"));
    }
}
