// src/services/timespan.rs

//! Lease period inference from free text.
//!
//! Two independent heuristics run over title and body:
//!
//! - **period by unit**: numbers followed by a year, month, week or day word,
//!   converted to months, largest wins.
//! - **explicit dates**: day plus month name, month name plus year, ISO and
//!   `d-m-yyyy` dates, and slash dates such as `1/12` or `1/12/2026`.
//!
//! Their results are combined by [`reconcile_span`]. Neither heuristic is
//! exact; a miss resolves to an absent value, never an error.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate};
use regex::{Captures, Regex};

use crate::models::{ListingRecord, TemporalSpan};
use crate::utils::static_regex;

static YEARS: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)([0-9,.]{1,4})\s{0,3}år"));
static MONTHS: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)([0-9,.]{1,4})\s{0,3}månad(shyra)?"));
static WEEKS: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)([0-9,.]{1,4})\s{0,3}veck"));
static DAYS: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)([0-9,.]{1,4})\s{0,3}dag"));

static LONG_TERM: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)tills?\s?vidare"));

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)\b([0-9]{1,2})(?::e|:a)?[\s.\-]{0,3}([a-zåäö]{3,})\.?(?:[\s,\-]{1,3}((?:19|20)[0-9]{2})\b)?",
    )
});
static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)\b([a-zåäö]{3,})\.?[\s\-]{1,2}((?:19|20)[0-9]{2})\b"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})\b"));
static DMY_DATE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b([0-9]{1,2})-([0-9]{1,2})-([0-9]{4})\b"));
static SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"\b([0-9]{1,4})\s?/\s?([0-9]{1,4})(?:\s?/\s?([0-9]{1,4}))?\b")
});

const MONTH_NAMES: [(&str, u32); 20] = [
    ("januari", 1),
    ("january", 1),
    ("februari", 2),
    ("february", 2),
    ("mars", 3),
    ("march", 3),
    ("april", 4),
    ("maj", 5),
    ("may", 5),
    ("juni", 6),
    ("june", 6),
    ("juli", 7),
    ("july", 7),
    ("augusti", 8),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Years further from the reference than this are misreads.
const YEAR_WINDOW: i32 = 10;
const MAX_AGE_YEARS: u32 = 15;

/// Infer the lease span of a record.
///
/// `today` anchors synthesized end dates and the age filter; the posting
/// date anchors year inference and the default start.
pub fn extract_span(record: &ListingRecord, today: NaiveDate) -> TemporalSpan {
    let text = record.text();
    let posted = record.posted_at.date_naive();

    let period = extract_period(&text);
    let dates = find_dates(&text, posted, today);
    let is_long_term = LONG_TERM.is_match(&text);

    reconcile_span(&dates, period, is_long_term, posted, today)
}

/// Longest lease length mentioned with a unit, in whole months.
pub fn extract_period(text: &str) -> Option<u32> {
    let mut candidates: Vec<f64> = Vec::new();

    candidates.extend(
        unit_values(&YEARS, text)
            .filter(|years| *years < 10.0)
            .map(|years| years * 12.0),
    );
    candidates.extend(
        MONTHS
            .captures_iter(text)
            .filter(|caps| caps.get(2).is_none())
            .filter_map(|caps| parse_quantity(caps.get(1)?.as_str())),
    );
    candidates.extend(unit_values(&WEEKS, text).map(|weeks| weeks / 4.0));
    candidates.extend(unit_values(&DAYS, text).map(|days| days / 30.0));

    let months = candidates.into_iter().fold(0.0_f64, f64::max).round();
    (months >= 1.0).then_some(months as u32)
}

fn unit_values<'t>(pattern: &'static Regex, text: &'t str) -> impl Iterator<Item = f64> + 't {
    pattern
        .captures_iter(text)
        .filter_map(|caps| parse_quantity(caps.get(1)?.as_str()))
}

/// Swedish decimals use a comma.
fn parse_quantity(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Explicit dates after the posting date, deduplicated and ascending.
pub fn find_dates(text: &str, posted: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut day_month_ranges: Vec<Range<usize>> = Vec::new();

    for caps in DAY_MONTH.captures_iter(text) {
        let Some(month) = caps.get(2).and_then(|m| month_from_word(m.as_str())) else {
            continue;
        };
        if let Some(whole) = caps.get(0) {
            day_month_ranges.push(whole.range());
        }
        let day = capture_u32(&caps, 1);
        let year = capture_u32(&caps, 3).map(|y| y as i32);
        dates.extend(day.and_then(|d| build_date(year, month, d, posted)));
    }

    for caps in MONTH_YEAR.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let overlaps = day_month_ranges
            .iter()
            .any(|r| r.start < whole.end() && whole.start() < r.end);
        if overlaps {
            continue;
        }
        let Some(month) = caps.get(1).and_then(|m| month_from_word(m.as_str())) else {
            continue;
        };
        let year = capture_u32(&caps, 2).map(|y| y as i32);
        dates.extend(build_date(year, month, 1, posted));
    }

    for caps in ISO_DATE.captures_iter(text) {
        if let (Some(y), Some(m), Some(d)) = (
            capture_u32(&caps, 1),
            capture_u32(&caps, 2),
            capture_u32(&caps, 3),
        ) {
            dates.extend(build_date(Some(y as i32), m, d, posted));
        }
    }

    for caps in DMY_DATE.captures_iter(text) {
        if let (Some(d), Some(m), Some(y)) = (
            capture_u32(&caps, 1),
            capture_u32(&caps, 2),
            capture_u32(&caps, 3),
        ) {
            dates.extend(build_date(Some(y as i32), m, d, posted));
        }
    }

    for caps in SLASH_DATE.captures_iter(text) {
        dates.extend(slash_date(&caps, posted));
    }

    let oldest = today.checked_sub_months(Months::new(MAX_AGE_YEARS * 12));
    dates.retain(|date| oldest.is_none_or(|oldest| *date > oldest) && *date > posted);
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// `d/m`, `d/m/y` or `y/m/d`. Parts must look like days, months or years.
fn slash_date(caps: &Captures, posted: NaiveDate) -> Option<NaiveDate> {
    let raw = |i: usize| caps.get(i).map(|m| m.as_str());
    let a = capture_u32(caps, 1)?;
    let b = capture_u32(caps, 2)?;
    let c = capture_u32(caps, 3);

    // "24/7" is an expression, not a date.
    if a == 24 && b == 7 && c.is_none() {
        return None;
    }
    let plausible = |v: u32| v <= 31 || (2000..2100).contains(&v);
    if !plausible(a) || !plausible(b) || c.is_some_and(|c| !plausible(c)) {
        return None;
    }

    if raw(1).is_some_and(|s| s.len() == 4) {
        return build_date(Some(a as i32), b, c.unwrap_or(1), posted);
    }
    let year = match (c, raw(3)) {
        (Some(c), Some(s)) if s.len() == 2 => Some(2000 + c as i32),
        (Some(c), _) => Some(c as i32),
        (None, _) => None,
    };
    build_date(year, b, a, posted)
}

/// A validated date; a missing year is the next occurrence after `reference`'s month.
fn build_date(year: Option<i32>, month: u32, day: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let year = year.unwrap_or_else(|| {
        if month < reference.month() {
            reference.year() + 1
        } else {
            reference.year()
        }
    });
    if (year - reference.year()).abs() > YEAR_WINDOW {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn capture_u32(caps: &Captures, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

/// Month number for a word that starts a Swedish or English month name.
fn month_from_word(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    if word.chars().count() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .find(|(name, _)| name.starts_with(word.as_str()))
        .map(|(_, month)| *month)
}

/// Whole calendar months from `from` to `to`.
fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
        - i32::from(to.day() < from.day());
    months.max(0) as u32
}

/// Combine explicit dates and the unit period into a span.
///
/// With two or more dates the longer of their distance and `period` wins,
/// and with a unit period the window is re-anchored at the first date.
/// With fewer dates a unit period yields an end at `today + period`.
pub fn reconcile_span(
    dates: &[NaiveDate],
    period: Option<u32>,
    is_long_term: bool,
    posted: NaiveDate,
    today: NaiveDate,
) -> TemporalSpan {
    let mut span = TemporalSpan::open(dates.first().copied().unwrap_or(posted));
    span.is_long_term = is_long_term;

    match (dates, period) {
        ([first, .., last], None) => {
            span.period = Some(months_between(*first, *last));
            span.end = Some(*last);
        }
        ([first, .., last], Some(period)) => {
            let period = period.max(months_between(*first, *last));
            span.period = Some(period);
            span.end = first.checked_add_months(Months::new(period));
        }
        (_, Some(period)) => {
            span.period = Some(period);
            span.end = today
                .checked_add_months(Months::new(period))
                .filter(|end| *end >= span.start)
                .or_else(|| span.start.checked_add_months(Months::new(period)));
        }
        (_, None) => {}
    }
    span
}
