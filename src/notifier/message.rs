// src/notifier/message.rs

//! Message composition for email digests and SMS.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{ListingRecord, SubscriberProfile};

/// Longest SMS body in graphemes.
pub const SMS_MAX_GRAPHEMES: usize = 160;

const ITEM_SEPARATOR: &str = "\n\n--------\n\n";

/// Subject line of an email digest.
pub fn email_subject(count: usize, summary: bool) -> String {
    let noun = if count == 1 {
        "ny bostad"
    } else {
        "nya bostäder"
    };
    if summary {
        format!("Dagens bostäder: {count} {noun} av intresse")
    } else {
        format!("{count} {noun} av intresse")
    }
}

/// Plain-text email digest for one subscriber.
pub fn email_body(profile: &SubscriberProfile, records: &[&ListingRecord]) -> String {
    let greeting_name = profile
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| format!(" {n}"))
        .unwrap_or_default();
    let intro = if records.len() == 1 {
        format!("Hej{greeting_name}, vi tror att följande bostad kan vara intressant")
    } else {
        format!(
            "Hej{greeting_name}, vi tror att följande {} bostäder kan vara intressanta",
            records.len()
        )
    };

    let items = records
        .iter()
        .map(|record| email_item(record))
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR);

    format!("{intro}\n\n{items}")
}

fn email_item(record: &ListingRecord) -> String {
    let facts = [
        &record.location,
        &record.rent,
        &record.rooms,
        &record.size,
        &record.address,
    ]
    .into_iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

    [
        record.title.to_uppercase(),
        record.share_url().to_string(),
        facts,
        record.body.clone(),
    ]
    .into_iter()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// SMS listing each record's title and link.
///
/// The first record's link is always kept whole; its title is shortened to
/// fit, and further records are appended only while they fit entirely.
pub fn sms_body(records: &[&ListingRecord]) -> String {
    let Some((first, rest)) = records.split_first() else {
        return String::new();
    };

    let link = first.share_url();
    let title_budget = SMS_MAX_GRAPHEMES.saturating_sub(grapheme_len(link) + 1);
    let title = truncate_graphemes(first.title.trim(), title_budget);
    let mut body = if title.is_empty() {
        link.to_string()
    } else {
        format!("{title} {link}")
    };

    for record in rest {
        let line = format!("{} {}", record.title.trim(), record.share_url());
        if grapheme_len(&body) + 1 + grapheme_len(&line) > SMS_MAX_GRAPHEMES {
            break;
        }
        body.push('\n');
        body.push_str(&line);
    }
    body
}

fn grapheme_len(s: &str) -> usize {
    s.graphemes(true).count()
}

fn truncate_graphemes(s: &str, max: usize) -> String {
    s.graphemes(true).take(max).collect::<String>().trim_end().to_string()
}
