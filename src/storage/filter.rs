// src/storage/filter.rs

//! Store query vocabulary.
//!
//! Filters are evaluated against the JSON form of a stored record. Field
//! names are the flat serialized names (`url`, `active`, `date_created`),
//! with dots reaching into nested objects (`span.end`).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

/// A predicate over stored records.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Field equals value
    Eq(String, Value),
    /// Field equals one of the values
    In(String, Vec<Value>),
    /// Field within inclusive bounds; numbers compare numerically,
    /// RFC 3339 timestamps chronologically, other strings lexically
    Range {
        field: String,
        min: Option<Value>,
        max: Option<Value>,
    },
    /// String field matches a pattern
    Matches(String, Regex),
    Not(Box<Filter>),
    /// All must hold; empty matches everything
    And(Vec<Filter>),
    /// Any must hold; empty matches nothing
    Or(Vec<Filter>),
}

impl Filter {
    /// Matches every record.
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn at_least(field: &str, min: impl Into<Value>) -> Self {
        Filter::Range {
            field: field.to_string(),
            min: Some(min.into()),
            max: None,
        }
    }

    pub fn at_most(field: &str, max: impl Into<Value>) -> Self {
        Filter::Range {
            field: field.to_string(),
            min: None,
            max: Some(max.into()),
        }
    }

    /// Timestamp field at or after `since`.
    pub fn since(field: &str, since: DateTime<Utc>) -> Self {
        Filter::at_least(field, since.to_rfc3339())
    }

    pub fn matches_regex(field: &str, pattern: Regex) -> Self {
        Filter::Matches(field.to_string(), pattern)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Active and not disabled.
    pub fn live() -> Self {
        Filter::and(vec![Filter::eq("active", true), Filter::eq("disabled", false)])
    }

    /// Evaluate against a serialized record.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq(field, value) => lookup(doc, field).is_some_and(|v| v == value),
            Filter::In(field, values) => {
                lookup(doc, field).is_some_and(|v| values.iter().any(|candidate| candidate == v))
            }
            Filter::Range { field, min, max } => {
                let Some(v) = lookup(doc, field) else {
                    return false;
                };
                let above = min
                    .as_ref()
                    .is_none_or(|min| compare(v, min).is_some_and(Ordering::is_ge));
                let below = max
                    .as_ref()
                    .is_none_or(|max| compare(v, max).is_some_and(Ordering::is_le));
                above && below
            }
            Filter::Matches(field, pattern) => lookup(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|s| pattern.is_match(s)),
            Filter::Not(inner) => !inner.matches(doc),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

fn lookup<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(doc, |value, key| value.get(key))
        .filter(|v| !v.is_null())
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        }
        _ => None,
    }
}
