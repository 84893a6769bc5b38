//! Inferred lease period of a listing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Approximate lease window inferred from listing text.
///
/// An absent `end` together with `is_long_term == false` means the duration
/// is unknown, which interest matching treats as open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalSpan {
    /// Lease length in whole months
    #[serde(default)]
    pub period: Option<u32>,

    /// First day of the lease (posting date when nothing better is known)
    pub start: NaiveDate,

    /// Last day of the lease
    #[serde(default)]
    pub end: Option<NaiveDate>,

    /// "Tills vidare" (until further notice)
    #[serde(default)]
    pub is_long_term: bool,
}

impl TemporalSpan {
    /// A span with nothing known but its start.
    pub fn open(start: NaiveDate) -> Self {
        Self {
            period: None,
            start,
            end: None,
            is_long_term: false,
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }
}
