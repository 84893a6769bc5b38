//! Subscriber interest profiles.

use serde::{Deserialize, Serialize};

use crate::models::Facet;

/// Which facets a subscriber accepts.
///
/// A facet that is not allowed disqualifies every listing carrying it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetAllowances {
    #[serde(default)]
    pub girls_only: bool,
    #[serde(default)]
    pub commuters_only: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub swap_wanted: bool,
    #[serde(default)]
    pub lacks_kitchen: bool,
}

impl FacetAllowances {
    pub fn allows(&self, facet: Facet) -> bool {
        match facet {
            Facet::GirlsOnly => self.girls_only,
            Facet::CommutersOnly => self.commuters_only,
            Facet::Shared => self.shared,
            Facet::SwapWanted => self.swap_wanted,
            Facet::LacksKitchen => self.lacks_kitchen,
        }
    }
}

/// Channel toggles of a subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyToggles {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub sms: bool,
}

/// A subscriber's stored interest profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub min_price: Option<u32>,

    #[serde(default)]
    pub max_price: Option<u32>,

    #[serde(default)]
    pub allowed: FacetAllowances,

    /// Shortest acceptable lease in months
    #[serde(default)]
    pub min_period: Option<u32>,

    #[serde(default)]
    pub notify: NotifyToggles,
}

impl SubscriberProfile {
    /// Profile with no constraints and no channels.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            phone: None,
            min_price: None,
            max_price: None,
            allowed: FacetAllowances::default(),
            min_period: None,
            notify: NotifyToggles::default(),
        }
    }

    /// Email address, if the subscriber wants email and has one.
    pub fn email_target(&self) -> Option<&str> {
        non_blank(self.email.as_deref()).filter(|_| self.notify.email)
    }

    /// Phone number, if the subscriber wants SMS and has one.
    pub fn sms_target(&self) -> Option<&str> {
        non_blank(self.phone.as_deref()).filter(|_| self.notify.sms)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
