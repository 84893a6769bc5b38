//! Classification facets derived from listing text.

use serde::{Deserialize, Serialize};

/// One independent boolean attribute of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    GirlsOnly,
    CommutersOnly,
    Shared,
    SwapWanted,
    LacksKitchen,
}

impl Facet {
    /// Every facet, in a stable order.
    pub const ALL: [Facet; 5] = [
        Facet::GirlsOnly,
        Facet::CommutersOnly,
        Facet::Shared,
        Facet::SwapWanted,
        Facet::LacksKitchen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::GirlsOnly => "girls_only",
            Facet::CommutersOnly => "commuters_only",
            Facet::Shared => "shared",
            Facet::SwapWanted => "swap_wanted",
            Facet::LacksKitchen => "lacks_kitchen",
        }
    }
}

/// The five facets of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationFacets {
    /// Only girls/women may apply
    #[serde(default)]
    pub girls_only: bool,

    /// Weekday commuters only
    #[serde(default)]
    pub commuters_only: bool,

    /// Room in a shared home, sublet part, lodger
    #[serde(default)]
    pub shared: bool,

    /// Owner wants a home swap
    #[serde(default)]
    pub swap_wanted: bool,

    /// Tenant has no access to a kitchen
    #[serde(default)]
    pub lacks_kitchen: bool,
}

impl ClassificationFacets {
    /// Value of a single facet.
    pub fn get(&self, facet: Facet) -> bool {
        match facet {
            Facet::GirlsOnly => self.girls_only,
            Facet::CommutersOnly => self.commuters_only,
            Facet::Shared => self.shared,
            Facet::SwapWanted => self.swap_wanted,
            Facet::LacksKitchen => self.lacks_kitchen,
        }
    }

    /// Facets that are set.
    pub fn active(&self) -> Vec<Facet> {
        Facet::ALL.into_iter().filter(|f| self.get(*f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_facets() {
        let facets = ClassificationFacets {
            shared: true,
            lacks_kitchen: true,
            ..Default::default()
        };
        assert_eq!(facets.active(), vec![Facet::Shared, Facet::LacksKitchen]);
        assert!(ClassificationFacets::default().active().is_empty());
    }
}
