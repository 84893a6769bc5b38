// src/models/selectors.rs

//! CSS selectors and markers for scraping the classifieds site.

use serde::{Deserialize, Serialize};

/// CSS selectors for index and detail pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each listing on an index page
    #[serde(default = "defaults::row")]
    pub row_selector: String,

    /// Selector for the title within a row
    #[serde(default = "defaults::title")]
    pub title_selector: String,

    #[serde(default = "defaults::rooms")]
    pub rooms_selector: String,

    #[serde(default = "defaults::size")]
    pub size_selector: String,

    #[serde(default = "defaults::rent")]
    pub rent_selector: String,

    #[serde(default = "defaults::location")]
    pub location_selector: String,

    /// Element carrying the posting timestamp
    #[serde(default = "defaults::date")]
    pub date_selector: String,

    /// Attribute of the date element holding the timestamp
    #[serde(default = "defaults::date_attr")]
    pub date_attr: String,

    /// Anchor leading to the detail page
    #[serde(default = "defaults::link")]
    pub link_selector: String,

    /// Raw-document marker shown past the last index page
    #[serde(default = "defaults::terminal_marker")]
    pub terminal_marker: String,

    /// Detail page: listing body text
    #[serde(default = "defaults::body")]
    pub body_selector: String,

    /// Detail page: owner heading
    #[serde(default = "defaults::owner")]
    pub owner_selector: String,

    /// Detail page: street address
    #[serde(default = "defaults::address")]
    pub address_selector: String,

    /// Detail page: image meta tags
    #[serde(default = "defaults::image")]
    pub image_selector: String,

    /// Detail page marker for a removed ad
    #[serde(default = "defaults::withdrawn_marker")]
    pub withdrawn_marker: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row_selector: defaults::row(),
            title_selector: defaults::title(),
            rooms_selector: defaults::rooms(),
            size_selector: defaults::size(),
            rent_selector: defaults::rent(),
            location_selector: defaults::location(),
            date_selector: defaults::date(),
            date_attr: defaults::date_attr(),
            link_selector: defaults::link(),
            terminal_marker: defaults::terminal_marker(),
            body_selector: defaults::body(),
            owner_selector: defaults::owner(),
            address_selector: defaults::address(),
            image_selector: defaults::image(),
            withdrawn_marker: defaults::withdrawn_marker(),
        }
    }
}

mod defaults {
    pub fn row() -> String {
        r#"div[itemtype="http://schema.org/Offer"]"#.into()
    }
    pub fn title() -> String {
        ".media-heading".into()
    }
    pub fn rooms() -> String {
        ".rooms".into()
    }
    pub fn size() -> String {
        ".li_detail_params.size".into()
    }
    pub fn rent() -> String {
        ".monthly_rent".into()
    }
    pub fn location() -> String {
        ".address".into()
    }
    pub fn date() -> String {
        ".jlist_date_image".into()
    }
    pub fn date_attr() -> String {
        "datetime".into()
    }
    pub fn link() -> String {
        "a".into()
    }
    pub fn terminal_marker() -> String {
        "ads-not-found-container".into()
    }
    pub fn body() -> String {
        ".object-text".into()
    }
    pub fn owner() -> String {
        "h2.h4".into()
    }
    pub fn address() -> String {
        ".area_label".into()
    }
    pub fn image() -> String {
        r#"meta[property="og:image"]"#.into()
    }
    pub fn withdrawn_marker() -> String {
        "Hittade inte annonsen".into()
    }
}
