//! Listing records: the tabular schema shared by the collector, cleaner and
//! feature pipeline.
//!
//! A [`RawListing`] is what the collector extracts from a page: any field may
//! be missing. A [`ListingRecord`] is a fully populated row as produced by
//! the cleaner; it is immutable once written.

use serde::{Deserialize, Serialize};

/// The fixed property-type taxonomy used when crawling listing indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terraced,
    Flat,
    Bungalow,
    ParkHome,
    FarmLand,
}

impl PropertyType {
    /// Every type, in crawl order.
    pub const ALL: [PropertyType; 7] = [
        PropertyType::Detached,
        PropertyType::SemiDetached,
        PropertyType::Terraced,
        PropertyType::Flat,
        PropertyType::Bungalow,
        PropertyType::ParkHome,
        PropertyType::FarmLand,
    ];

    /// URL slug used in listing-index query strings.
    pub fn slug(&self) -> &'static str {
        match self {
            PropertyType::Detached => "detached",
            PropertyType::SemiDetached => "semi_detached",
            PropertyType::Terraced => "terraced",
            PropertyType::Flat => "flats",
            PropertyType::Bungalow => "bungalow",
            PropertyType::ParkHome => "park_home",
            PropertyType::FarmLand => "farms_land",
        }
    }
}

/// One scraped property listing. Fields that could not be extracted are
/// `None`; the cleaner decides whether to impute or drop them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawListing {
    /// Coarse location (postcode outcode in the source data).
    pub location: Option<String>,
    /// Property-type label as displayed on the page.
    pub property_type: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub receptions: Option<u32>,
    /// Floor area in square metres.
    pub floor_area: Option<f64>,
    /// Asking price in pounds. The prediction target.
    pub price: Option<f64>,
}

/// A complete listing row. Produced by the cleaner; every field is present
/// and `price > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub location: String,
    pub property_type: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub receptions: u32,
    pub floor_area: f64,
    pub price: f64,
}

/// Names of the numeric feature columns, in feature-vector order.
/// `price` is the target and is deliberately not part of this list.
pub const NUMERIC_FEATURES: [&str; 4] = ["bedrooms", "bathrooms", "receptions", "floor_area"];

impl ListingRecord {
    /// Numeric feature values in [`NUMERIC_FEATURES`] order.
    pub fn numeric_features(&self) -> [f64; 4] {
        [
            f64::from(self.bedrooms),
            f64::from(self.bathrooms),
            f64::from(self.receptions),
            self.floor_area,
        ]
    }
}
