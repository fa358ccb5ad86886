//! Listing collection: paginated fetching and CSV persistence.
//!
//! The collector walks each property type's index pages until a page yields
//! no listings, extracting records with [`parse`]. A page that keeps failing
//! after bounded retries is skipped with a warning; a partial batch is still
//! a valid batch.

pub mod parse;

pub use parse::parse_listing_page;

use crate::error::{PipelineError, Result};
use crate::record::{PropertyType, RawListing};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for a collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Site root, e.g. `https://listings.example.com`.
    pub base_url: String,
    /// Hard cap on pages walked per property type.
    pub max_pages_per_type: usize,
    /// Fetch attempts per page before skipping it.
    pub retries: usize,
    pub timeout: Duration,
}

impl CollectorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_pages_per_type: 50,
            retries: 3,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Fetches raw listings from the listing site.
pub struct Collector {
    config: CollectorConfig,
    client: reqwest::blocking::Client,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("homeworth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Walk every property type and collect all listings.
    pub fn run(&self) -> Result<Vec<RawListing>> {
        let mut all = Vec::new();
        for property_type in PropertyType::ALL {
            let before = all.len();
            for page in 1..=self.config.max_pages_per_type {
                let html = match self.fetch_page(property_type, page) {
                    Ok(html) => html,
                    Err(err) => {
                        warn!(%err, slug = property_type.slug(), page, "skipping page");
                        continue;
                    }
                };
                let listings = parse_listing_page(&html);
                if listings.is_empty() {
                    break;
                }
                all.extend(listings);
            }
            info!(
                slug = property_type.slug(),
                listings = all.len() - before,
                "property type collected"
            );
        }
        Ok(all)
    }

    fn fetch_page(&self, property_type: PropertyType, page: usize) -> Result<String> {
        let url = format!(
            "{}/for-sale/property?property_type={}&pn={}",
            self.config.base_url,
            property_type.slug(),
            page
        );

        let mut last_err = None;
        for attempt in 1..=self.config.retries.max(1) {
            match self
                .client
                .get(&url)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.text())
            {
                Ok(body) => return Ok(body),
                Err(err) => {
                    warn!(%err, %url, attempt, "page fetch failed");
                    last_err = Some(err);
                }
            }
        }
        Err(PipelineError::Fetch(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }
}

/// Append-free CSV write of one collection batch.
pub fn write_csv<P: AsRef<Path>>(path: P, listings: &[RawListing]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a previously collected batch.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawListing>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut listings = Vec::new();
    for row in reader.deserialize() {
        listings.push(row?);
    }
    Ok(listings)
}
