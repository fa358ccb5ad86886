//! Cleaning of raw listings: dedup, imputation and outlier removal.
//!
//! Policy:
//! - rows missing the target price (or with a non-positive price) are dropped;
//! - exact duplicate rows are dropped;
//! - missing categorical fields are imputed with the [`UNKNOWN_CATEGORY`]
//!   sentinel, missing numeric fields with the column median;
//! - rows outside the interquartile-range fence on any numeric column are
//!   dropped.
//!
//! Empty input, or input that cleans down to nothing, is an explicit
//! `DataQuality` error rather than a silently empty dataset.

use crate::error::{PipelineError, Result};
use crate::record::{ListingRecord, RawListing};
use std::collections::HashSet;
use tracing::info;

/// Sentinel category assigned to missing categorical fields. It becomes an
/// ordinary category at fit time, so records imputed here encode cleanly.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Configuration for the cleaning pass.
#[derive(Debug, Clone)]
pub struct CleaningConfig {
    /// Multiplier on the IQR when building the outlier fence
    /// `[Q1 - factor * IQR, Q3 + factor * IQR]`.
    pub iqr_factor: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self { iqr_factor: 1.5 }
    }
}

/// Counts of what the cleaning pass did. `rows_in` always equals
/// `rows_out` plus the three dropped counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_missing_price: usize,
    pub dropped_duplicates: usize,
    pub dropped_outliers: usize,
    pub imputed_categorical: usize,
    pub imputed_numeric: usize,
}

/// Turns raw scrapes into a [`ListingRecord`] dataset.
pub struct Cleaner {
    config: CleaningConfig,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}

impl Cleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Clean a batch of raw listings.
    ///
    /// # Errors
    /// Returns `DataQuality` if the input is empty or every row is dropped.
    pub fn clean(&self, raw: &[RawListing]) -> Result<(Vec<ListingRecord>, CleaningSummary)> {
        if raw.is_empty() {
            return Err(PipelineError::DataQuality(
                "no rows to clean".to_string(),
            ));
        }

        let mut summary = CleaningSummary {
            rows_in: raw.len(),
            ..CleaningSummary::default()
        };

        // Target first: a row without a positive price can never train anything.
        let priced: Vec<&RawListing> = raw
            .iter()
            .filter(|r| match r.price {
                Some(p) if p > 0.0 => true,
                _ => {
                    summary.dropped_missing_price += 1;
                    false
                }
            })
            .collect();

        let mut seen = HashSet::new();
        let mut deduped: Vec<&RawListing> = Vec::with_capacity(priced.len());
        for row in priced {
            if seen.insert(row_key(row)) {
                deduped.push(row);
            } else {
                summary.dropped_duplicates += 1;
            }
        }

        if deduped.is_empty() {
            return Err(PipelineError::DataQuality(
                "no rows with a usable price".to_string(),
            ));
        }

        let bedrooms_median = column_median(deduped.iter().filter_map(|r| r.bedrooms.map(f64::from)));
        let bathrooms_median =
            column_median(deduped.iter().filter_map(|r| r.bathrooms.map(f64::from)));
        let receptions_median =
            column_median(deduped.iter().filter_map(|r| r.receptions.map(f64::from)));
        let floor_area_median = column_median(deduped.iter().filter_map(|r| r.floor_area));

        let mut records: Vec<ListingRecord> = Vec::with_capacity(deduped.len());
        for row in deduped {
            let location = match &row.location {
                Some(v) => v.clone(),
                None => {
                    summary.imputed_categorical += 1;
                    UNKNOWN_CATEGORY.to_string()
                }
            };
            let property_type = match &row.property_type {
                Some(v) => v.clone(),
                None => {
                    summary.imputed_categorical += 1;
                    UNKNOWN_CATEGORY.to_string()
                }
            };
            let bedrooms = impute_count(row.bedrooms, bedrooms_median, &mut summary);
            let bathrooms = impute_count(row.bathrooms, bathrooms_median, &mut summary);
            let receptions = impute_count(row.receptions, receptions_median, &mut summary);
            let floor_area = match row.floor_area {
                Some(v) => v,
                None => {
                    summary.imputed_numeric += 1;
                    floor_area_median
                }
            };

            records.push(ListingRecord {
                location,
                property_type,
                bedrooms,
                bathrooms,
                receptions,
                floor_area,
                // Checked positive above.
                price: row.price.unwrap_or_default(),
            });
        }

        let records = self.drop_outliers(records, &mut summary);

        if records.is_empty() {
            return Err(PipelineError::DataQuality(
                "all rows removed during cleaning".to_string(),
            ));
        }

        summary.rows_out = records.len();
        info!(
            rows_in = summary.rows_in,
            rows_out = summary.rows_out,
            dropped_missing_price = summary.dropped_missing_price,
            dropped_duplicates = summary.dropped_duplicates,
            dropped_outliers = summary.dropped_outliers,
            "cleaning complete"
        );

        Ok((records, summary))
    }

    /// Drop rows outside the IQR fence on any numeric column (price included).
    fn drop_outliers(
        &self,
        records: Vec<ListingRecord>,
        summary: &mut CleaningSummary,
    ) -> Vec<ListingRecord> {
        let columns: Vec<Vec<f64>> = (0..5)
            .map(|c| records.iter().map(|r| numeric_column(r, c)).collect())
            .collect();

        let fences: Vec<(f64, f64)> = columns
            .iter()
            .map(|col| iqr_fence(col, self.config.iqr_factor))
            .collect();

        records
            .into_iter()
            .filter(|r| {
                let inside = (0..5).all(|c| {
                    let v = numeric_column(r, c);
                    let (low, high) = fences[c];
                    v >= low && v <= high
                });
                if !inside {
                    summary.dropped_outliers += 1;
                }
                inside
            })
            .collect()
    }
}

/// Numeric columns in fence order: the four features, then price.
fn numeric_column(record: &ListingRecord, index: usize) -> f64 {
    match index {
        0 => f64::from(record.bedrooms),
        1 => f64::from(record.bathrooms),
        2 => f64::from(record.receptions),
        3 => record.floor_area,
        _ => record.price,
    }
}

fn impute_count(value: Option<u32>, median: f64, summary: &mut CleaningSummary) -> u32 {
    match value {
        Some(v) => v,
        None => {
            summary.imputed_numeric += 1;
            median.round().max(0.0) as u32
        }
    }
}

fn row_key(row: &RawListing) -> String {
    format!(
        "{:?}|{:?}|{:?}|{:?}|{:?}|{:?}|{:?}",
        row.location,
        row.property_type,
        row.bedrooms,
        row.bathrooms,
        row.receptions,
        row.floor_area,
        row.price
    )
}

/// Median of the present values of a column; 0 when the column is entirely
/// missing.
fn column_median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    quantile(&sorted, 50.0)
}

/// Outlier fence `[Q1 - factor * IQR, Q3 + factor * IQR]` for one column.
fn iqr_fence(column: &[f64], factor: f64) -> (f64, f64) {
    let mut sorted = column.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = quantile(&sorted, 25.0);
    let q3 = quantile(&sorted, 75.0);
    let iqr = q3 - q1;
    (q1 - factor * iqr, q3 + factor * iqr)
}

/// Linearly interpolated quantile of an already sorted slice, `q` in [0, 100].
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (q / 100.0 * (sorted.len() - 1) as f64).min((sorted.len() - 1) as f64);
    let lower = idx.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = idx - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(beds: u32, area: f64, price: f64) -> RawListing {
        RawListing {
            location: Some("SW1".to_string()),
            property_type: Some("flat".to_string()),
            bedrooms: Some(beds),
            bathrooms: Some(1),
            receptions: Some(1),
            floor_area: Some(area),
            price: Some(price),
        }
    }

    #[test]
    fn test_clean_empty_input_is_error() {
        let cleaner = Cleaner::default();
        assert!(matches!(
            cleaner.clean(&[]),
            Err(PipelineError::DataQuality(_))
        ));
    }

    #[test]
    fn test_clean_drops_rows_without_price() {
        let mut rows = vec![listing(2, 60.0, 300_000.0), listing(3, 80.0, 400_000.0)];
        rows.push(RawListing {
            price: None,
            ..listing(2, 60.0, 0.0)
        });
        rows.push(RawListing {
            price: Some(-5.0),
            ..listing(2, 61.0, 0.0)
        });

        let (records, summary) = Cleaner::default().clean(&rows).unwrap();
        assert_eq!(summary.dropped_missing_price, 2);
        assert!(records.iter().all(|r| r.price > 0.0));
    }

    #[test]
    fn test_clean_dedupes_exact_rows() {
        let rows = vec![
            listing(2, 60.0, 300_000.0),
            listing(2, 60.0, 300_000.0),
            listing(3, 80.0, 400_000.0),
        ];
        let (records, summary) = Cleaner::default().clean(&rows).unwrap();
        assert_eq!(summary.dropped_duplicates, 1);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_clean_imputes_sentinel_and_median() {
        let mut rows = vec![
            listing(2, 60.0, 300_000.0),
            listing(3, 80.0, 350_000.0),
            listing(4, 100.0, 400_000.0),
        ];
        rows.push(RawListing {
            location: None,
            bedrooms: None,
            ..listing(0, 75.0, 340_000.0)
        });

        let (records, summary) = Cleaner::default().clean(&rows).unwrap();
        assert_eq!(summary.imputed_categorical, 1);
        assert_eq!(summary.imputed_numeric, 1);

        let imputed = records
            .iter()
            .find(|r| r.location == UNKNOWN_CATEGORY)
            .unwrap();
        // Median of [2, 3, 4] is 3.
        assert_eq!(imputed.bedrooms, 3);
    }

    #[test]
    fn test_clean_drops_price_outlier() {
        let mut rows: Vec<RawListing> = (0..10)
            .map(|i| listing(2 + i % 3, 55.0 + i as f64, 300_000.0 + 5_000.0 * i as f64))
            .collect();
        rows.push(listing(2, 60.0, 90_000_000.0)); // bad scrape

        let (records, summary) = Cleaner::default().clean(&rows).unwrap();
        assert_eq!(summary.dropped_outliers, 1);
        assert!(records.iter().all(|r| r.price < 1_000_000.0));
    }

    #[test]
    fn test_clean_summary_counts_add_up() {
        let mut rows = vec![
            listing(2, 60.0, 300_000.0),
            listing(2, 60.0, 300_000.0), // duplicate
            listing(3, 80.0, 350_000.0),
            listing(4, 100.0, 400_000.0),
        ];
        rows.push(RawListing::default()); // no price

        let (records, summary) = Cleaner::default().clean(&rows).unwrap();
        assert_eq!(
            summary.rows_in,
            summary.rows_out
                + summary.dropped_missing_price
                + summary.dropped_duplicates
                + summary.dropped_outliers
        );
        assert_eq!(records.len(), summary.rows_out);
    }

    #[test]
    fn test_clean_all_dropped_is_error() {
        let rows = vec![RawListing::default(), RawListing::default()];
        assert!(matches!(
            Cleaner::default().clean(&rows),
            Err(PipelineError::DataQuality(_))
        ));
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((quantile(&sorted, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile(&sorted, 100.0) - 4.0).abs() < 1e-12);
    }
}
