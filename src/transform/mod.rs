//! Feature engineering: turning a [`ListingRecord`] into a numeric vector.
//!
//! [`FeaturePipeline::fit`] learns every transform parameter once from the
//! cleaned dataset; [`apply`] is a pure function of a record and those
//! parameters. The same parameters used at training and serving time produce
//! bit-identical vectors — that is the consistency invariant the whole
//! pipeline rests on, and `apply` never mutates the parameters it is given.
//!
//! Feature-vector layout: the four numeric columns (Box-Cox transformed
//! where fitted, then standard-scaled), followed by the location one-hot
//! block, followed by the property-type one-hot block. Each one-hot block
//! ends with the encoder's reserved fallback slot.

pub mod boxcox;
pub mod encoding;
pub mod scaling;

pub use boxcox::BoxCoxParams;
pub use encoding::{CategoryCode, CategoryEncoder};
pub use scaling::ScalerParams;

use crate::error::{PipelineError, Result};
use crate::record::{ListingRecord, NUMERIC_FEATURES};
use serde::{Deserialize, Serialize};

/// Default sample-skewness magnitude above which a numeric column gets a
/// Box-Cox transform.
pub const DEFAULT_SKEWNESS_THRESHOLD: f64 = 0.75;

/// Unfitted feature pipeline: just hyperparameters.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    skewness_threshold: f64,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self {
            skewness_threshold: DEFAULT_SKEWNESS_THRESHOLD,
        }
    }

    /// Override the skewness gate for Box-Cox fitting.
    pub fn with_skewness_threshold(mut self, threshold: f64) -> Self {
        self.skewness_threshold = threshold;
        self
    }

    /// Fit all transform parameters on the cleaned dataset.
    ///
    /// # Errors
    /// Returns `DataQuality` on an empty dataset and `Transform` if a
    /// column cannot be Box-Cox fitted.
    pub fn fit(&self, records: &[ListingRecord]) -> Result<TransformParameters> {
        if records.is_empty() {
            return Err(PipelineError::DataQuality(
                "cannot fit feature pipeline on empty dataset".to_string(),
            ));
        }

        let mut boxcox_params: Vec<Option<BoxCoxParams>> =
            Vec::with_capacity(NUMERIC_FEATURES.len());
        for col in 0..NUMERIC_FEATURES.len() {
            let values: Vec<f64> = records.iter().map(|r| r.numeric_features()[col]).collect();
            if boxcox::sample_skewness(&values).abs() > self.skewness_threshold {
                boxcox_params.push(Some(boxcox::fit(&values)?));
            } else {
                boxcox_params.push(None);
            }
        }

        let numeric_rows: Vec<Vec<f64>> = records
            .iter()
            .map(|r| transform_numeric(r, &boxcox_params))
            .collect();
        let scaler = scaling::fit(&numeric_rows)?;

        let location = CategoryEncoder::fit(records.iter().map(|r| r.location.as_str()));
        let property_type =
            CategoryEncoder::fit(records.iter().map(|r| r.property_type.as_str()));

        let n_features = NUMERIC_FEATURES.len() + location.n_codes() + property_type.n_codes();

        Ok(TransformParameters {
            boxcox: boxcox_params,
            scaler,
            location,
            property_type,
            n_features,
        })
    }
}

/// Everything fitted by [`FeaturePipeline::fit`], reused unmodified at
/// prediction time. Serialized into the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformParameters {
    /// Per numeric column, in [`NUMERIC_FEATURES`] order; `None` for columns
    /// that were not skewed enough to transform.
    pub boxcox: Vec<Option<BoxCoxParams>>,
    /// Scaler over the (Box-Cox transformed) numeric block.
    pub scaler: ScalerParams,
    pub location: CategoryEncoder,
    pub property_type: CategoryEncoder,
    /// Total emitted feature-vector width.
    pub n_features: usize,
}

/// A fully encoded record, plus which categorical fields had to fall back
/// to the unseen-category slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f64>,
    pub fallback_fields: Vec<&'static str>,
}

impl FeatureVector {
    /// Whether any categorical field resolved to the fallback slot.
    pub fn used_fallback(&self) -> bool {
        !self.fallback_fields.is_empty()
    }
}

/// Encode one record with fitted parameters.
///
/// Pure and deterministic: the same record and parameters always produce a
/// bit-identical vector, and `params` is never mutated.
pub fn apply(record: &ListingRecord, params: &TransformParameters) -> Result<FeatureVector> {
    if params.boxcox.len() != NUMERIC_FEATURES.len() {
        return Err(PipelineError::Transform(format!(
            "parameters carry {} numeric columns, expected {}",
            params.boxcox.len(),
            NUMERIC_FEATURES.len()
        )));
    }

    let mut values = transform_numeric(record, &params.boxcox);
    scaling::apply_in_place(&mut values, &params.scaler)?;

    let mut fallback_fields = Vec::new();
    if params.location.one_hot_into(&record.location, &mut values) {
        fallback_fields.push("location");
    }
    if params
        .property_type
        .one_hot_into(&record.property_type, &mut values)
    {
        fallback_fields.push("property_type");
    }

    debug_assert_eq!(values.len(), params.n_features);
    Ok(FeatureVector {
        values,
        fallback_fields,
    })
}

/// Encode a whole dataset into row-major feature rows (training helper).
pub fn feature_matrix(
    records: &[ListingRecord],
    params: &TransformParameters,
) -> Result<Vec<Vec<f64>>> {
    records
        .iter()
        .map(|r| apply(r, params).map(|fv| fv.values))
        .collect()
}

fn transform_numeric(record: &ListingRecord, boxcox_params: &[Option<BoxCoxParams>]) -> Vec<f64> {
    record
        .numeric_features()
        .iter()
        .zip(boxcox_params.iter())
        .map(|(&v, p)| match p {
            Some(p) => boxcox::apply(v, p),
            None => v,
        })
        .collect()
}
