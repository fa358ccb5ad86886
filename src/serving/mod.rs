//! Prediction serving: an immutable artifact handle plus request validation.
//!
//! The artifact is loaded once and shared read-only behind an `Arc`; each
//! request applies the stored transform with [`crate::transform::apply`] —
//! the same pure function the trainer used — and runs model inference.
//! Requests that had to fall back to the unseen-category slot come back
//! flagged low-confidence instead of silently returning a bare number.

pub mod http;

use crate::artifact::ModelArtifact;
use crate::error::{PipelineError, Result};
use crate::model::Regressor;
use crate::record::ListingRecord;
use crate::transform;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One incoming property description. Every field is required; missing
/// fields are a validation error, not a silent default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionRequest {
    pub location: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub receptions: Option<u32>,
    pub floor_area: Option<f64>,
}

impl PredictionRequest {
    /// Validate presence of every required field and build a record for the
    /// transform. The price slot is unused at prediction time.
    fn into_record(self) -> Result<ListingRecord> {
        let mut missing = Vec::new();
        if self.location.as_deref().map_or(true, str::is_empty) {
            missing.push("location");
        }
        if self.property_type.as_deref().map_or(true, str::is_empty) {
            missing.push("property_type");
        }
        if self.bedrooms.is_none() {
            missing.push("bedrooms");
        }
        if self.bathrooms.is_none() {
            missing.push("bathrooms");
        }
        if self.receptions.is_none() {
            missing.push("receptions");
        }
        match self.floor_area {
            None => missing.push("floor_area"),
            Some(v) if !(v.is_finite() && v > 0.0) => {
                return Err(PipelineError::Validation(
                    "floor_area must be a positive number".to_string(),
                ))
            }
            Some(_) => {}
        }
        if !missing.is_empty() {
            return Err(PipelineError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(ListingRecord {
            location: self.location.unwrap_or_default(),
            property_type: self.property_type.unwrap_or_default().to_lowercase(),
            bedrooms: self.bedrooms.unwrap_or_default(),
            bathrooms: self.bathrooms.unwrap_or_default(),
            receptions: self.receptions.unwrap_or_default(),
            floor_area: self.floor_area.unwrap_or_default(),
            price: 0.0,
        })
    }
}

/// A price estimate plus its caveats.
#[derive(Debug, Clone, Serialize)]
pub struct PriceEstimate {
    pub price: f64,
    /// True when any categorical field resolved to the fallback slot.
    pub low_confidence: bool,
    /// The fields that fell back, for the caller's message.
    pub fallback_fields: Vec<String>,
    /// Which model family produced the estimate.
    pub model: String,
}

/// Stateless predictor over one immutable artifact.
pub struct PredictorService {
    artifact: Arc<ModelArtifact>,
    model: Box<dyn Regressor + Send + Sync>,
}

impl PredictorService {
    /// Build a service from an already loaded artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let model = artifact.model.to_regressor()?;
        Ok(Self {
            artifact: Arc::new(artifact),
            model,
        })
    }

    /// Load the artifact file and build the service. Version mismatches and
    /// corrupt files fail here, before any request is accepted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_artifact(ModelArtifact::load(path)?)
    }

    /// Estimate a price for one property.
    pub fn predict(&self, request: PredictionRequest) -> Result<PriceEstimate> {
        let record = request.into_record()?;
        let features = transform::apply(&record, &self.artifact.transform)?;
        let price = self.model.predict(&features.values);

        Ok(PriceEstimate {
            price,
            low_confidence: features.used_fallback(),
            fallback_fields: features
                .fallback_fields
                .iter()
                .map(|s| s.to_string())
                .collect(),
            model: self.model.name().to_string(),
        })
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}
