//! Regression models and their serializable parameter forms.

pub mod forest;
pub mod nn;
pub mod tree;

pub use forest::{ForestConfig, RandomForestRegressor};
pub use nn::{Mlp, MlpConfig, MlpParams};
pub use tree::{DecisionTree, TreeConfig};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A fitted model ready for inference. Implementations contain only
/// prediction parameters, never training state.
pub trait Regressor {
    /// Predict a single encoded feature row.
    fn predict(&self, features: &[f64]) -> f64;

    /// Predict a batch of rows.
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    /// Stable identifier used in artifacts, reports and responses.
    fn name(&self) -> &'static str;
}

/// Serializable parameters of whichever candidate won training. Stored in
/// the model artifact next to the transform parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelParams {
    Forest(RandomForestRegressor),
    Network(MlpParams),
}

impl ModelParams {
    pub fn name(&self) -> &'static str {
        match self {
            ModelParams::Forest(_) => "random_forest",
            ModelParams::Network(_) => "neural_network",
        }
    }

    /// Reconstruct a usable model from the stored parameters.
    pub fn to_regressor(&self) -> Result<Box<dyn Regressor + Send + Sync>> {
        match self {
            ModelParams::Forest(forest) => Ok(Box::new(forest.clone())),
            ModelParams::Network(params) => Ok(Box::new(Mlp::try_from(params.clone())?)),
        }
    }
}
