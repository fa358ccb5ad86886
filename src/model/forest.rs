//! Bootstrap-aggregated ensemble of regression trees.
//!
//! Each tree trains on a bootstrap resample drawn from an RNG seeded
//! deterministically from the run seed and the tree index, so a fit is fully
//! reproducible. Prediction averages the individual tree predictions.

use crate::error::{PipelineError, Result};
use crate::model::tree::{DecisionTree, TreeConfig};
use crate::model::Regressor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hyperparameters for the forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 12,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

/// A fitted forest. Serializable as-is: the trees are the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTree>,
}

impl RandomForestRegressor {
    /// Fit the ensemble on row-major features and targets.
    ///
    /// # Errors
    /// Returns `DataQuality` on empty input or mismatched lengths.
    pub fn fit(config: &ForestConfig, x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        if x.is_empty() {
            return Err(PipelineError::DataQuality(
                "cannot fit forest on empty data".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(PipelineError::DataQuality(format!(
                "feature rows ({}) and targets ({}) differ",
                x.len(),
                y.len()
            )));
        }
        if config.n_trees == 0 {
            return Err(PipelineError::DataQuality(
                "forest needs at least one tree".to_string(),
            ));
        }

        let n = x.len();
        let n_features = x[0].len();
        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            n_split_features: (n_features / 3).max(1),
        };

        let trees = (0..config.n_trees)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(&tree_config, x, y, &indices, &mut rng)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn predict(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}
