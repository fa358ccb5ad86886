//! One-shot batch training: fit the transform, train both candidate model
//! families, evaluate on a held-out split and select the winner.
//!
//! The split is a seeded shuffle, so a training run is reproducible end to
//! end. An empty validation split aborts the run; so does a diverging
//! network fit. A failed run never produces an artifact.

use crate::artifact::ModelArtifact;
use crate::error::{PipelineError, Result};
use crate::metrics::{Metrics, RegressionMetrics};
use crate::model::{
    ForestConfig, Mlp, MlpConfig, MlpParams, ModelParams, RandomForestRegressor, Regressor,
};
use crate::record::ListingRecord;
use crate::transform::{self, FeaturePipeline};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

/// Configuration for a training run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Fraction of rows held out for validation.
    pub validation_fraction: f64,
    /// Seed for the train/validation shuffle.
    pub seed: u64,
    pub forest: ForestConfig,
    /// Network hyperparameters. `input_dim` is ignored here: the trainer
    /// sets it from the fitted transform's feature width.
    pub network: MlpConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.2,
            seed: 42,
            forest: ForestConfig::default(),
            network: MlpConfig::new(0),
        }
    }
}

/// Validation metrics for one candidate family.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub name: String,
    pub validation: RegressionMetrics,
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub n_train: usize,
    pub n_validation: usize,
    pub candidates: Vec<CandidateReport>,
    pub selected: String,
}

/// Train both candidates on a cleaned dataset and return the deployable
/// artifact plus the evaluation report.
pub fn train(
    records: &[ListingRecord],
    config: &TrainConfig,
) -> Result<(ModelArtifact, TrainingReport)> {
    if records.is_empty() {
        return Err(PipelineError::DataQuality(
            "cannot train on an empty dataset".to_string(),
        ));
    }

    let params = FeaturePipeline::new().fit(records)?;
    let x = transform::feature_matrix(records, &params)?;
    let y: Vec<f64> = records.iter().map(|r| r.price).collect();

    let (train_idx, val_idx) = split_indices(records.len(), config.validation_fraction, config.seed);
    if train_idx.is_empty() {
        return Err(PipelineError::DataQuality(
            "training split is empty".to_string(),
        ));
    }
    if val_idx.is_empty() {
        return Err(PipelineError::DataQuality(
            "validation split is empty".to_string(),
        ));
    }

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
    let x_val: Vec<Vec<f64>> = val_idx.iter().map(|&i| x[i].clone()).collect();
    let y_val: Vec<f64> = val_idx.iter().map(|&i| y[i]).collect();

    info!(
        n_train = x_train.len(),
        n_validation = x_val.len(),
        n_features = params.n_features,
        "fitting candidates"
    );

    let forest = RandomForestRegressor::fit(&config.forest, &x_train, &y_train)?;
    let forest_metrics = Metrics::calculate_all(&y_val, &forest.predict_batch(&x_val));
    info!(
        mse = forest_metrics.mse,
        rmse = forest_metrics.rmse,
        r_squared = forest_metrics.r_squared,
        "random forest evaluated"
    );

    let mut network_config = config.network.clone();
    network_config.input_dim = params.n_features;
    let network = Mlp::fit(&network_config, &x_train, &y_train, &x_val, &y_val)?;
    let network_metrics = Metrics::calculate_all(&y_val, &network.predict_batch(&x_val));
    info!(
        mse = network_metrics.mse,
        rmse = network_metrics.rmse,
        r_squared = network_metrics.r_squared,
        "neural network evaluated"
    );

    // Lower validation MSE wins; ties go to the forest.
    let (model, validation) = if forest_metrics.mse <= network_metrics.mse {
        (ModelParams::Forest(forest), forest_metrics)
    } else {
        (
            ModelParams::Network(MlpParams::from(&network)),
            network_metrics,
        )
    };
    info!(selected = model.name(), "candidate selected");

    let report = TrainingReport {
        n_train: x_train.len(),
        n_validation: x_val.len(),
        candidates: vec![
            CandidateReport {
                name: "random_forest".to_string(),
                validation: forest_metrics,
            },
            CandidateReport {
                name: "neural_network".to_string(),
                validation: network_metrics,
            },
        ],
        selected: model.name().to_string(),
    };

    let artifact = ModelArtifact {
        transform: params,
        model,
        validation,
    };

    Ok((artifact, report))
}

/// Seeded shuffle split into (train, validation) index sets.
pub fn split_indices(n: usize, validation_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let n_val = ((n as f64) * validation_fraction).round() as usize;
    let n_val = n_val.min(n);
    let (val, train) = indices.split_at(n_val);
    (train.to_vec(), val.to_vec())
}
