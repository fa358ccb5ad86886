//! Dense feed-forward network for price regression.
//!
//! A stack of fully connected layers with ReLU hidden activations and
//! inverted dropout, trained by mini-batch gradient descent on MSE loss with
//! early stopping on validation loss. The target is standardised inside
//! `fit` and the statistics stored with the weights, so callers always see
//! prices in original units.
//!
//! A fitted [`Mlp`] contains only inference parameters; training state
//! (optimizer, dropout masks, epoch budget) never leaves [`Mlp::fit`].

use crate::error::{PipelineError, Result};
use crate::model::Regressor;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for building and training an [`Mlp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub input_dim: usize,
    /// Hidden layer widths; the scalar output layer is implicit.
    pub hidden_dims: Vec<usize>,
    /// Inverted-dropout rate applied to hidden activations during training.
    pub dropout_rate: f64,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// Early-stop after this many epochs without validation improvement.
    pub patience: usize,
    pub seed: u64,
}

impl MlpConfig {
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            hidden_dims: vec![64, 32],
            dropout_rate: 0.2,
            learning_rate: 1e-2,
            batch_size: 32,
            max_epochs: 200,
            patience: 16,
            seed: 42,
        }
    }

    pub fn with_hidden_dims(mut self, dims: Vec<usize>) -> Self {
        self.hidden_dims = dims;
        self
    }

    pub fn with_dropout(mut self, rate: f64) -> Self {
        self.dropout_rate = rate;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the configuration before any training starts.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(PipelineError::Transform(
                "network input dimension must be positive".to_string(),
            ));
        }
        if self.hidden_dims.iter().any(|&d| d == 0) {
            return Err(PipelineError::Transform(
                "hidden layer widths must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(PipelineError::Transform(
                "dropout rate must be in [0, 1)".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 || self.batch_size == 0 || self.max_epochs == 0 {
            return Err(PipelineError::Transform(
                "learning rate, batch size and epoch budget must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.hidden_dims.len() + 2);
        dims.push(self.input_dim);
        dims.extend_from_slice(&self.hidden_dims);
        dims.push(1);
        dims
    }
}

/// A fitted network: weights, biases and the target standardisation.
#[derive(Debug, Clone)]
pub struct Mlp {
    /// Per layer, shape `(out, in)`.
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    y_mean: f64,
    y_std: f64,
}

impl Mlp {
    /// Train a network with early stopping on the validation split.
    ///
    /// # Errors
    /// - `DataQuality` on empty splits or row/target length mismatches.
    /// - `FeatureMismatch` if a row differs from `config.input_dim`.
    /// - `TrainingDivergence` if the loss becomes non-finite; no model is
    ///   returned in that case.
    pub fn fit(
        config: &MlpConfig,
        x_train: &[Vec<f64>],
        y_train: &[f64],
        x_val: &[Vec<f64>],
        y_val: &[f64],
    ) -> Result<Self> {
        config.validate()?;
        if x_train.is_empty() || x_train.len() != y_train.len() {
            return Err(PipelineError::DataQuality(
                "training split is empty or mismatched".to_string(),
            ));
        }
        if x_val.is_empty() || x_val.len() != y_val.len() {
            return Err(PipelineError::DataQuality(
                "validation split is empty or mismatched".to_string(),
            ));
        }
        for row in x_train.iter().chain(x_val.iter()) {
            if row.len() != config.input_dim {
                return Err(PipelineError::FeatureMismatch {
                    expected: config.input_dim,
                    got: row.len(),
                });
            }
        }

        let n = x_train.len() as f64;
        let y_mean = y_train.iter().sum::<f64>() / n;
        let mut y_std =
            (y_train.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n).sqrt();
        if y_std == 0.0 {
            y_std = 1.0;
        }

        let x_train: Vec<Array1<f64>> =
            x_train.iter().map(|r| Array1::from(r.clone())).collect();
        let x_val: Vec<Array1<f64>> = x_val.iter().map(|r| Array1::from(r.clone())).collect();
        let y_train_std: Vec<f64> = y_train.iter().map(|y| (y - y_mean) / y_std).collect();
        let y_val_std: Vec<f64> = y_val.iter().map(|y| (y - y_mean) / y_std).collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut net = Self::init(config, y_mean, y_std, &mut rng);

        let mut best_loss = f64::INFINITY;
        let mut best_state: Option<(Vec<Array2<f64>>, Vec<Array1<f64>>)> = None;
        let mut stale = 0usize;
        let mut order: Vec<usize> = (0..x_train.len()).collect();

        for epoch in 0..config.max_epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(config.batch_size) {
                epoch_loss += net.train_batch(config, batch, &x_train, &y_train_std, &mut rng);
            }
            epoch_loss /= x_train.len() as f64;

            if !epoch_loss.is_finite() {
                return Err(PipelineError::TrainingDivergence(format!(
                    "training loss became non-finite at epoch {epoch}"
                )));
            }

            let val_loss = net.validation_loss(&x_val, &y_val_std);
            if !val_loss.is_finite() {
                return Err(PipelineError::TrainingDivergence(format!(
                    "validation loss became non-finite at epoch {epoch}"
                )));
            }

            if val_loss + 1e-12 < best_loss {
                best_loss = val_loss;
                best_state = Some((net.weights.clone(), net.biases.clone()));
                stale = 0;
            } else {
                stale += 1;
                if stale >= config.patience {
                    break;
                }
            }
        }

        if let Some((weights, biases)) = best_state {
            net.weights = weights;
            net.biases = biases;
        }
        Ok(net)
    }

    fn init(config: &MlpConfig, y_mean: f64, y_std: f64, rng: &mut StdRng) -> Self {
        let dims = config.layer_dims();
        let mut weights = Vec::with_capacity(dims.len() - 1);
        let mut biases = Vec::with_capacity(dims.len() - 1);
        for pair in dims.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
            let w = Array2::from_shape_fn((fan_out, fan_in), |_| {
                (rng.gen::<f64>() * 2.0 - 1.0) * limit
            });
            weights.push(w);
            biases.push(Array1::zeros(fan_out));
        }
        Self {
            weights,
            biases,
            y_mean,
            y_std,
        }
    }

    /// One mini-batch of forward/backward/update. Returns the summed
    /// (standardised) squared error over the batch.
    fn train_batch(
        &mut self,
        config: &MlpConfig,
        batch: &[usize],
        x: &[Array1<f64>],
        y_std: &[f64],
        rng: &mut StdRng,
    ) -> f64 {
        let n_layers = self.weights.len();
        let mut grad_w: Vec<Array2<f64>> = self
            .weights
            .iter()
            .map(|w| Array2::zeros(w.raw_dim()))
            .collect();
        let mut grad_b: Vec<Array1<f64>> = self
            .biases
            .iter()
            .map(|b| Array1::zeros(b.raw_dim()))
            .collect();

        let keep = 1.0 - config.dropout_rate;
        let mut batch_loss = 0.0;

        for &i in batch {
            // Forward with cached pre-activations and dropout masks.
            let mut activations: Vec<Array1<f64>> = vec![x[i].clone()];
            let mut pre_activations: Vec<Array1<f64>> = Vec::with_capacity(n_layers);
            let mut masks: Vec<Array1<f64>> = Vec::with_capacity(n_layers - 1);

            let mut a = x[i].clone();
            for (l, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
                let z = w.dot(&a) + b;
                if l < n_layers - 1 {
                    let mut h = z.mapv(|v| v.max(0.0));
                    let mask = if config.dropout_rate > 0.0 {
                        Array1::from_shape_fn(h.len(), |_| {
                            if rng.gen::<f64>() < keep {
                                1.0 / keep
                            } else {
                                0.0
                            }
                        })
                    } else {
                        Array1::ones(h.len())
                    };
                    h *= &mask;
                    pre_activations.push(z);
                    masks.push(mask);
                    activations.push(h.clone());
                    a = h;
                } else {
                    pre_activations.push(z.clone());
                    a = z;
                }
            }

            let pred = a[0];
            let err = pred - y_std[i];
            batch_loss += err * err;

            // Backward.
            let mut delta = Array1::from(vec![2.0 * err]);
            for l in (0..n_layers).rev() {
                let a_prev = &activations[l];
                grad_w[l] += &outer(&delta, a_prev);
                grad_b[l] += &delta;

                if l > 0 {
                    let mut d = self.weights[l].t().dot(&delta);
                    d *= &masks[l - 1];
                    d.zip_mut_with(&pre_activations[l - 1], |dv, &z| {
                        if z <= 0.0 {
                            *dv = 0.0;
                        }
                    });
                    delta = d;
                }
            }
        }

        let scale = -config.learning_rate / batch.len() as f64;
        for l in 0..n_layers {
            self.weights[l].scaled_add(scale, &grad_w[l]);
            self.biases[l].scaled_add(scale, &grad_b[l]);
        }

        batch_loss
    }

    fn validation_loss(&self, x: &[Array1<f64>], y_std: &[f64]) -> f64 {
        let sum: f64 = x
            .iter()
            .zip(y_std.iter())
            .map(|(row, &y)| {
                let pred = self.forward(row);
                (pred - y) * (pred - y)
            })
            .sum();
        sum / x.len() as f64
    }

    /// Inference forward pass on the standardised scale (no dropout).
    fn forward(&self, x: &Array1<f64>) -> f64 {
        let n_layers = self.weights.len();
        let mut a = x.clone();
        for (l, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = w.dot(&a) + b;
            a = if l < n_layers - 1 {
                z.mapv(|v| v.max(0.0))
            } else {
                z
            };
        }
        a[0]
    }

    pub fn input_dim(&self) -> usize {
        self.weights[0].ncols()
    }
}

impl Regressor for Mlp {
    fn predict(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.input_dim());
        let x = Array1::from(features.to_vec());
        self.forward(&x) * self.y_std + self.y_mean
    }

    fn name(&self) -> &'static str {
        "neural_network"
    }
}

fn outer(d: &Array1<f64>, a: &Array1<f64>) -> Array2<f64> {
    let mut m = Array2::zeros((d.len(), a.len()));
    for i in 0..d.len() {
        for j in 0..a.len() {
            m[[i, j]] = d[i] * a[j];
        }
    }
    m
}

/// Plain-data representation of a fitted network for serialization
/// (the ndarray matrices never hit the wire directly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpParams {
    /// Layer widths including input and output, e.g. `[13, 64, 32, 1]`.
    pub layer_dims: Vec<usize>,
    /// Row-major weight matrices, one per layer.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<Vec<f64>>,
    pub y_mean: f64,
    pub y_std: f64,
}

impl From<&Mlp> for MlpParams {
    fn from(net: &Mlp) -> Self {
        let mut layer_dims = vec![net.weights[0].ncols()];
        layer_dims.extend(net.weights.iter().map(|w| w.nrows()));
        Self {
            layer_dims,
            weights: net
                .weights
                .iter()
                .map(|w| w.iter().copied().collect())
                .collect(),
            biases: net.biases.iter().map(|b| b.to_vec()).collect(),
            y_mean: net.y_mean,
            y_std: net.y_std,
        }
    }
}

impl TryFrom<MlpParams> for Mlp {
    type Error = PipelineError;

    fn try_from(params: MlpParams) -> Result<Self> {
        if params.layer_dims.len() < 2
            || params.weights.len() != params.layer_dims.len() - 1
            || params.biases.len() != params.weights.len()
        {
            return Err(PipelineError::Serialization(
                "inconsistent network parameter shapes".to_string(),
            ));
        }

        let mut weights = Vec::with_capacity(params.weights.len());
        let mut biases = Vec::with_capacity(params.biases.len());
        for (l, (w, b)) in params.weights.into_iter().zip(params.biases).enumerate() {
            let (rows, cols) = (params.layer_dims[l + 1], params.layer_dims[l]);
            let w = Array2::from_shape_vec((rows, cols), w)
                .map_err(|e| PipelineError::Serialization(e.to_string()))?;
            if b.len() != rows {
                return Err(PipelineError::Serialization(format!(
                    "bias length {} does not match layer width {rows}",
                    b.len()
                )));
            }
            weights.push(w);
            biases.push(Array1::from(b));
        }

        Ok(Self {
            weights,
            biases,
            y_mean: params.y_mean,
            y_std: params.y_std,
        })
    }
}
