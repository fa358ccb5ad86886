//! Standard scaling (zero mean, unit variance) for the numeric feature block.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Fitted per-column mean and standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl ScalerParams {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

/// Fit a standard scaler on row-major data.
///
/// Uses the population standard deviation; constant columns get a standard
/// deviation of 1 so they pass through centred instead of dividing by zero.
///
/// # Errors
/// Returns `DataQuality` on empty input.
pub fn fit(rows: &[Vec<f64>]) -> Result<ScalerParams> {
    if rows.is_empty() {
        return Err(PipelineError::DataQuality(
            "cannot fit scaler on empty data".to_string(),
        ));
    }

    let n_cols = rows[0].len();
    let n = rows.len() as f64;

    let mut mean = vec![0.0; n_cols];
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row.iter()) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }

    let mut std = vec![0.0; n_cols];
    for row in rows {
        for ((s, v), m) in std.iter_mut().zip(row.iter()).zip(mean.iter()) {
            *s += (v - m).powi(2);
        }
    }
    for s in &mut std {
        *s = (*s / n).sqrt();
        if *s == 0.0 {
            *s = 1.0;
        }
    }

    Ok(ScalerParams { mean, std })
}

/// Scale a feature row in place.
///
/// # Errors
/// Returns `FeatureMismatch` if the row width differs from the fitted width.
pub fn apply_in_place(row: &mut [f64], params: &ScalerParams) -> Result<()> {
    if row.len() != params.n_features() {
        return Err(PipelineError::FeatureMismatch {
            expected: params.n_features(),
            got: row.len(),
        });
    }
    for ((v, m), s) in row.iter_mut().zip(params.mean.iter()).zip(params.std.iter()) {
        *v = (*v - m) / s;
    }
    Ok(())
}
