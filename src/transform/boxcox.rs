//! Box-Cox power transform for skewed positive-valued columns.
//!
//! The transform is `((x + offset)^lambda - 1) / lambda` (natural log at
//! `lambda == 0`). The offset makes all training values strictly positive;
//! lambda is fitted by maximising the Box-Cox log-likelihood over a bounded
//! search. Applying fitted parameters to any value inside the training range
//! yields a finite real.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Positivity floor: values at or below zero after offsetting clamp here so
/// the transform stays finite even slightly outside the training range.
const POSITIVITY_EPS: f64 = 1e-6;

/// Lambda search bounds.
const LAMBDA_RANGE: (f64, f64) = (-2.0, 2.0);

/// Fitted parameters for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxCoxParams {
    /// Fitted exponent.
    pub lambda: f64,
    /// Shift applied before the power transform so inputs are positive.
    pub offset: f64,
}

/// Sample skewness `m3 / m2^1.5` of a column; 0 for fewer than three values
/// or a constant column.
pub fn sample_skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    if m2 == 0.0 {
        return 0.0;
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n as f64;
    m3 / m2.powf(1.5)
}

/// Fit Box-Cox parameters to a column of training values.
///
/// # Errors
/// Returns `Transform` if the column is empty or contains non-finite values.
pub fn fit(values: &[f64]) -> Result<BoxCoxParams> {
    if values.is_empty() {
        return Err(PipelineError::Transform(
            "cannot fit Box-Cox on an empty column".to_string(),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::Transform(
            "cannot fit Box-Cox on non-finite values".to_string(),
        ));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let offset = if min > 0.0 { 0.0 } else { POSITIVITY_EPS - min };

    let shifted: Vec<f64> = values.iter().map(|v| v + offset).collect();
    let log_sum: f64 = shifted.iter().map(|v| v.ln()).sum();

    // Coarse grid, then golden-section refinement of the best bracket.
    let mut best_lambda = LAMBDA_RANGE.0;
    let mut best_llf = f64::NEG_INFINITY;
    let steps = 80;
    for i in 0..=steps {
        let lambda =
            LAMBDA_RANGE.0 + (LAMBDA_RANGE.1 - LAMBDA_RANGE.0) * i as f64 / steps as f64;
        let llf = log_likelihood(&shifted, log_sum, lambda);
        if llf > best_llf {
            best_llf = llf;
            best_lambda = lambda;
        }
    }

    let step = (LAMBDA_RANGE.1 - LAMBDA_RANGE.0) / steps as f64;
    let lambda = golden_section(
        (best_lambda - step).max(LAMBDA_RANGE.0),
        (best_lambda + step).min(LAMBDA_RANGE.1),
        |l| log_likelihood(&shifted, log_sum, l),
    );

    Ok(BoxCoxParams { lambda, offset })
}

/// Apply fitted parameters to a single value.
pub fn apply(x: f64, params: &BoxCoxParams) -> f64 {
    let shifted = (x + params.offset).max(POSITIVITY_EPS);
    if params.lambda.abs() < 1e-12 {
        shifted.ln()
    } else {
        (shifted.powf(params.lambda) - 1.0) / params.lambda
    }
}

/// Profile log-likelihood of lambda for already-shifted positive values.
fn log_likelihood(shifted: &[f64], log_sum: f64, lambda: f64) -> f64 {
    let n = shifted.len() as f64;
    let transformed: Vec<f64> = shifted
        .iter()
        .map(|&v| {
            if lambda.abs() < 1e-12 {
                v.ln()
            } else {
                (v.powf(lambda) - 1.0) / lambda
            }
        })
        .collect();
    let mean = transformed.iter().sum::<f64>() / n;
    let var = transformed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var <= 0.0 || !var.is_finite() {
        return f64::NEG_INFINITY;
    }
    -(n / 2.0) * var.ln() + (lambda - 1.0) * log_sum
}

/// Golden-section maximisation of a unimodal function on `[a, b]`.
fn golden_section(mut a: f64, mut b: f64, f: impl Fn(f64) -> f64) -> f64 {
    const INV_PHI: f64 = 0.618_033_988_749_894_8;
    let mut c = b - (b - a) * INV_PHI;
    let mut d = a + (b - a) * INV_PHI;
    let mut fc = f(c);
    let mut fd = f(d);
    while (b - a).abs() > 1e-5 {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - (b - a) * INV_PHI;
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + (b - a) * INV_PHI;
            fd = f(d);
        }
    }
    (a + b) / 2.0
}
