//! Metrics for evaluating regression models.

use serde::{Deserialize, Serialize};

/// Regression metric calculations.
pub struct Metrics;

impl Metrics {
    /// Mean Squared Error: `mean((y_true - y_pred)^2)`. Lower is better.
    pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
        assert_eq!(
            y_true.len(),
            y_pred.len(),
            "Arrays must have the same length"
        );

        if y_true.is_empty() {
            return 0.0;
        }

        let sum_sq: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();

        sum_sq / y_true.len() as f64
    }

    /// Root Mean Squared Error: `sqrt(MSE)`. Same units as the target.
    pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
        Self::mse(y_true, y_pred).sqrt()
    }

    /// R² (coefficient of determination): `1 - SS_res / SS_tot`.
    ///
    /// 1.0 is a perfect fit; values can be negative if the model is worse
    /// than predicting the mean. If the target is constant, returns 1.0 for
    /// a perfect prediction and 0.0 otherwise.
    pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
        assert_eq!(
            y_true.len(),
            y_pred.len(),
            "Arrays must have the same length"
        );

        if y_true.is_empty() {
            return 0.0;
        }

        let mean_true: f64 = y_true.iter().copied().sum::<f64>() / y_true.len() as f64;

        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();

        let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

        if ss_tot == 0.0 {
            return if ss_res == 0.0 { 1.0 } else { 0.0 };
        }

        1.0 - (ss_res / ss_tot)
    }

    /// Calculate all metrics at once.
    pub fn calculate_all(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
        let mse = Self::mse(y_true, y_pred);
        RegressionMetrics {
            mse,
            rmse: mse.sqrt(),
            r_squared: Self::r_squared(y_true, y_pred),
        }
    }
}

/// All regression metrics for one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub r_squared: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_perfect() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![1.0, 2.0, 3.0, 4.0];
        assert!((Metrics::mse(&y_true, &y_pred) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_mse_unit_error() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![2.0, 3.0, 4.0, 5.0];
        assert!((Metrics::mse(&y_true, &y_pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rmse_is_sqrt_of_mse() {
        let y_true = vec![0.0, 0.0];
        let y_pred = vec![3.0, 3.0];
        assert!((Metrics::rmse(&y_true, &y_pred) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_perfect() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![1.0, 2.0, 3.0, 4.0];
        assert!((Metrics::r_squared(&y_true, &y_pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_constant_target() {
        let y_true = vec![2.0, 2.0, 2.0];
        let y_pred = vec![2.0, 2.0, 2.0];
        assert!((Metrics::r_squared(&y_true, &y_pred) - 1.0).abs() < 1e-12);

        let y_bad = vec![1.0, 2.0, 3.0];
        assert!((Metrics::r_squared(&y_true, &y_bad) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_worse_than_mean_is_negative() {
        let y_true = vec![1.0, 2.0, 3.0];
        let y_pred = vec![10.0, -10.0, 10.0];
        assert!(Metrics::r_squared(&y_true, &y_pred) < 0.0);
    }

    #[test]
    fn test_calculate_all() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![1.0, 2.0, 3.0, 4.0];
        let metrics = Metrics::calculate_all(&y_true, &y_pred);
        assert!((metrics.mse - 0.0).abs() < 1e-12);
        assert!((metrics.rmse - 0.0).abs() < 1e-12);
        assert!((metrics.r_squared - 1.0).abs() < 1e-12);
    }
}
