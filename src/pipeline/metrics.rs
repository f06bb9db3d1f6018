//! Fit-quality metrics: RMSE, R² and Adjusted R²

use anyhow::Result;
use polars::prelude::DataFrame;
use serde::Serialize;

use super::design::{column_values, FittedModel};
use super::error::ModelError;

/// Metrics for one partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitMetrics {
    /// Row count
    pub n: usize,
    /// Feature count (intercept excluded)
    pub k: usize,
    pub rmse: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
}

/// Observed values, predictions and metrics for one partition
#[derive(Debug, Clone)]
pub struct PartitionEvaluation {
    pub metrics: FitMetrics,
    pub observed: Vec<f64>,
    pub predicted: Vec<f64>,
}

/// Compute RMSE, R² and Adjusted R² for `k` features.
///
/// Undefined quantities are errors, never NaN or infinity: zero variance in
/// `observed` leaves R² undefined and `n - k - 1 <= 0` leaves Adjusted R²
/// undefined.
pub fn evaluate(observed: &[f64], predicted: &[f64], k: usize) -> Result<FitMetrics, ModelError> {
    if observed.len() != predicted.len() {
        return Err(ModelError::LengthMismatch {
            observed: observed.len(),
            predicted: predicted.len(),
        });
    }
    let n = observed.len();
    if n == 0 {
        return Err(ModelError::InsufficientRows { required: 1, found: 0 });
    }

    let mean = observed.iter().sum::<f64>() / n as f64;
    let tss: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    let rss: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();

    let scale: f64 = observed.iter().map(|o| o * o).sum();
    if tss <= f64::EPSILON * scale {
        return Err(ModelError::UndefinedRSquared);
    }

    let dof = n as i64 - k as i64 - 1;
    if dof <= 0 {
        return Err(ModelError::UndefinedAdjustedRSquared { n, k, dof });
    }

    let rmse = (rss / n as f64).sqrt();
    let r_squared = 1.0 - rss / tss;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / dof as f64;

    Ok(FitMetrics {
        n,
        k,
        rmse,
        r_squared,
        adj_r_squared,
    })
}

/// Predict the complete rows of `df` and evaluate against `target`.
pub fn evaluate_model<M: FittedModel>(model: &M, df: &DataFrame, target: &str) -> Result<PartitionEvaluation> {
    let targets = column_values(df, target)?;
    let (observed, predicted): (Vec<f64>, Vec<f64>) = model
        .predict(df, target)?
        .into_iter()
        .filter_map(|(row, pred)| targets[row].map(|obs| (obs, pred)))
        .unzip();

    let metrics = evaluate(&observed, &predicted, model.features().len())?;

    Ok(PartitionEvaluation {
        metrics,
        observed,
        predicted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let obs = [1.0, 2.0, 3.0, 4.0];
        let m = evaluate(&obs, &obs, 1).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r_squared, 1.0);
        assert_eq!(m.adj_r_squared, 1.0);
    }

    #[test]
    fn test_known_values() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let pred = [1.5, 2.0, 2.5, 4.0, 5.0];
        let m = evaluate(&obs, &pred, 1).unwrap();

        // rss = 0.5, tss = 10
        assert!((m.rmse - (0.5f64 / 5.0).sqrt()).abs() < 1e-12);
        assert!((m.r_squared - 0.95).abs() < 1e-12);
        assert!((m.adj_r_squared - (1.0 - 0.05 * 4.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_adjusted_r2_undefined() {
        let err = evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 2).unwrap_err();
        assert_eq!(err, ModelError::UndefinedAdjustedRSquared { n: 3, k: 2, dof: 0 });
    }

    #[test]
    fn test_zero_variance_observed() {
        let err = evaluate(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], 0).unwrap_err();
        assert_eq!(err, ModelError::UndefinedRSquared);
    }

    #[test]
    fn test_length_mismatch() {
        let err = evaluate(&[1.0, 2.0], &[1.0], 0).unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { .. }));
    }
}
