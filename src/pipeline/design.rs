//! Feature sets and design-matrix extraction
//!
//! Every model in the pipeline is fitted on complete rows only: a row with a
//! null (or NaN) in any feature or in the target is left out, the same way a
//! formula-based fit would omit it.

use anyhow::{Context, Result};
use faer::Mat;
use polars::prelude::*;
use serde::Serialize;

use super::error::ModelError;

/// Ordered set of predictor names. Never contains the target column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    names: Vec<String>,
}

impl FeatureSet {
    /// Build a feature set, rejecting the target column.
    pub fn new(names: Vec<String>, target: &str) -> Result<Self, ModelError> {
        if names.iter().any(|n| n == target) {
            return Err(ModelError::TargetInFeatures(target.to_string()));
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.names.iter().any(|n| n == feature)
    }

    /// A new set with `feature` removed; ordering of the rest is preserved.
    pub fn without(&self, feature: &str) -> Self {
        Self {
            names: self
                .names
                .iter()
                .filter(|n| n.as_str() != feature)
                .cloned()
                .collect(),
        }
    }
}

/// Complete-row design for a model: features (no intercept column) and response.
#[derive(Debug, Clone)]
pub struct ModelFrame {
    pub x: Mat<f64>,
    pub y: Vec<f64>,
    /// Row positions in the source DataFrame that made it into the frame
    pub rows: Vec<usize>,
}

impl ModelFrame {
    pub fn n_rows(&self) -> usize {
        self.y.len()
    }
}

/// Read a column as `Option<f64>` per row; NaN is treated as missing.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found in dataset", name))?;
    let float_col = column
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be cast to Float64", name))?;
    let ca = float_col
        .f64()
        .with_context(|| format!("Failed to access column '{}' as Float64", name))?;

    Ok(ca
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Extract the complete-row feature matrix for `features`.
///
/// Returns the matrix and the source row index of each matrix row.
pub fn feature_matrix(df: &DataFrame, features: &FeatureSet) -> Result<(Mat<f64>, Vec<usize>)> {
    let columns: Vec<Vec<Option<f64>>> = features
        .names()
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<_>>()?;

    let rows: Vec<usize> = (0..df.height())
        .filter(|&i| columns.iter().all(|col| col[i].is_some()))
        .collect();

    let x = Mat::from_fn(rows.len(), columns.len(), |i, j| {
        columns[j][rows[i]].unwrap_or(f64::NAN)
    });

    Ok((x, rows))
}

/// Extract features and target over rows where all of them are present.
pub fn model_frame(df: &DataFrame, features: &FeatureSet, target: &str) -> Result<ModelFrame> {
    let target_values = column_values(df, target)?;
    let (x_all, rows_all) = feature_matrix(df, features)?;

    let keep: Vec<usize> = (0..rows_all.len())
        .filter(|&i| target_values[rows_all[i]].is_some())
        .collect();

    let x = Mat::from_fn(keep.len(), x_all.ncols(), |i, j| x_all[(keep[i], j)]);
    let rows: Vec<usize> = keep.iter().map(|&i| rows_all[i]).collect();
    let y: Vec<f64> = rows
        .iter()
        .map(|&r| target_values[r].unwrap_or(f64::NAN))
        .collect();

    Ok(ModelFrame { x, y, rows })
}

/// A fitted linear-predictor model that can score new rows.
pub trait FittedModel {
    /// Predictor names in coefficient order.
    fn features(&self) -> &[String];

    /// Predictions on the response scale for a feature matrix (no intercept column).
    fn predict_matrix(&self, x: &Mat<f64>) -> Vec<f64>;

    /// Predict every complete row of `df`; returns (row index, prediction) pairs.
    fn predict(&self, df: &DataFrame, target: &str) -> Result<Vec<(usize, f64)>> {
        let features = FeatureSet::new(self.features().to_vec(), target)?;
        let (x, rows) = feature_matrix(df, &features)?;
        Ok(rows.into_iter().zip(self.predict_matrix(&x)).collect())
    }
}

/// Linear predictor `intercept + x · beta` for each row.
pub(crate) fn linear_predictor(x: &Mat<f64>, intercept: f64, beta: &[f64]) -> Vec<f64> {
    (0..x.nrows())
        .map(|i| {
            beta.iter()
                .enumerate()
                .fold(intercept, |acc, (j, b)| acc + b * x[(i, j)])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_rejects_target() {
        let err = FeatureSet::new(vec!["a".into(), "y".into()], "y").unwrap_err();
        assert_eq!(err, ModelError::TargetInFeatures("y".into()));
    }

    #[test]
    fn test_without_preserves_order() {
        let fs = FeatureSet::new(vec!["a".into(), "b".into(), "c".into()], "y").unwrap();
        let reduced = fs.without("b");
        assert_eq!(reduced.names(), &["a".to_string(), "c".to_string()]);
        assert_eq!(fs.len(), 3, "original set must be untouched");
    }

    #[test]
    fn test_model_frame_skips_incomplete_rows() {
        let df = df! {
            "a" => [Some(1.0f64), None, Some(3.0), Some(4.0)],
            "b" => [Some(2.0f64), Some(1.0), Some(f64::NAN), Some(5.0)],
            "y" => [Some(1.0f64), Some(2.0), Some(3.0), None],
        }
        .unwrap();
        let fs = FeatureSet::new(vec!["a".into(), "b".into()], "y").unwrap();

        let frame = model_frame(&df, &fs, "y").unwrap();

        assert_eq!(frame.rows, vec![0]);
        assert_eq!(frame.y, vec![1.0]);
        assert_eq!(frame.x[(0, 1)], 2.0);
    }
}
