//! Seeded train/test partitioning

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::ModelError;

/// Train/test partition of an observation table
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: DataFrame,
    pub test: DataFrame,
    /// Source row positions, ascending
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
}

/// Row positions for a split of `n` rows.
///
/// Shuffles `0..n` with a `StdRng` seeded from `seed` and assigns the first
/// `round(n * ratio)` positions to training. Both lists come back sorted so
/// each partition keeps the original row order.
pub fn split_indices(n: usize, ratio: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(ModelError::InvalidSplit(format!(
            "train ratio must be in (0, 1), got {}",
            ratio
        )));
    }

    let n_train = (n as f64 * ratio).round() as usize;
    if n_train == 0 || n_train >= n {
        return Err(ModelError::InvalidSplit(format!(
            "{} rows with ratio {} leaves an empty partition",
            n, ratio
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let mut train = indices[..n_train].to_vec();
    let mut test = indices[n_train..].to_vec();
    train.sort_unstable();
    test.sort_unstable();

    Ok((train, test))
}

/// Split `df` into train and test partitions.
pub fn train_test_split(df: &DataFrame, ratio: f64, seed: u64) -> Result<TrainTestSplit> {
    let (train_rows, test_rows) = split_indices(df.height(), ratio, seed)?;

    let train = take_rows(df, &train_rows).context("Failed to build training partition")?;
    let test = take_rows(df, &test_rows).context("Failed to build test partition")?;

    Ok(TrainTestSplit {
        train,
        test,
        train_rows,
        test_rows,
    })
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    df.take(&idx)
}
