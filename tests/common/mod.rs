//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regprune::pipeline::FeatureSet;
use std::path::PathBuf;
use tempfile::TempDir;

pub const TARGET: &str = "ViolentCrimesPerPop";

/// Create a seeded regression DataFrame with known structure
///
/// This DataFrame includes:
/// - `signal_a`, `signal_b`: drive the target (y = 0.2 + 0.5a - 0.3b + noise)
/// - `collinear_a`: signal_a plus small noise (VIF far above 1.5)
/// - `noise`: unrelated to the target
/// - `constant`: zero variance
pub fn create_regression_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let a: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
    let b: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
    let collinear: Vec<f64> = a.iter().map(|v| v + rng.gen::<f64>() * 0.05).collect();
    let noise: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
    let y: Vec<f64> = a
        .iter()
        .zip(&b)
        .map(|(a, b)| 0.2 + 0.5 * a - 0.3 * b + (rng.gen::<f64>() - 0.5) * 0.02)
        .collect();

    df! {
        "constant" => vec![0.5f64; rows],
        "signal_a" => a,
        "collinear_a" => collinear,
        "signal_b" => b,
        "noise" => noise,
        TARGET => y,
    }
    .unwrap()
}

/// Feature set of `create_regression_dataframe`, in column order
pub fn regression_features() -> FeatureSet {
    FeatureSet::new(
        ["constant", "signal_a", "collinear_a", "signal_b", "noise"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        TARGET,
    )
    .unwrap()
}

/// Create a DataFrame with obvious outliers in known columns
pub fn create_outlier_dataframe() -> DataFrame {
    df! {
        "skewed" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
        "low_tail" => [-50.0f64, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0],
        "flat" => [3.0f64; 10],
        "with_nulls" => [Some(1.0f64), None, Some(2.0), Some(3.0), None, Some(4.0), Some(5.0), Some(6.0), Some(7.0), Some(60.0)],
        TARGET => [0.1f64, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Read a Float64 column into a Vec, nulls as None
pub fn column_f64(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .iter()
        .collect()
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}
