//! Benchmarks for the VIF, GLM and outlier-capping stages
//!
//! Run with: cargo bench --bench pruning_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use regprune::pipeline::{cap_outliers, variance_inflation_factors, FeatureSet, GlmFit, GlmOptions};

const TARGET: &str = "target";

/// Generate features where every fourth column leans on an earlier one
fn generate_test_dataframe(n_rows: usize, n_features: usize, seed: u64) -> (DataFrame, FeatureSet) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut raw: Vec<Vec<f64>> = Vec::with_capacity(n_features);
    for i in 0..n_features {
        let values: Vec<f64> = if i % 4 == 3 {
            raw[i - 3]
                .iter()
                .map(|v| v + rng.gen::<f64>() * 10.0 - 5.0)
                .collect()
        } else {
            // Skewed so that capping has work to do
            (0..n_rows)
                .map(|_| {
                    let v = rng.gen::<f64>();
                    (v * v * v) * 100.0
                })
                .collect()
        };
        raw.push(values);
    }

    let target: Vec<f64> = (0..n_rows)
        .map(|r| raw.iter().take(3).map(|c| c[r]).sum::<f64>() * 0.01 + rng.gen::<f64>())
        .collect();

    let names: Vec<String> = (0..n_features).map(|i| format!("feature_{}", i)).collect();
    let mut columns: Vec<Column> = names
        .iter()
        .zip(raw)
        .map(|(name, values)| Column::new(name.as_str().into(), values))
        .collect();
    columns.push(Column::new(TARGET.into(), target));

    let df = DataFrame::new(columns).expect("Failed to create DataFrame");
    let features = FeatureSet::new(names, TARGET).expect("target is not a feature");
    (df, features)
}

/// VIF computation for varying feature counts
fn benchmark_vif_by_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("vif_by_columns");
    group.sample_size(20);

    let n_rows = 2_000;
    for n_cols in [5, 10, 25, 50, 100] {
        let (df, features) = generate_test_dataframe(n_rows, n_cols, 42);
        group.throughput(Throughput::Elements(n_cols as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n_cols), &(&df, &features), |b, (df, features)| {
            b.iter(|| {
                let _ = variance_inflation_factors(black_box(*df), black_box(*features), TARGET);
            });
        });
    }

    group.finish();
}

/// Gaussian GLM fit for varying row counts
fn benchmark_glm_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("glm_by_rows");
    group.sample_size(20);

    let n_cols = 20;
    let options = GlmOptions::default();
    for n_rows in [1_000, 10_000, 50_000] {
        let (df, features) = generate_test_dataframe(n_rows, n_cols, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &(&df, &features), |b, (df, features)| {
            b.iter(|| {
                let _ = GlmFit::fit(black_box(*df), black_box(*features), TARGET, black_box(&options));
            });
        });
    }

    group.finish();
}

/// IQR capping across all feature columns
fn benchmark_outlier_capping(c: &mut Criterion) {
    let mut group = c.benchmark_group("outlier_capping");
    group.sample_size(30);

    for n_rows in [10_000, 100_000] {
        let (df, features) = generate_test_dataframe(n_rows, 50, 7);
        let columns = features.names().to_vec();
        group.throughput(Throughput::Elements((n_rows * columns.len()) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &(&df, &columns), |b, (df, columns)| {
            b.iter(|| {
                let _ = cap_outliers(black_box(*df), black_box(*columns));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_vif_by_columns,
    benchmark_glm_by_rows,
    benchmark_outlier_capping
);
criterion_main!(benches);
