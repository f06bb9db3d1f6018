//! Tests for RMSE, R² and Adjusted R²

use regprune::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn total_sum_of_squares(observed: &[f64]) -> f64 {
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    observed.iter().map(|o| (o - mean).powi(2)).sum()
}

#[test]
fn test_r_squared_consistent_with_rmse() {
    let df = create_regression_dataframe(200, 99);
    let features = FeatureSet::new(vec!["signal_a".into(), "signal_b".into()], TARGET).unwrap();
    let fit = GlmFit::fit(&df, &features, TARGET, &GlmOptions::default()).unwrap();

    let eval = evaluate_model(&fit, &df, TARGET).unwrap();
    let m = eval.metrics;
    let tss = total_sum_of_squares(&eval.observed);
    let recomputed = 1.0 - m.n as f64 * m.rmse.powi(2) / tss;

    assert!(
        ((recomputed - m.r_squared) / m.r_squared).abs() < 1e-9,
        "R² {} vs recomputed {}",
        m.r_squared,
        recomputed
    );
}

#[test]
fn test_adjusted_r_squared_formula() {
    let observed = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let predicted = [1.2, 1.8, 3.1, 4.3, 4.7, 6.1];

    let m = evaluate(&observed, &predicted, 2).unwrap();
    let expected = 1.0 - (1.0 - m.r_squared) * (6.0 - 1.0) / (6.0 - 2.0 - 1.0);

    assert!((m.adj_r_squared - expected).abs() < 1e-12);
    assert!(m.adj_r_squared <= m.r_squared);
}

#[test]
fn test_perfect_prediction() {
    let observed = [0.1, 0.4, 0.2, 0.9];
    let m = evaluate(&observed, &observed, 1).unwrap();

    assert_eq!(m.rmse, 0.0);
    assert_eq!(m.r_squared, 1.0);
    assert_eq!(m.adj_r_squared, 1.0);
}

#[test]
fn test_adjusted_r_squared_undefined_without_degrees_of_freedom() {
    let observed = [1.0, 2.0, 4.0];
    let predicted = [1.1, 2.1, 3.9];

    let err = evaluate(&observed, &predicted, 2).unwrap_err();
    assert_eq!(err, ModelError::UndefinedAdjustedRSquared { n: 3, k: 2, dof: 0 });

    let err = evaluate(&observed, &predicted, 5).unwrap_err();
    assert!(matches!(err, ModelError::UndefinedAdjustedRSquared { dof: -3, .. }));
}

#[test]
fn test_constant_observed_is_undefined() {
    let err = evaluate(&[2.0, 2.0, 2.0, 2.0], &[1.0, 2.0, 3.0, 2.0], 1).unwrap_err();
    assert_eq!(err, ModelError::UndefinedRSquared);
}

#[test]
fn test_length_mismatch() {
    let err = evaluate(&[1.0, 2.0], &[1.0], 0).unwrap_err();
    assert_eq!(err, ModelError::LengthMismatch { observed: 2, predicted: 1 });
}

#[test]
fn test_test_partition_metrics_are_finite() {
    let df = create_regression_dataframe(200, 5);
    let split = train_test_split(&df, 0.7, 123).unwrap();
    let features = FeatureSet::new(vec!["signal_a".into(), "signal_b".into()], TARGET).unwrap();
    let fit = GlmFit::fit(&split.train, &features, TARGET, &GlmOptions::default()).unwrap();

    let eval = evaluate_model(&fit, &split.test, TARGET).unwrap();
    assert_eq!(eval.metrics.n, 60);
    assert_eq!(eval.metrics.k, 2);
    assert!(eval.metrics.rmse.is_finite());
    assert!(eval.metrics.r_squared > 0.9);
}
