//! Tests for the seeded train/test split

use regprune::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_default_split_is_reproducible() {
    let df = create_regression_dataframe(100, 1);

    let first = train_test_split(&df, 0.7, 123).unwrap();
    let second = train_test_split(&df, 0.7, 123).unwrap();

    assert_eq!(first.train_rows.len(), 70);
    assert_eq!(first.test_rows.len(), 30);
    assert_eq!(first.train_rows, second.train_rows);
    assert_eq!(first.test_rows, second.test_rows);
    assert!(first.train.equals_missing(&second.train));
}

#[test]
fn test_partitions_are_disjoint_and_complete() {
    let (train, test) = split_indices(100, 0.7, 123).unwrap();

    let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..100).collect::<Vec<_>>());
    assert!(train.windows(2).all(|w| w[0] < w[1]), "train rows keep source order");
}

#[test]
fn test_different_seed_changes_split() {
    let (a, _) = split_indices(100, 0.7, 123).unwrap();
    let (b, _) = split_indices(100, 0.7, 124).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_partition_frames_match_row_positions() {
    let df = create_regression_dataframe(50, 2);
    let split = train_test_split(&df, 0.7, 123).unwrap();

    let source = column_f64(&df, "signal_a");
    let train = column_f64(&split.train, "signal_a");
    for (pos, &row) in split.train_rows.iter().enumerate() {
        assert_eq!(train[pos], source[row]);
    }
    assert_eq!(split.test.height(), 15);
}

#[test]
fn test_invalid_ratio_rejected() {
    assert!(matches!(split_indices(10, 1.0, 123), Err(ModelError::InvalidSplit(_))));
    assert!(matches!(split_indices(10, 0.0, 123), Err(ModelError::InvalidSplit(_))));
    assert!(matches!(split_indices(1, 0.7, 123), Err(ModelError::InvalidSplit(_))));
}
