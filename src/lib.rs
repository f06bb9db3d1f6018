//! regprune: Regression Feature Pruning Library
//!
//! A library for capping outliers, pruning multicollinear predictors by VIF,
//! pruning insignificant predictors by GLM p-values, and evaluating the
//! resulting model on a seeded train/test split.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
