//! P-value based pruning of GLM predictors
//!
//! NaN p-values never take part in a comparison. While some defined p-value
//! exceeds the threshold, the largest one is dropped. Once every defined
//! p-value passes, a feature whose p-value is NaN is dropped next (first in
//! the current ordering), since its significance cannot be shown. The loop
//! ends only when every retained feature has a defined p-value at or below
//! the threshold.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use serde::Serialize;

use super::design::FeatureSet;
use super::error::ModelError;
use super::glm::{Coefficient, GlmFit, GlmOptions};

/// Why a feature was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    AboveThreshold,
    UndefinedPValue,
}

/// A feature removed by the significance pruner
#[derive(Debug, Clone, Serialize)]
pub struct PValueRemoval {
    pub iteration: usize,
    pub feature: String,
    /// `None` when the p-value was NaN
    pub p_value: Option<f64>,
    pub reason: RemovalReason,
}

/// Pruner settings
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SignificanceOptions {
    pub threshold: f64,
    pub glm: GlmOptions,
}

impl Default for SignificanceOptions {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            glm: GlmOptions::default(),
        }
    }
}

/// Outcome of one pruning iteration
#[derive(Debug, Clone)]
pub enum SignificanceStep {
    Converged {
        fit: GlmFit,
    },
    Removed {
        feature: String,
        p_value: Option<f64>,
        reason: RemovalReason,
        remaining: FeatureSet,
        /// The fit whose p-values triggered the removal
        fit: GlmFit,
    },
}

/// Result of pruning to convergence
#[derive(Debug, Clone)]
pub struct SignificancePruning {
    pub removed: Vec<PValueRemoval>,
    pub features: FeatureSet,
    pub model: GlmFit,
}

/// Pick the coefficient to remove, if any. Returns its index and reason.
pub fn select_removal(coefficients: &[Coefficient], threshold: f64) -> Option<(usize, RemovalReason)> {
    let worst_defined = coefficients
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.p_value.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, c)| match best {
            Some((_, p)) if c.p_value <= p => best,
            _ => Some((i, c.p_value)),
        });

    if let Some((i, p)) = worst_defined {
        if p > threshold {
            return Some((i, RemovalReason::AboveThreshold));
        }
    }

    coefficients
        .iter()
        .position(|c| c.p_value.is_nan())
        .map(|i| (i, RemovalReason::UndefinedPValue))
}

/// Fit the GLM on `train` restricted to `features` and decide one removal.
pub fn significance_step(
    train: &DataFrame,
    features: &FeatureSet,
    target: &str,
    options: &SignificanceOptions,
) -> Result<SignificanceStep> {
    if features.is_empty() {
        return Err(ModelError::EmptyFeatureSet { stage: "significance" }.into());
    }

    let fit = GlmFit::fit(train, features, target, &options.glm)?;

    match select_removal(&fit.coefficients, options.threshold) {
        None => Ok(SignificanceStep::Converged { fit }),
        Some((index, reason)) => {
            let coef = &fit.coefficients[index];
            let feature = coef.name.clone();
            let p_value = Some(coef.p_value).filter(|p| !p.is_nan());
            let remaining = features.without(&feature);
            if remaining.is_empty() {
                return Err(ModelError::EmptyFeatureSet { stage: "significance" }.into());
            }
            Ok(SignificanceStep::Removed {
                feature,
                p_value,
                reason,
                remaining,
                fit,
            })
        }
    }
}

/// Remove the least significant feature until all p-values pass.
pub fn prune_insignificant(
    train: &DataFrame,
    features: &FeatureSet,
    target: &str,
    options: &SignificanceOptions,
) -> Result<SignificancePruning> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("   {spinner:.cyan} Pruning by p-value ({msg})")
            .unwrap(),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut current = features.clone();
    let mut removed: Vec<PValueRemoval> = Vec::new();

    let model = loop {
        pb.set_message(format!("{} features", current.len()));
        match significance_step(train, &current, target, options)? {
            SignificanceStep::Converged { fit } => break fit,
            SignificanceStep::Removed {
                feature,
                p_value,
                reason,
                remaining,
                ..
            } => {
                log::debug!(
                    "Significance iteration {}: dropping '{}' (p = {:?}, {:?})",
                    removed.len() + 1,
                    feature,
                    p_value,
                    reason
                );
                removed.push(PValueRemoval {
                    iteration: removed.len() + 1,
                    feature,
                    p_value,
                    reason,
                });
                current = remaining;
            }
        }
    };

    pb.finish_with_message(format!(
        "removed {}, kept {} features",
        removed.len(),
        current.len()
    ));

    Ok(SignificancePruning {
        removed,
        features: current,
        model,
    })
}
