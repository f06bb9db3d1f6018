//! Variance-inflation-factor based multicollinearity pruning

use anyhow::Result;
use faer::Mat;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::design::{model_frame, FeatureSet};
use super::error::ModelError;
use super::ols::{r_squared, weighted_least_squares, OlsFit};

/// VIF of a single feature against the rest of the current set
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVif {
    pub feature: String,
    /// +inf for a constant feature or an exactly collinear one
    pub vif: f64,
}

/// A feature removed by the pruner, with the VIF that triggered it
#[derive(Debug, Clone, Serialize)]
pub struct VifRemoval {
    pub iteration: usize,
    pub feature: String,
    pub vif: f64,
}

/// Outcome of one pruning iteration. Inputs are never mutated.
#[derive(Debug, Clone)]
pub enum VifStep {
    /// Max VIF is within the threshold, or fewer than two features remain
    Converged { vifs: Vec<FeatureVif> },
    /// One feature was removed and the OLS model refit on the remainder
    Removed {
        removed: FeatureVif,
        remaining: FeatureSet,
        /// `None` while the remaining design is still rank deficient
        model: Option<OlsFit>,
        vifs: Vec<FeatureVif>,
    },
}

/// Result of pruning to convergence
#[derive(Debug, Clone)]
pub struct VifPruning {
    pub removed: Vec<VifRemoval>,
    pub final_vifs: Vec<FeatureVif>,
    pub features: FeatureSet,
    pub model: OlsFit,
}

/// Compute the VIF of every feature over the rows where the features and
/// `target` are all present, the same rows the OLS refit uses.
///
/// VIF_j = 1 / (1 - R²_j), where R²_j comes from regressing feature j on
/// the other features with an intercept. Output order follows `features`.
pub fn variance_inflation_factors(df: &DataFrame, features: &FeatureSet, target: &str) -> Result<Vec<FeatureVif>> {
    let x = model_frame(df, features, target)?.x;
    let p = x.ncols();
    let n = x.nrows();

    if p >= 2 && n < p + 1 {
        return Err(ModelError::InsufficientRows {
            required: p + 1,
            found: n,
        }
        .into());
    }

    let constant: Vec<bool> = (0..p)
        .map(|j| is_constant(&(0..n).map(|i| x[(i, j)]).collect::<Vec<_>>()))
        .collect();

    let vifs: Vec<f64> = (0..p)
        .into_par_iter()
        .map(|j| vif_for_column(&x, j, &constant))
        .collect();

    Ok(features
        .names()
        .iter()
        .zip(vifs)
        .map(|(feature, vif)| FeatureVif {
            feature: feature.clone(),
            vif,
        })
        .collect())
}

/// VIF of column `j`. Constant columns are infinite and are left out of the
/// other columns' auxiliary regressions, where the intercept absorbs them.
/// Aliased regressors are set aside by the solver; they do not change the
/// span, so R²_j is unaffected.
fn vif_for_column(x: &Mat<f64>, j: usize, constant: &[bool]) -> f64 {
    let n = x.nrows();
    if n == 0 || constant[j] {
        return f64::INFINITY;
    }

    let others: Vec<usize> = (0..x.ncols()).filter(|&c| c != j && !constant[c]).collect();
    if others.is_empty() {
        return 1.0;
    }

    let y: Vec<f64> = (0..n).map(|i| x[(i, j)]).collect();
    let design = Mat::from_fn(n, others.len(), |i, c| x[(i, others[c])]);

    match weighted_least_squares(&design, &y, None) {
        Some(solution) => {
            let r2 = r_squared(&y, &solution.fitted);
            if r2 < 1.0 - 1e-14 {
                (1.0 / (1.0 - r2)).max(1.0)
            } else {
                f64::INFINITY
            }
        }
        // Reduced normal equations still numerically singular
        None => f64::INFINITY,
    }
}

fn is_constant(values: &[f64]) -> bool {
    let Some(&first) = values.first() else {
        return true;
    };
    let scale = first.abs().max(1.0);
    values.iter().all(|v| (v - first).abs() <= 1e-12 * scale)
}

/// Largest VIF; on ties the feature that comes first wins.
pub fn max_vif(vifs: &[FeatureVif]) -> Option<&FeatureVif> {
    vifs.iter().fold(None, |best: Option<&FeatureVif>, v| match best {
        Some(b) if v.vif > b.vif || (v.vif.is_nan() && !b.vif.is_nan()) => Some(v),
        Some(b) => Some(b),
        None => Some(v),
    })
}

/// Run one iteration of VIF pruning.
pub fn vif_step(df: &DataFrame, features: &FeatureSet, target: &str, threshold: f64) -> Result<VifStep> {
    let vifs = variance_inflation_factors(df, features, target)?;

    if features.len() < 2 {
        return Ok(VifStep::Converged { vifs });
    }

    let worst = match max_vif(&vifs) {
        Some(w) if w.vif > threshold || w.vif.is_nan() => w.clone(),
        _ => return Ok(VifStep::Converged { vifs }),
    };

    let remaining = features.without(&worst.feature);
    let model = match OlsFit::fit(df, &remaining, target) {
        Ok(fit) => Some(fit),
        Err(e) if matches!(e.downcast_ref::<ModelError>(), Some(ModelError::SingularDesign { .. })) => {
            log::debug!("OLS refit still singular after removing '{}'", worst.feature);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(VifStep::Removed {
        removed: worst,
        remaining,
        model,
        vifs,
    })
}

/// Remove the highest-VIF feature until every VIF is at most `threshold`.
pub fn prune_multicollinear(
    df: &DataFrame,
    features: &FeatureSet,
    target: &str,
    threshold: f64,
) -> Result<VifPruning> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("   {spinner:.cyan} Pruning by VIF ({msg})")
            .unwrap(),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut current = features.clone();
    let mut removed = Vec::new();

    let final_vifs = loop {
        pb.set_message(format!("{} features", current.len()));
        match vif_step(df, &current, target, threshold)? {
            VifStep::Converged { vifs } => break vifs,
            VifStep::Removed {
                removed: worst,
                remaining,
                model,
                ..
            } => {
                log::debug!(
                    "VIF iteration {}: dropping '{}' (VIF = {:.4}), refit R² = {:?}",
                    removed.len() + 1,
                    worst.feature,
                    worst.vif,
                    model.as_ref().map(|m| m.r_squared)
                );
                removed.push(VifRemoval {
                    iteration: removed.len() + 1,
                    feature: worst.feature,
                    vif: worst.vif,
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

    if current.is_empty() {
        return Err(ModelError::EmptyFeatureSet { stage: "VIF" }.into());
    }

    let model = OlsFit::fit(df, &current, target)?;

    Ok(VifPruning {
        removed,
        final_vifs,
        features: current,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vif(feature: &str, vif: f64) -> FeatureVif {
        FeatureVif {
            feature: feature.to_string(),
            vif,
        }
    }

    #[test]
    fn test_max_vif_tie_break_first() {
        let vifs = vec![vif("a", 2.0), vif("b", 5.0), vif("c", 5.0)];
        assert_eq!(max_vif(&vifs).unwrap().feature, "b");
    }

    #[test]
    fn test_max_vif_infinite_wins() {
        let vifs = vec![vif("a", 2.0), vif("b", f64::INFINITY), vif("c", 1e9)];
        assert_eq!(max_vif(&vifs).unwrap().feature, "b");
    }

    #[test]
    fn test_orthogonal_columns_have_unit_vif() {
        let x = Mat::from_fn(100, 2, |i, j| {
            let t = i as f64 * 0.1;
            if j == 0 {
                t.sin()
            } else {
                t.cos()
            }
        });
        let constant = [false, false];
        assert!((vif_for_column(&x, 0, &constant) - 1.0).abs() < 0.5);
        assert!((vif_for_column(&x, 1, &constant) - 1.0).abs() < 0.5);
    }

    #[test]
    fn test_constant_column_is_infinite() {
        let x = Mat::from_fn(10, 3, |i, j| match j {
            0 => 4.0,
            1 => i as f64,
            _ => ((i * 7) % 5) as f64,
        });
        let constant = [true, false, false];

        assert!(vif_for_column(&x, 0, &constant).is_infinite());
        assert!(vif_for_column(&x, 1, &constant).is_finite(), "constant must not poison the others");
    }

    #[test]
    fn test_single_feature_converges() {
        let df = df! {
            "a" => [1.0f64, 2.0, 3.0, 4.0],
            "y" => [2.0f64, 4.0, 5.0, 9.0],
        }
        .unwrap();
        let fs = FeatureSet::new(vec!["a".into()], "y").unwrap();

        let step = vif_step(&df, &fs, "y", 1.5).unwrap();
        assert!(matches!(step, VifStep::Converged { .. }));
    }
}
