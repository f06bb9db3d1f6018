//! Ordinary least squares with an intercept
//!
//! Solves the (optionally weighted) normal equations of the centered design
//! with a faer Cholesky factorisation, after setting aside aliased columns.
//! The same primitive backs the VIF auxiliary regressions and each IRLS
//! iteration of the GLM.

use anyhow::Result;
use faer::prelude::*;
use faer::{Mat, Side};
use polars::prelude::*;
use serde::Serialize;

use super::design::{linear_predictor, model_frame, FeatureSet, FittedModel};
use super::error::ModelError;

/// Residual norm, relative to the centered column norm, at or below which a
/// column counts as aliased with earlier columns.
const ALIAS_TOLERANCE: f64 = 1e-7;

/// Centered norm, relative to the raw column norm, at or below which a
/// column counts as constant.
const CONSTANT_TOLERANCE: f64 = 1e-10;

/// Solution of a weighted least-squares problem with an intercept.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Intercept followed by one coefficient per column; NaN where aliased
    pub beta: Vec<f64>,
    /// (X'WX)^-1 of the intercept design, NaN in aliased rows and columns
    pub xtwx_inv: Mat<f64>,
    /// Columns that are constant or lie in the span of earlier columns
    pub aliased: Vec<bool>,
    /// `intercept + x · beta`, aliased terms contributing nothing
    pub fitted: Vec<f64>,
}

impl LeastSquares {
    /// Estimated parameters, intercept included.
    pub fn rank(&self) -> usize {
        1 + self.aliased.iter().filter(|a| !**a).count()
    }
}

/// Solve `min sum w_i (y_i - b0 - x_i b)^2`; `x` holds no intercept column.
///
/// Columns are centered on their weighted means before the solve, so a large
/// offset does not degrade the conditioning. Aliased columns get NaN
/// coefficients and the rest are estimated on the remaining subset, the way
/// R's `lm` reports them. Returns `None` only when the weights are unusable or
/// the reduced normal equations still fail to factorise.
pub fn weighted_least_squares(x: &Mat<f64>, y: &[f64], weights: Option<&[f64]>) -> Option<LeastSquares> {
    let n = x.nrows();
    let p = x.ncols();
    if n == 0 || y.len() != n || weights.is_some_and(|w| w.len() != n) {
        return None;
    }

    let w: Vec<f64> = (0..n).map(|i| weights.map_or(1.0, |w| w[i])).collect();
    let total_w: f64 = w.iter().sum();
    if !(total_w > 0.0 && total_w.is_finite()) || w.iter().any(|&v| v < 0.0) {
        return None;
    }
    let sw: Vec<f64> = w.iter().map(|v| v.sqrt()).collect();

    let means: Vec<f64> = (0..p)
        .map(|j| (0..n).map(|i| w[i] * x[(i, j)]).sum::<f64>() / total_w)
        .collect();
    let y_mean = (0..n).map(|i| w[i] * y[i]).sum::<f64>() / total_w;

    let centered = Mat::from_fn(n, p, |i, j| sw[i] * (x[(i, j)] - means[j]));
    let aliased = aliased_columns(x, &centered, &sw);
    let kept: Vec<usize> = (0..p).filter(|&j| !aliased[j]).collect();
    let k = kept.len();

    let (beta_kept, cov_kept) = if k == 0 {
        (Vec::new(), Mat::zeros(0, 0))
    } else {
        let xc = Mat::from_fn(n, k, |i, c| centered[(i, kept[c])]);
        let yc = Mat::from_fn(n, 1, |i, _| sw[i] * (y[i] - y_mean));
        let xtx = xc.transpose() * &xc;
        let xty = xc.transpose() * &yc;
        let chol = xtx.cholesky(Side::Lower).ok()?;
        let solution = chol.solve(&xty);
        ((0..k).map(|c| solution[(c, 0)]).collect::<Vec<f64>>(), chol.inverse())
    };
    if beta_kept.iter().any(|b| !b.is_finite()) {
        return None;
    }

    let intercept = y_mean
        - kept
            .iter()
            .zip(&beta_kept)
            .map(|(&j, b)| means[j] * b)
            .sum::<f64>();

    // Intercept block of the inverse from the centered solve:
    // var(b0) = 1/sum(w) + m'Cm, cov(b0, b) = -Cm
    let cm: Vec<f64> = (0..k)
        .map(|r| (0..k).map(|c| cov_kept[(r, c)] * means[kept[c]]).sum())
        .collect();
    let var_intercept = 1.0 / total_w + (0..k).map(|r| means[kept[r]] * cm[r]).sum::<f64>();

    let mut position: Vec<Option<usize>> = vec![None; p];
    for (c, &j) in kept.iter().enumerate() {
        position[j] = Some(c);
    }

    let xtwx_inv = Mat::from_fn(p + 1, p + 1, |r, c| match (r, c) {
        (0, 0) => var_intercept,
        (0, j) | (j, 0) => position[j - 1].map_or(f64::NAN, |s| -cm[s]),
        (r, c) => match (position[r - 1], position[c - 1]) {
            (Some(a), Some(b)) => cov_kept[(a, b)],
            _ => f64::NAN,
        },
    });

    let mut beta = Vec::with_capacity(p + 1);
    beta.push(intercept);
    beta.extend((0..p).map(|j| position[j].map_or(f64::NAN, |s| beta_kept[s])));

    let fitted = (0..n)
        .map(|i| {
            kept.iter()
                .zip(&beta_kept)
                .fold(intercept, |acc, (&j, b)| acc + b * x[(i, j)])
        })
        .collect();

    Some(LeastSquares {
        beta,
        xtwx_inv,
        aliased,
        fitted,
    })
}

/// Flag columns that are constant or in the span of earlier columns.
///
/// Gram-Schmidt in column order on the weighted, centered design, so of two
/// dependent columns the later one is aliased.
fn aliased_columns(x: &Mat<f64>, centered: &Mat<f64>, sw: &[f64]) -> Vec<bool> {
    let n = centered.nrows();
    let mut basis: Vec<Vec<f64>> = Vec::new();
    let mut aliased = vec![false; centered.ncols()];

    for (j, flag) in aliased.iter_mut().enumerate() {
        let raw_norm = (0..n).map(|i| (sw[i] * x[(i, j)]).powi(2)).sum::<f64>().sqrt();
        let mut v: Vec<f64> = (0..n).map(|i| centered[(i, j)]).collect();
        let centered_norm = norm(&v);
        if centered_norm <= CONSTANT_TOLERANCE * raw_norm {
            *flag = true;
            continue;
        }

        // Second pass restores orthogonality lost to rounding
        for _ in 0..2 {
            for q in &basis {
                let dot: f64 = q.iter().zip(&v).map(|(a, b)| a * b).sum();
                v.iter_mut().zip(q).for_each(|(vi, qi)| *vi -= dot * qi);
            }
        }

        let residual = norm(&v);
        if residual <= ALIAS_TOLERANCE * centered_norm {
            *flag = true;
        } else {
            basis.push(v.into_iter().map(|vi| vi / residual).collect());
        }
    }

    aliased
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|a| a * a).sum::<f64>().sqrt()
}

/// Coefficient of determination `1 - RSS/TSS`; NaN when TSS is zero.
pub fn r_squared(y: &[f64], fitted: &[f64]) -> f64 {
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let rss: f64 = y.iter().zip(fitted).map(|(o, f)| (o - f).powi(2)).sum();
    if tss == 0.0 {
        f64::NAN
    } else {
        1.0 - rss / tss
    }
}

/// Fitted OLS model `target ~ features`.
#[derive(Debug, Clone, Serialize)]
pub struct OlsFit {
    pub features: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub n_obs: usize,
}

impl OlsFit {
    /// Fit on the complete rows of `df`.
    pub fn fit(df: &DataFrame, features: &FeatureSet, target: &str) -> Result<Self> {
        let frame = model_frame(df, features, target)?;
        let required = features.len() + 1;
        if frame.n_rows() < required {
            return Err(ModelError::InsufficientRows {
                required,
                found: frame.n_rows(),
            }
            .into());
        }

        let solution = weighted_least_squares(&frame.x, &frame.y, None)
            .filter(|s| !s.aliased.contains(&true))
            .ok_or_else(|| ModelError::SingularDesign {
                features: features.names().to_vec(),
            })?;

        let intercept = solution.beta[0];
        let coefficients = solution.beta[1..].to_vec();

        Ok(Self {
            features: features.names().to_vec(),
            intercept,
            coefficients,
            r_squared: r_squared(&frame.y, &solution.fitted),
            n_obs: frame.n_rows(),
        })
    }
}

impl FittedModel for OlsFit {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_matrix(&self, x: &Mat<f64>) -> Vec<f64> {
        linear_predictor(x, self.intercept, &self.coefficients)
    }
}
