//! Generalized linear model fitted by iteratively reweighted least squares
//!
//! Supports the gaussian (identity link) and poisson (log link) families.
//! Coefficient p-values use Student's t with n - rank degrees of freedom when
//! the dispersion is estimated (gaussian) and the standard normal otherwise.
//! Aliased terms get NaN estimates, standard errors and p-values.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use faer::Mat;
use polars::prelude::DataFrame;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use super::design::{linear_predictor, model_frame, FeatureSet, FittedModel};
use super::error::ModelError;
use super::ols::{weighted_least_squares, LeastSquares};

/// Distribution family (and its canonical link) of the GLM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GlmFamily {
    #[default]
    Gaussian,
    Poisson,
}

impl fmt::Display for GlmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlmFamily::Gaussian => write!(f, "gaussian"),
            GlmFamily::Poisson => write!(f, "poisson"),
        }
    }
}

impl FromStr for GlmFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gaussian" => Ok(GlmFamily::Gaussian),
            "poisson" => Ok(GlmFamily::Poisson),
            _ => Err(format!(
                "Unknown GLM family: '{}'. Use 'gaussian' or 'poisson'.",
                s
            )),
        }
    }
}

impl GlmFamily {
    fn link(self, mu: f64) -> f64 {
        match self {
            GlmFamily::Gaussian => mu,
            GlmFamily::Poisson => mu.ln(),
        }
    }

    fn inverse_link(self, eta: f64) -> f64 {
        match self {
            GlmFamily::Gaussian => eta,
            GlmFamily::Poisson => eta.exp().max(f64::EPSILON),
        }
    }

    /// d mu / d eta
    fn mu_eta(self, eta: f64) -> f64 {
        match self {
            GlmFamily::Gaussian => 1.0,
            GlmFamily::Poisson => eta.exp().max(f64::EPSILON),
        }
    }

    fn variance(self, mu: f64) -> f64 {
        match self {
            GlmFamily::Gaussian => 1.0,
            GlmFamily::Poisson => mu,
        }
    }

    fn unit_deviance(self, y: f64, mu: f64) -> f64 {
        match self {
            GlmFamily::Gaussian => (y - mu).powi(2),
            GlmFamily::Poisson => {
                let ylogy = if y > 0.0 { y * (y / mu).ln() } else { 0.0 };
                2.0 * (ylogy - (y - mu))
            }
        }
    }

    fn initial_mu(self, y: f64) -> f64 {
        match self {
            GlmFamily::Gaussian => y,
            GlmFamily::Poisson => y + 0.1,
        }
    }

    fn estimates_dispersion(self) -> bool {
        matches!(self, GlmFamily::Gaussian)
    }
}

/// IRLS settings
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GlmOptions {
    pub family: GlmFamily,
    pub max_iter: usize,
    /// Relative deviance change that counts as converged
    pub tolerance: f64,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            family: GlmFamily::Gaussian,
            max_iter: 25,
            tolerance: 1e-8,
        }
    }
}

/// One estimated coefficient with its Wald test
#[derive(Debug, Clone, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub statistic: f64,
    /// NaN when the test is undefined
    pub p_value: f64,
}

/// Fitted GLM `target ~ features` with intercept
#[derive(Debug, Clone, Serialize)]
pub struct GlmFit {
    pub family: GlmFamily,
    pub intercept: Coefficient,
    pub coefficients: Vec<Coefficient>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub dispersion: f64,
    pub df_residual: i64,
    pub n_obs: usize,
    pub iterations: usize,
    pub converged: bool,
    #[serde(skip)]
    features: Vec<String>,
}

impl GlmFit {
    /// Fit on the complete rows of `df`.
    pub fn fit(df: &DataFrame, features: &FeatureSet, target: &str, options: &GlmOptions) -> Result<Self> {
        let frame = model_frame(df, features, target)?;
        let n = frame.n_rows();
        if n < 2 {
            return Err(ModelError::InsufficientRows { required: 2, found: n }.into());
        }
        if options.family == GlmFamily::Poisson && frame.y.iter().any(|&v| v < 0.0) {
            bail!("Poisson family requires a non-negative target, '{}' has negative values", target);
        }

        let family = options.family;
        let y = &frame.y;

        let mut mu: Vec<f64> = y.iter().map(|&v| family.initial_mu(v)).collect();
        let mut eta: Vec<f64> = mu.iter().map(|&m| family.link(m)).collect();
        let mut deviance = f64::INFINITY;
        let mut converged = false;
        let mut iterations = 0;
        let mut solution: Option<LeastSquares> = None;

        while iterations < options.max_iter {
            iterations += 1;

            let d: Vec<f64> = eta.iter().map(|&e| family.mu_eta(e)).collect();
            let z: Vec<f64> = (0..n).map(|i| eta[i] + (y[i] - mu[i]) / d[i]).collect();
            let w: Vec<f64> = (0..n).map(|i| d[i] * d[i] / family.variance(mu[i])).collect();

            let step = weighted_least_squares(&frame.x, &z, Some(&w)).ok_or_else(|| {
                ModelError::SingularDesign {
                    features: features.names().to_vec(),
                }
            })?;

            eta = step.fitted.clone();
            mu = eta.iter().map(|&e| family.inverse_link(e)).collect();
            solution = Some(step);

            let new_deviance: f64 = (0..n).map(|i| family.unit_deviance(y[i], mu[i])).sum();
            let change = (new_deviance - deviance).abs() / (new_deviance.abs() + 0.1);
            deviance = new_deviance;

            log::debug!("IRLS iteration {}: deviance = {:.6}", iterations, deviance);

            if change < options.tolerance {
                converged = true;
                break;
            }
        }

        let solution = solution.ok_or_else(|| ModelError::InsufficientRows { required: 1, found: 0 })?;
        if !converged {
            log::warn!("IRLS did not converge after {} iterations", iterations);
        }

        let aliased: Vec<&String> = features
            .names()
            .iter()
            .zip(&solution.aliased)
            .filter_map(|(name, &a)| a.then_some(name))
            .collect();
        if !aliased.is_empty() {
            log::debug!("Aliased terms without estimates: {:?}", aliased);
        }

        let df_residual = n as i64 - solution.rank() as i64;
        let dispersion = if !family.estimates_dispersion() {
            1.0
        } else if df_residual > 0 {
            let pearson: f64 = (0..n)
                .map(|i| (y[i] - mu[i]).powi(2) / family.variance(mu[i]))
                .sum();
            pearson / df_residual as f64
        } else {
            f64::NAN
        };

        let mean_y = y.iter().sum::<f64>() / n as f64;
        let null_deviance: f64 = y.iter().map(|&v| family.unit_deviance(v, mean_y)).sum();

        let mut coefs = wald_tests(&solution.beta, &solution.xtwx_inv, dispersion, df_residual, family);
        for (coef, name) in coefs.iter_mut().skip(1).zip(features.names()) {
            coef.name = name.clone();
        }
        let mut iter = coefs.into_iter();
        let intercept = iter.next().ok_or_else(|| ModelError::SingularDesign {
            features: features.names().to_vec(),
        })?;

        Ok(Self {
            family,
            intercept,
            coefficients: iter.collect(),
            deviance,
            null_deviance,
            dispersion,
            df_residual,
            n_obs: n,
            iterations,
            converged,
            features: features.names().to_vec(),
        })
    }

    /// Coefficient for a feature, if it is in the model.
    pub fn coefficient(&self, feature: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == feature)
    }
}

impl FittedModel for GlmFit {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_matrix(&self, x: &Mat<f64>) -> Vec<f64> {
        // Aliased terms have no estimate and contribute nothing
        let beta: Vec<f64> = self
            .coefficients
            .iter()
            .map(|c| if c.estimate.is_nan() { 0.0 } else { c.estimate })
            .collect();
        linear_predictor(x, self.intercept.estimate, &beta)
            .into_iter()
            .map(|eta| self.family.inverse_link(eta))
            .collect()
    }
}

/// Standard errors, test statistics and two-sided p-values.
fn wald_tests(
    beta: &[f64],
    xtwx_inv: &Mat<f64>,
    dispersion: f64,
    df_residual: i64,
    family: GlmFamily,
) -> Vec<Coefficient> {
    beta.iter()
        .enumerate()
        .map(|(j, &estimate)| {
            let std_error = (dispersion * xtwx_inv[(j, j)]).sqrt();
            let statistic = estimate / std_error;
            let p_value = if family.estimates_dispersion() {
                pvalue_t(statistic, df_residual as f64)
            } else {
                pvalue_z(statistic)
            };
            Coefficient {
                name: "(Intercept)".to_string(),
                estimate,
                std_error,
                statistic,
                p_value,
            }
        })
        .collect()
}

/// Two-sided p-value from a z statistic; NaN when undefined.
pub fn pvalue_z(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => 2.0 * (1.0 - normal.cdf(z.abs())),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value from a t statistic; NaN when undefined.
pub fn pvalue_t(t: f64, df: f64) -> f64 {
    if !t.is_finite() || !(df > 0.0) {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => f64::NAN,
    }
}
