//! Typed failure modes of the model fitting and evaluation steps.
//!
//! I/O and configuration problems are reported through `anyhow` with context;
//! the variants here cover the statistical edge cases callers may want to
//! match on.

use thiserror::Error;

/// Errors raised while fitting, pruning, or evaluating a model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// X'WX could not be factorised (perfect collinearity or a constant column).
    #[error("design matrix is singular for features {features:?}")]
    SingularDesign { features: Vec<String> },

    /// Pruning removed every feature.
    #[error("feature set is empty after {stage} pruning")]
    EmptyFeatureSet { stage: &'static str },

    /// Not enough complete rows to fit the requested model.
    #[error("need at least {required} complete rows, found {found}")]
    InsufficientRows { required: usize, found: usize },

    /// Total sum of squares is zero, so R² has no denominator.
    #[error("R² is undefined: observed values have zero variance")]
    UndefinedRSquared,

    /// n - k - 1 is not positive, so Adjusted R² has no denominator.
    #[error("Adjusted R² is undefined for n = {n}, k = {k} (n - k - 1 = {dof})")]
    UndefinedAdjustedRSquared { n: usize, k: usize, dof: i64 },

    /// Observed and predicted vectors disagree in length.
    #[error("observed ({observed}) and predicted ({predicted}) lengths differ")]
    LengthMismatch { observed: usize, predicted: usize },

    /// The target column was passed as a feature.
    #[error("target column '{0}' cannot be a feature")]
    TargetInFeatures(String),

    /// Train ratio outside (0, 1) or a partition would be empty.
    #[error("invalid train/test split: {0}")]
    InvalidSplit(String),
}
