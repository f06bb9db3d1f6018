//! Pipeline module - load, cap, prune, fit and evaluate

pub mod design;
pub mod error;
pub mod glm;
pub mod loader;
pub mod metrics;
pub mod ols;
pub mod outliers;
pub mod significance;
pub mod split;
pub mod vif;

pub use design::*;
pub use error::ModelError;
pub use glm::*;
pub use loader::*;
pub use metrics::*;
pub use ols::{OlsFit, r_squared};
pub use outliers::*;
pub use significance::*;
pub use split::*;
pub use vif::*;
