//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::pipeline::{GlmFamily, GlmOptions, LoadOptions, SignificanceOptions};

/// Default response column of the communities-and-crime dataset
pub const DEFAULT_TARGET: &str = "ViolentCrimesPerPop";

/// regprune - Cap outliers, prune collinear and insignificant predictors, and evaluate a GLM
#[derive(Parser, Debug)]
#[command(name = "regprune")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Target column name (never pruned)
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Directory for the analysis report and predictions.
    /// Defaults to the input file's directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Columns to drop before processing (comma-separated), e.g. identifiers
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Columns to cap at 1.5 x IQR (comma-separated).
    /// Defaults to every numeric feature column.
    #[arg(long, value_delimiter = ',')]
    pub cap_columns: Vec<String>,

    /// Append the capped table below the uncapped one before modelling.
    /// Duplicates every row; only for reproducing earlier analyses.
    #[arg(long, default_value = "false")]
    pub stack_uncapped: bool,

    /// VIF threshold - drop the highest-VIF feature while any VIF exceeds this value
    #[arg(long, default_value = "1.5", value_parser = validate_vif_threshold)]
    pub vif_threshold: f64,

    /// P-value threshold - drop the least significant feature while any p-value exceeds this value
    #[arg(long, default_value = "0.05", value_parser = validate_unit_interval)]
    pub p_value_threshold: f64,

    /// Share of rows used for training (exclusive 0 to 1)
    #[arg(long, default_value = "0.7", value_parser = validate_train_ratio)]
    pub train_ratio: f64,

    /// Seed for the train/test split
    #[arg(long, default_value = "123")]
    pub seed: u64,

    /// GLM family: "gaussian" (identity link) or "poisson" (log link)
    #[arg(long, default_value = "gaussian")]
    pub family: GlmFamily,

    /// Maximum IRLS iterations per GLM fit
    #[arg(long, default_value = "25")]
    pub max_iter: usize,

    /// Token treated as missing in CSV input
    #[arg(long, default_value = "?")]
    pub null_value: String,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Package the JSON report and predictions CSV into a single zip file
    #[arg(long, default_value = "false")]
    pub bundle: bool,
}

impl Cli {
    fn output_file(&self, suffix: &str) -> PathBuf {
        let dir = self.output_dir.clone().unwrap_or_else(|| {
            self.input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        });
        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        dir.join(format!("{}_{}", stem, suffix))
    }

    /// JSON report path, e.g. data.csv -> data_analysis.json
    pub fn report_path(&self) -> PathBuf {
        self.output_file("analysis.json")
    }

    /// Predictions CSV path, e.g. data.csv -> data_predictions.csv
    pub fn predictions_path(&self) -> PathBuf {
        self.output_file("predictions.csv")
    }

    /// Zip bundle path, e.g. data.csv -> data_analysis.zip
    pub fn bundle_path(&self) -> PathBuf {
        self.output_file("analysis.zip")
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            null_value: Some(self.null_value.clone()).filter(|s| !s.is_empty()),
            infer_schema_length: self.infer_schema_length,
        }
    }

    pub fn significance_options(&self) -> SignificanceOptions {
        SignificanceOptions {
            threshold: self.p_value_threshold,
            glm: GlmOptions {
                family: self.family,
                max_iter: self.max_iter,
                ..Default::default()
            },
        }
    }
}

/// Validator for vif_threshold: VIF is at least 1 by construction
fn validate_vif_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(value >= 1.0 && value.is_finite()) {
        Err(format!("vif_threshold must be a finite value >= 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for p_value_threshold
fn validate_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("p_value_threshold must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for train_ratio
fn validate_train_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(value > 0.0 && value < 1.0) {
        Err(format!("train_ratio must be strictly between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}
