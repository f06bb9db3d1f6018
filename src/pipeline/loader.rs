//! Dataset loader for CSV and Parquet files

use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::prelude::*;

use super::design::FeatureSet;

/// How to read the input file
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Token read as null in CSV input (the crime dataset uses `?`)
    pub null_value: Option<String>,
    /// Rows used for CSV schema inference; 0 scans the whole file
    pub infer_schema_length: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            null_value: Some("?".to_string()),
            infer_schema_length: 10000,
        }
    }
}

/// Numeric table ready for modelling
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Target and features, all Float64
    pub frame: DataFrame,
    /// Every numeric non-target column, in file order
    pub features: FeatureSet,
    /// Columns removed because they are not numeric
    pub non_numeric: Vec<String>,
}

fn scan(path: &Path, options: &LoadOptions) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => {
            let schema_length = if options.infer_schema_length == 0 {
                None
            } else {
                Some(options.infer_schema_length)
            };
            let null_values = options
                .null_value
                .as_ref()
                .map(|token| NullValues::AllColumnsSingle(token.as_str().into()));
            LazyCsvReader::new(path)
                .with_infer_schema_length(schema_length)
                .with_null_values(null_values)
                .finish()
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        }
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    if !path.exists() {
        bail!("Input file not found: {}", path.display());
    }
    scan(path, options)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Read only the schema and return the column names
pub fn get_column_names(path: &Path, options: &LoadOptions) -> Result<Vec<String>> {
    let schema = scan(path, options)?
        .collect_schema()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;
    Ok(schema.iter_names().map(|s| s.to_string()).collect())
}

/// Drop requested columns, check the target, and cast numeric columns to Float64.
///
/// Non-numeric columns cannot enter a regression and are removed; they are
/// listed in the result so the caller can report them.
pub fn prepare_numeric_frame(df: &DataFrame, target: &str, drop_columns: &[String]) -> Result<PreparedFrame> {
    let column_names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

    let unknown: Vec<&String> = drop_columns
        .iter()
        .filter(|c| !column_names.contains(c))
        .collect();
    if !unknown.is_empty() {
        bail!("Columns to drop not found in dataset: {:?}", unknown);
    }

    if !column_names.iter().any(|c| c == target) {
        bail!(
            "Target column '{}' not found in dataset. Available columns: {:?}",
            target,
            column_names
        );
    }
    if drop_columns.iter().any(|c| c == target) {
        bail!("Target column '{}' cannot be dropped", target);
    }

    let mut columns: Vec<Column> = Vec::new();
    let mut features = Vec::new();
    let mut non_numeric = Vec::new();

    for col in df.get_columns() {
        let name = col.name().to_string();
        if drop_columns.contains(&name) {
            continue;
        }
        if !col.dtype().is_primitive_numeric() {
            if name == target {
                bail!("Target column '{}' must be numeric, found {}", target, col.dtype());
            }
            non_numeric.push(name);
            continue;
        }

        let float_col = col
            .cast(&DataType::Float64)
            .with_context(|| format!("Failed to cast column '{}' to Float64", name))?;
        columns.push(float_col);
        if name != target {
            features.push(name);
        }
    }

    if features.is_empty() {
        bail!("Dataset has no numeric feature columns besides '{}'", target);
    }

    let frame = DataFrame::new(columns).context("Failed to assemble numeric frame")?;

    Ok(PreparedFrame {
        frame,
        features: FeatureSet::new(features, target)?,
        non_numeric,
    })
}
