//! IQR-based outlier capping

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use serde::Serialize;

use super::design::column_values;

/// Multiplier applied to the IQR to place the whiskers
const WHISKER_FACTOR: f64 = 1.5;

/// Quartiles and whisker boundaries of a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Whiskers {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Capping applied to one column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnCapping {
    pub column: String,
    pub whiskers: Whiskers,
    pub capped_low: usize,
    pub capped_high: usize,
}

impl ColumnCapping {
    pub fn total_capped(&self) -> usize {
        self.capped_low + self.capped_high
    }
}

/// Capped table plus per-column details
#[derive(Debug, Clone)]
pub struct CappingOutcome {
    pub frame: DataFrame,
    pub columns: Vec<ColumnCapping>,
}

/// Linear-interpolation quantile of pre-sorted values (type 7).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Whiskers of the non-missing values; `None` if there are none.
pub fn whiskers(values: &[Option<f64>]) -> Option<Whiskers> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;

    Some(Whiskers {
        q1,
        q3,
        iqr,
        lower: q1 - WHISKER_FACTOR * iqr,
        upper: q3 + WHISKER_FACTOR * iqr,
    })
}

/// Cap each listed column to its whiskers; every column is handled independently.
///
/// A listed column missing from `df` is a configuration error. Nulls stay null.
pub fn cap_outliers(df: &DataFrame, columns: &[String]) -> Result<CappingOutcome> {
    let present: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let missing: Vec<&String> = columns.iter().filter(|c| !present.contains(c)).collect();
    if !missing.is_empty() {
        bail!(
            "Outlier columns not found in dataset: {:?}. Available columns: {:?}",
            missing,
            present
        );
    }

    let mut frame = df.clone();
    let mut details = Vec::with_capacity(columns.len());

    for name in columns {
        let values = column_values(df, name)?;
        let Some(bounds) = whiskers(&values) else {
            log::warn!("Column '{}' has no values; skipping outlier capping", name);
            continue;
        };

        let mut capped_low = 0usize;
        let mut capped_high = 0usize;
        let capped: Vec<Option<f64>> = values
            .iter()
            .map(|v| {
                v.map(|x| {
                    if x < bounds.lower {
                        capped_low += 1;
                        bounds.lower
                    } else if x > bounds.upper {
                        capped_high += 1;
                        bounds.upper
                    } else {
                        x
                    }
                })
            })
            .collect();

        frame
            .with_column(Column::new(name.as_str().into(), capped))
            .with_context(|| format!("Failed to replace column '{}'", name))?;

        log::debug!(
            "Capped '{}' to [{:.4}, {:.4}]: {} low, {} high",
            name,
            bounds.lower,
            bounds.upper,
            capped_low,
            capped_high
        );

        details.push(ColumnCapping {
            column: name.clone(),
            whiskers: bounds,
            capped_low,
            capped_high,
        });
    }

    Ok(CappingOutcome {
        frame,
        columns: details,
    })
}

/// Append the capped table below the uncapped one (twice the rows).
///
/// Kept only to reproduce earlier analyses on request: every observation then
/// appears twice, once raw and once capped, which inflates the sample size.
pub fn stack_with_original(original: &DataFrame, capped: &DataFrame) -> Result<DataFrame> {
    original
        .vstack(capped)
        .context("Failed to stack uncapped and capped tables")
}
