//! Analysis report export
//!
//! Writes a JSON document describing every pruning decision and the final
//! model, plus the observed/predicted pairs behind the predicted-vs-observed
//! scatter plots, and optionally zips both together.

use std::path::Path;

use anyhow::{Context, Result};
use ::chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::{
    Coefficient, ColumnCapping, FeatureVif, FitMetrics, GlmFamily, PValueRemoval, VifRemoval,
};

/// Settings of the run
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub regprune_version: String,
    pub input_file: String,
    pub target_column: String,
    pub vif_threshold: f64,
    pub p_value_threshold: f64,
    pub train_ratio: f64,
    pub seed: u64,
    pub family: GlmFamily,
    pub stacked_uncapped: bool,
}

/// Parameters for the metadata block
pub struct ReportParams<'a> {
    pub input_file: &'a str,
    pub target_column: &'a str,
    pub vif_threshold: f64,
    pub p_value_threshold: f64,
    pub train_ratio: f64,
    pub seed: u64,
    pub family: GlmFamily,
    pub stacked_uncapped: bool,
}

/// VIF stage outcome
#[derive(Debug, Clone, Serialize)]
pub struct VifSection {
    pub removed: Vec<VifRemoval>,
    pub final_vifs: Vec<FeatureVif>,
}

/// Significance stage outcome
#[derive(Debug, Clone, Serialize)]
pub struct SignificanceSection {
    pub removed: Vec<PValueRemoval>,
    pub intercept: Coefficient,
    pub coefficients: Vec<Coefficient>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub converged: bool,
}

/// Train and test metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSection {
    pub train: FitMetrics,
    pub test: FitMetrics,
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub initial_features: Vec<String>,
    pub final_features: Vec<String>,
    pub outlier_capping: Vec<ColumnCapping>,
    pub multicollinearity: VifSection,
    pub significance: SignificanceSection,
    pub metrics: MetricsSection,
}

impl ReportMetadata {
    pub fn new(params: &ReportParams) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            regprune_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            target_column: params.target_column.to_string(),
            vif_threshold: params.vif_threshold,
            p_value_threshold: params.p_value_threshold,
            train_ratio: params.train_ratio,
            seed: params.seed,
            family: params.family,
            stacked_uncapped: params.stacked_uncapped,
        }
    }
}

/// Write the report as pretty JSON. NaN/inf values serialize as `null`.
pub fn export_analysis_report(report: &AnalysisReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize analysis report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write analysis report to {}", output_path.display()))?;

    Ok(())
}

/// Observed/predicted pairs of one partition
pub struct PartitionPredictions<'a> {
    pub partition: &'a str,
    pub observed: &'a [f64],
    pub predicted: &'a [f64],
}

/// Write `partition,observed,predicted` rows for every partition.
pub fn export_predictions(partitions: &[PartitionPredictions], output_path: &Path) -> Result<()> {
    let mut labels: Vec<&str> = Vec::new();
    let mut observed: Vec<f64> = Vec::new();
    let mut predicted: Vec<f64> = Vec::new();

    for p in partitions {
        labels.extend(std::iter::repeat(p.partition).take(p.observed.len()));
        observed.extend_from_slice(p.observed);
        predicted.extend_from_slice(p.predicted);
    }

    let mut df = df! {
        "partition" => labels,
        "observed" => observed,
        "predicted" => predicted,
    }
    .context("Failed to build predictions table")?;

    let mut file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV file: {}", output_path.display()))?;

    Ok(())
}

/// Package the report and predictions into a zip archive
///
/// The individual files are removed once the archive is written.
pub fn package_reports(report_path: &Path, predictions_path: &Path, zip_path: &Path) -> Result<()> {
    use std::io::{Read, Write};
    use ::zip::write::SimpleFileOptions;
    use ::zip::ZipWriter;

    let zip_file = std::fs::File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(::zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut add_file_to_zip = |path: &Path, default_name: &str| -> Result<()> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(default_name);
        zip.start_file(filename, options)
            .with_context(|| format!("Failed to add {} to zip", filename))?;
        let mut content = Vec::new();
        std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
        Ok(())
    };

    add_file_to_zip(report_path, "analysis.json")?;
    add_file_to_zip(predictions_path, "predictions.csv")?;

    zip.finish().context("Failed to finalize zip file")?;

    std::fs::remove_file(report_path).ok();
    std::fs::remove_file(predictions_path).ok();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_predictions_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preds.csv");

        export_predictions(
            &[
                PartitionPredictions {
                    partition: "train",
                    observed: &[1.0, 2.0],
                    predicted: &[1.1, 1.9],
                },
                PartitionPredictions {
                    partition: "test",
                    observed: &[3.0],
                    predicted: &[2.5],
                },
            ],
            &path,
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "partition,observed,predicted");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("test,3"));
    }

    #[test]
    fn test_package_reports_removes_sources() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("r.json");
        let preds = dir.path().join("p.csv");
        let zip_path = dir.path().join("bundle.zip");
        std::fs::write(&report, "{}").unwrap();
        std::fs::write(&preds, "a\n1\n").unwrap();

        package_reports(&report, &preds, &zip_path).unwrap();

        assert!(zip_path.exists());
        assert!(!report.exists());
        assert!(!preds.exists());
    }

    #[test]
    fn test_package_reports_archive_contents() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("crime_analysis.json");
        let preds = dir.path().join("crime_predictions.csv");
        let zip_path = dir.path().join("crime_analysis.zip");
        std::fs::write(&report, "{\"ok\": true}").unwrap();
        std::fs::write(&preds, "partition,observed,predicted\n").unwrap();

        package_reports(&report, &preds, &zip_path).unwrap();

        let file = std::fs::File::open(&zip_path).unwrap();
        let mut archive = ::zip::ZipArchive::new(file).unwrap();
        let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["crime_analysis.json", "crime_predictions.csv"]);

        let mut content = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("crime_analysis.json").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, "{\"ok\": true}");
    }
}
