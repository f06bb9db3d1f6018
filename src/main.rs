//! regprune: Regression Feature Pruning CLI Tool
//!
//! Loads a dataset, caps IQR outliers, prunes predictors by VIF and by GLM
//! p-values, and reports RMSE / R² / Adjusted R² on a seeded train/test split.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use regprune::cli::Cli;
use regprune::pipeline::{
    cap_outliers, evaluate_model, load_dataset, prepare_numeric_frame, prune_insignificant,
    prune_multicollinear, stack_with_original, train_test_split,
};
use regprune::report::{
    display_coefficients, display_metrics, display_pvalue_removals, display_vif_removals,
    export_analysis_report, export_predictions, package_reports, AnalysisReport, AnalysisSummary,
    MetricsSection, PartitionPredictions, ReportMetadata, ReportParams, SignificanceSection,
    VifSection,
};
use regprune::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config, print_count,
    print_info, print_step_header, print_step_time, print_success, print_warning, ConfigCard,
};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let output_dir = cli
        .report_path()
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    if !output_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&output_dir)?;
    }
    let family = cli.family.to_string();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input: &cli.input,
        target: &cli.target,
        output_dir: &output_dir,
        vif_threshold: cli.vif_threshold,
        p_value_threshold: cli.p_value_threshold,
        train_ratio: cli.train_ratio,
        seed: cli.seed,
        family: &family,
    });

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading dataset...");
    let raw = load_dataset(&cli.input, &cli.load_options())?;
    finish_with_success(&spinner, "Dataset loaded");

    let prepared = prepare_numeric_frame(&raw, &cli.target, &cli.drop_columns)?;
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", prepared.frame.height());
    println!("      Numeric features: {}", prepared.features.len());
    if !prepared.non_numeric.is_empty() {
        print_info(&format!(
            "Skipped {} non-numeric column(s): {}",
            prepared.non_numeric.len(),
            prepared.non_numeric.join(", ")
        ));
    }

    let mut summary = AnalysisSummary::new(prepared.features.len());
    summary.load_time = step_start.elapsed();
    print_step_time(summary.load_time);

    // Step 2: Outlier capping
    print_step_header(2, "Outlier Capping");
    let step_start = Instant::now();
    let cap_columns = if cli.cap_columns.is_empty() {
        prepared.features.names().to_vec()
    } else {
        cli.cap_columns.clone()
    };
    let capping = cap_outliers(&prepared.frame, &cap_columns)?;
    summary.capped_values = capping.columns.iter().map(|c| c.total_capped()).sum();
    print_count(
        "value(s) capped",
        summary.capped_values,
        Some(&format!("(across {} columns, 1.5 x IQR)", capping.columns.len())),
    );

    let analysis_frame = if cli.stack_uncapped {
        print_warning(
            "Stacking uncapped and capped tables: every row appears twice in the analysis",
        );
        log::warn!("--stack-uncapped duplicates all observations");
        stack_with_original(&prepared.frame, &capping.frame)?
    } else {
        capping.frame.clone()
    };
    summary.capping_time = step_start.elapsed();
    print_step_time(summary.capping_time);

    // Step 3: Multicollinearity pruning
    print_step_header(3, "Multicollinearity Pruning (VIF)");
    let step_start = Instant::now();
    let vif = prune_multicollinear(
        &analysis_frame,
        &prepared.features,
        &cli.target,
        cli.vif_threshold,
    )?;
    if vif.removed.is_empty() {
        print_info("No features exceed the VIF threshold");
    } else {
        print_count(
            "feature(s) with high VIF",
            vif.removed.len(),
            Some(&format!("(>{:.2})", cli.vif_threshold)),
        );
        display_vif_removals(&vif.removed);
    }
    println!("      OLS R² on {} features: {:.4}", vif.features.len(), vif.model.r_squared);
    summary.add_vif_drops(&vif.removed);
    summary.vif_time = step_start.elapsed();
    print_step_time(summary.vif_time);

    // Step 4: Significance pruning on the training partition
    print_step_header(4, "Significance Pruning (GLM)");
    let step_start = Instant::now();
    let split = train_test_split(&analysis_frame, cli.train_ratio, cli.seed)?;
    println!(
        "      Split: {} train / {} test rows",
        split.train_rows.len(),
        split.test_rows.len()
    );
    let options = cli.significance_options();
    let significance = prune_insignificant(&split.train, &vif.features, &cli.target, &options)?;
    if significance.removed.is_empty() {
        print_info("All remaining features are significant");
    } else {
        print_count(
            "insignificant feature(s)",
            significance.removed.len(),
            Some(&format!("(p>{:.3})", cli.p_value_threshold)),
        );
        display_pvalue_removals(&significance.removed);
    }
    display_coefficients(&significance.model);
    summary.add_significance_drops(&significance.removed);
    summary.significance_time = step_start.elapsed();
    print_step_time(summary.significance_time);

    // Step 5: Evaluation and export
    print_step_header(5, "Evaluate & Save");
    let step_start = Instant::now();
    let train_eval = evaluate_model(&significance.model, &split.train, &cli.target)?;
    let test_eval = evaluate_model(&significance.model, &split.test, &cli.target)?;

    let report = AnalysisReport {
        metadata: ReportMetadata::new(&ReportParams {
            input_file: &cli.input.display().to_string(),
            target_column: &cli.target,
            vif_threshold: cli.vif_threshold,
            p_value_threshold: cli.p_value_threshold,
            train_ratio: cli.train_ratio,
            seed: cli.seed,
            family: cli.family,
            stacked_uncapped: cli.stack_uncapped,
        }),
        initial_features: prepared.features.names().to_vec(),
        final_features: significance.features.names().to_vec(),
        outlier_capping: capping.columns.clone(),
        multicollinearity: VifSection {
            removed: vif.removed.clone(),
            final_vifs: vif.final_vifs.clone(),
        },
        significance: SignificanceSection {
            removed: significance.removed.clone(),
            intercept: significance.model.intercept.clone(),
            coefficients: significance.model.coefficients.clone(),
            deviance: significance.model.deviance,
            null_deviance: significance.model.null_deviance,
            converged: significance.model.converged,
        },
        metrics: MetricsSection {
            train: train_eval.metrics,
            test: test_eval.metrics,
        },
    };

    let report_path = cli.report_path();
    let predictions_path = cli.predictions_path();
    export_analysis_report(&report, &report_path)?;
    export_predictions(
        &[
            PartitionPredictions {
                partition: "train",
                observed: &train_eval.observed,
                predicted: &train_eval.predicted,
            },
            PartitionPredictions {
                partition: "test",
                observed: &test_eval.observed,
                predicted: &test_eval.predicted,
            },
        ],
        &predictions_path,
    )?;

    if cli.bundle {
        let zip_path = cli.bundle_path();
        package_reports(&report_path, &predictions_path, &zip_path)?;
        print_success(&format!("Saved {}", zip_path.display()));
    } else {
        print_success(&format!("Saved {}", report_path.display()));
        print_success(&format!("Saved {}", predictions_path.display()));
    }
    summary.evaluation_time = step_start.elapsed();
    print_step_time(summary.evaluation_time);

    display_metrics(&train_eval.metrics, &test_eval.metrics);
    summary.display();
    print_completion();

    Ok(())
}
