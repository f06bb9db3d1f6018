//! Console summary of a pruning run

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{FitMetrics, GlmFit, PValueRemoval, RemovalReason, VifRemoval};

/// Counts and timings collected while the pipeline runs
#[derive(Debug, Default)]
pub struct AnalysisSummary {
    pub initial_features: usize,
    pub final_features: usize,
    pub capped_values: usize,
    pub dropped_vif: Vec<String>,
    pub dropped_significance: Vec<String>,
    pub load_time: Duration,
    pub capping_time: Duration,
    pub vif_time: Duration,
    pub significance_time: Duration,
    pub evaluation_time: Duration,
}

impl AnalysisSummary {
    pub fn new(initial_features: usize) -> Self {
        Self {
            initial_features,
            final_features: initial_features,
            ..Default::default()
        }
    }

    pub fn add_vif_drops(&mut self, removals: &[VifRemoval]) {
        self.final_features -= removals.len();
        self.dropped_vif = removals.iter().map(|r| r.feature.clone()).collect();
    }

    pub fn add_significance_drops(&mut self, removals: &[PValueRemoval]) {
        self.final_features -= removals.len();
        self.dropped_significance = removals.iter().map(|r| r.feature.clone()).collect();
    }

    pub fn total_time(&self) -> Duration {
        self.load_time + self.capping_time + self.vif_time + self.significance_time + self.evaluation_time
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("PRUNING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Initial Features"),
            Cell::new(self.initial_features),
        ]);
        table.add_row(vec![
            Cell::new("✂️  Values Capped"),
            Cell::new(self.capped_values),
        ]);
        table.add_row(vec![
            Cell::new("🔗 Dropped (VIF)"),
            count_cell(self.dropped_vif.len()),
        ]);
        table.add_row(vec![
            Cell::new("📉 Dropped (p-value)"),
            count_cell(self.dropped_significance.len()),
        ]);
        table.add_row(vec![
            Cell::new("✅ Final Features"),
            Cell::new(self.final_features)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("⏱️  Total Time"),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64())),
        ]);

        print_indented(&table);
    }
}

fn count_cell(count: usize) -> Cell {
    Cell::new(count).fg(if count == 0 { Color::White } else { Color::Red })
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn format_p_value(p: Option<f64>) -> String {
    match p {
        Some(p) if p < 1e-4 => format!("{:.2e}", p),
        Some(p) => format!("{:.4}", p),
        None => "NaN".to_string(),
    }
}

/// Table of features removed by the VIF pruner
pub fn display_vif_removals(removals: &[VifRemoval]) {
    if removals.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "Feature", "VIF"]);
    for r in removals {
        let vif = if r.vif.is_infinite() {
            "inf".to_string()
        } else {
            format!("{:.3}", r.vif)
        };
        table.add_row(vec![Cell::new(r.iteration), Cell::new(&r.feature), Cell::new(vif)]);
    }
    print_indented(&table);
}

/// Table of features removed by the significance pruner
pub fn display_pvalue_removals(removals: &[PValueRemoval]) {
    if removals.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "Feature", "p-value", "Reason"]);
    for r in removals {
        let reason = match r.reason {
            RemovalReason::AboveThreshold => "above threshold",
            RemovalReason::UndefinedPValue => "undefined p-value",
        };
        table.add_row(vec![
            Cell::new(r.iteration),
            Cell::new(&r.feature),
            Cell::new(format_p_value(r.p_value)),
            Cell::new(reason),
        ]);
    }
    print_indented(&table);
}

/// Final GLM coefficient table
pub fn display_coefficients(fit: &GlmFit) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Term").add_attribute(Attribute::Bold),
        Cell::new("Estimate").add_attribute(Attribute::Bold),
        Cell::new("Std. Error").add_attribute(Attribute::Bold),
        Cell::new("Statistic").add_attribute(Attribute::Bold),
        Cell::new("p-value").add_attribute(Attribute::Bold),
    ]);
    for c in std::iter::once(&fit.intercept).chain(fit.coefficients.iter()) {
        table.add_row(vec![
            Cell::new(&c.name),
            Cell::new(format!("{:.6}", c.estimate)),
            Cell::new(format!("{:.6}", c.std_error)),
            Cell::new(format!("{:.3}", c.statistic)),
            Cell::new(format_p_value(Some(c.p_value).filter(|p| !p.is_nan()))),
        ]);
    }
    print_indented(&table);
}

/// Train/test metrics side by side
pub fn display_metrics(train: &FitMetrics, test: &FitMetrics) {
    println!();
    println!(
        "    {} {}",
        style("📈").cyan(),
        style("MODEL PERFORMANCE").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Partition").add_attribute(Attribute::Bold),
        Cell::new("n").add_attribute(Attribute::Bold),
        Cell::new("RMSE").add_attribute(Attribute::Bold),
        Cell::new("R²").add_attribute(Attribute::Bold),
        Cell::new("Adjusted R²").add_attribute(Attribute::Bold),
    ]);
    for (label, m) in [("Train", train), ("Test", test)] {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(m.n),
            Cell::new(format!("{:.5}", m.rmse)),
            Cell::new(format!("{:.5}", m.r_squared)).fg(Color::Cyan),
            Cell::new(format!("{:.5}", m.adj_r_squared)).fg(Color::Cyan),
        ]);
    }
    print_indented(&table);
}
