//! Held-out evaluation report
//!
//! Rendered as a table for the terminal and exported as JSON together with
//! the run metadata needed to reproduce it.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use serde::Serialize;

use crate::model::{Algorithm, Metrics, ModelSpec, PreparedSummary, ProblemKind};

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationMetadata {
    pub timestamp: String,
    pub smogcast_version: String,
    pub problem: ProblemKind,
    pub algorithm: Option<Algorithm>,
    pub target: String,
    pub features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    pub test_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub metadata: EvaluationMetadata,
    pub metrics: Metrics,
}

impl EvaluationReport {
    pub fn new(
        spec: &ModelSpec,
        prepared: &PreparedSummary,
        metrics: Metrics,
        seed: u64,
        test_ratio: f64,
    ) -> Self {
        Self {
            metadata: EvaluationMetadata {
                timestamp: Utc::now().to_rfc3339(),
                smogcast_version: env!("CARGO_PKG_VERSION").to_string(),
                problem: spec.kind,
                algorithm: spec.algorithm(),
                target: spec.target.clone(),
                features: spec.features.clone(),
                train_rows: prepared.train_rows,
                test_rows: prepared.test_rows,
                seed,
                test_ratio,
            },
            metrics,
        }
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);

        match &self.metrics {
            Metrics::Regression(m) => {
                table.set_header(vec![
                    Cell::new("Metric").add_attribute(Attribute::Bold),
                    Cell::new("Value").add_attribute(Attribute::Bold),
                ]);
                table.add_row(vec![Cell::new("Mean Squared Error"), Cell::new(format!("{:.2}", m.mse))]);
                table.add_row(vec![
                    Cell::new("R²"),
                    Cell::new(format!("{:.2}", m.r2)).fg(r2_color(m.r2)),
                ]);
                table.add_row(vec![Cell::new("Held-out rows"), Cell::new(m.n_samples)]);
            }
            Metrics::Classification(m) => {
                table.set_header(vec![
                    Cell::new("Class").add_attribute(Attribute::Bold),
                    Cell::new("Precision").add_attribute(Attribute::Bold),
                    Cell::new("Recall").add_attribute(Attribute::Bold),
                    Cell::new("F1").add_attribute(Attribute::Bold),
                    Cell::new("Support").add_attribute(Attribute::Bold),
                ]);
                for c in &m.per_class {
                    table.add_row(vec![
                        Cell::new(&c.label),
                        Cell::new(format!("{:.2}", c.precision)),
                        Cell::new(format!("{:.2}", c.recall)),
                        Cell::new(format!("{:.2}", c.f1)),
                        Cell::new(c.support),
                    ]);
                }
                for (name, avg) in [("macro avg", &m.macro_avg), ("weighted avg", &m.weighted_avg)] {
                    table.add_row(vec![
                        Cell::new(name).add_attribute(Attribute::Italic),
                        Cell::new(format!("{:.2}", avg.precision)),
                        Cell::new(format!("{:.2}", avg.recall)),
                        Cell::new(format!("{:.2}", avg.f1)),
                        Cell::new(m.n_samples),
                    ]);
                }
                table.add_row(vec![
                    Cell::new("accuracy").add_attribute(Attribute::Bold),
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(format!("{:.2}", m.accuracy))
                        .fg(Color::Green)
                        .add_attribute(Attribute::Bold),
                    Cell::new(m.n_samples),
                ]);
            }
        }
        table
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

fn r2_color(r2: f64) -> Color {
    if r2 >= 0.7 {
        Color::Green
    } else if r2 >= 0.3 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Write the evaluation report to a JSON file
pub fn export_evaluation_report(report: &EvaluationReport, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize evaluation report to JSON")?;
    std::fs::write(output_path, json).with_context(|| {
        format!("Failed to write evaluation report to {}", output_path.display())
    })?;
    Ok(())
}
