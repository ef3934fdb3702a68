//! Per-stage run summary

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

/// What happened to one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Produced { rows: usize },
    /// Not attempted because an input it depends on is missing
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct StageRecord {
    pub name: String,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

/// Outcome of every stage of a run, in execution order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub stages: Vec<StageRecord>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn produced(&mut self, name: &str, rows: usize, elapsed: Duration) {
        self.push(name, StageOutcome::Produced { rows }, elapsed);
    }

    pub fn skipped(&mut self, name: &str, reason: impl Into<String>) {
        self.push(
            name,
            StageOutcome::Skipped {
                reason: reason.into(),
            },
            Duration::ZERO,
        );
    }

    pub fn failed(&mut self, name: &str, error: impl ToString, elapsed: Duration) {
        self.push(
            name,
            StageOutcome::Failed {
                error: error.to_string(),
            },
            elapsed,
        );
    }

    fn push(&mut self, name: &str, outcome: StageOutcome, elapsed: Duration) {
        self.stages.push(StageRecord {
            name: name.to_string(),
            outcome,
            elapsed,
        });
    }

    pub fn outcome(&self, name: &str) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.name == name).map(|s| &s.outcome)
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_stages().is_empty()
    }

    /// Names of the failed stages, in execution order
    pub fn failed_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| matches!(s.outcome, StageOutcome::Failed { .. }))
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn total_time(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Rows / Reason").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
        ]);

        for stage in &self.stages {
            let (status, detail) = match &stage.outcome {
                StageOutcome::Produced { rows } => {
                    (Cell::new("✓ produced").fg(Color::Green), rows.to_string())
                }
                StageOutcome::Skipped { reason } => {
                    (Cell::new("- skipped").fg(Color::Yellow), reason.clone())
                }
                StageOutcome::Failed { error } => {
                    (Cell::new("✗ failed").fg(Color::Red), error.clone())
                }
            };
            table.add_row(vec![
                Cell::new(&stage.name),
                status,
                Cell::new(detail),
                Cell::new(format_duration(stage.elapsed)),
            ]);
        }

        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(""),
            Cell::new(""),
            Cell::new(format_duration(self.total_time())).add_attribute(Attribute::Bold),
        ]);
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{}m {:.1}s", d.as_secs() / 60, secs % 60.0)
    }
}
