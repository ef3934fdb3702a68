//! Handlers for the standalone subcommands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use crate::config::PipelineConfig;
use crate::model::{load_model, Prediction, ProblemKind};
use crate::pipeline::{load_dataset, save_dataset};
use crate::report::{export_evaluation_report, DatasetProfile};
use crate::utils::{
    create_progress_bar, create_spinner, finish_with_success, print_info, print_success,
};

use super::run::train_and_evaluate;

/// Options of the `train` subcommand
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub input: PathBuf,
    pub target: String,
    pub algorithm: String,
    pub problem: ProblemKind,
    pub features: Vec<String>,
    pub seed: u64,
    pub test_ratio: f64,
    pub model: PathBuf,
    pub report: Option<PathBuf>,
}

/// Train and evaluate on an already merged dataset
pub fn run_train(options: &TrainOptions) -> Result<()> {
    let config = PipelineConfig {
        target: options.target.clone(),
        algorithm: options.algorithm.clone(),
        problem: options.problem,
        features: options.features.clone(),
        seed: options.seed,
        test_ratio: options.test_ratio,
        model_path: options.model.clone(),
        ..PipelineConfig::default()
    };
    config.validate().context("Invalid training options")?;

    let spinner = create_spinner("Loading merged dataset...");
    let df = load_dataset(&options.input, "merged")
        .with_context(|| format!("Failed to load {}", options.input.display()))?;
    finish_with_success(
        &spinner,
        &format!("{} rows x {} columns", df.height(), df.width()),
    );

    let spinner = create_spinner(&format!("Training {}...", options.algorithm));
    let (_, report) = train_and_evaluate(&df, &config)?;
    finish_with_success(
        &spinner,
        &format!(
            "{} trained on {} rows",
            options.algorithm, report.metadata.train_rows
        ),
    );

    println!();
    for line in report.to_table().to_string().lines() {
        println!("    {}", line);
    }
    println!();
    print_success(&format!("Model saved to {}", options.model.display()));

    if let Some(path) = &options.report {
        export_evaluation_report(&report, path)?;
        print_info(&format!("Evaluation report written to {}", path.display()));
    }
    Ok(())
}

/// Predict with a saved model, appending a `prediction` column
pub fn run_predict(model_path: &Path, input: &Path, output: Option<&Path>) -> Result<()> {
    let spec = load_model(model_path)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    let df = load_dataset(input, "observations")
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let predictions = spec.predict(&df)?;
    let mut result = df.clone();
    result.with_column(Prediction::to_column("prediction", &predictions))?;

    match output {
        Some(path) => {
            save_dataset(&mut result, path)?;
            print_success(&format!(
                "{} prediction(s) written to {}",
                predictions.len(),
                path.display()
            ));
        }
        None => println!("{}", result),
    }
    Ok(())
}

/// Print a profile table per input file
pub fn run_profile(inputs: &[PathBuf]) -> Result<()> {
    let pb = create_progress_bar(inputs.len() as u64, "Profiling");
    let mut profiles = Vec::with_capacity(inputs.len());
    for path in inputs {
        let df = load_dataset(path, "profile input")
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        profiles.push(DatasetProfile::from_dataframe(&name, &df)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    for profile in &profiles {
        println!();
        println!(
            "    {} {}",
            style("◆").cyan().bold(),
            style(&profile.name).white().bold()
        );
        for line in profile.to_table().to_string().lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}

/// Write a configuration file with every default filled in
pub fn run_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists; refusing to overwrite", path.display());
    }
    PipelineConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    print_success(&format!("Configuration written to {}", path.display()));
    Ok(())
}
