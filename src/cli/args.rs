//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::model::ProblemKind;

/// Smogcast - clean and merge traffic, weather and pollution data, then model pm2.5
#[derive(Parser, Debug)]
#[command(name = "smogcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: clean, aggregate, merge, store, train and evaluate
    Run {
        /// JSON configuration file; defaults are used for absent keys
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read yearly weather from <DIR>/<year>.csv instead of the remote archive
        #[arg(long)]
        weather_dir: Option<PathBuf>,

        /// Algorithm name (LinearRegression, LogisticRegression, KNN, DecisionTree, RandomForest)
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Problem kind: regression or classification
        #[arg(long, value_parser = parse_problem)]
        problem: Option<ProblemKind>,

        /// Random seed for the train/test split and randomized estimators
        #[arg(long)]
        seed: Option<u64>,

        /// Fraction of rows held out for evaluation, in (0, 1)
        #[arg(long, value_parser = validate_test_ratio)]
        test_ratio: Option<f64>,
    },

    /// Train and evaluate a model on an already merged dataset
    Train {
        /// Merged monthly dataset (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = "pm2_5")]
        target: String,

        #[arg(short, long, default_value = "LinearRegression")]
        algorithm: String,

        /// Problem kind: regression or classification.
        /// Classification derives air-quality categories from the target column.
        #[arg(long, default_value = "regression", value_parser = parse_problem)]
        problem: ProblemKind,

        /// Feature columns (comma-separated); defaults to the standard candidate list
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "0.2", value_parser = validate_test_ratio)]
        test_ratio: f64,

        /// Where the fitted model is written
        #[arg(short, long, default_value = "model.json")]
        model: PathBuf,

        /// Optional JSON export of the evaluation report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Predict with a saved model
    Predict {
        /// Model file written by `train` or `run`
        #[arg(short, long)]
        model: PathBuf,

        /// Observations to predict (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the input plus a prediction column here; printed when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show shape, types, nulls, duplicates and statistics of datasets
    Profile {
        /// One or more CSV or Parquet files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Write a configuration file with every default filled in
    InitConfig {
        #[arg(default_value = "smogcast.json")]
        path: PathBuf,
    },
}

fn parse_problem(s: &str) -> Result<ProblemKind, String> {
    s.parse::<ProblemKind>().map_err(|e| e.to_string())
}

/// Validator for test_ratio
fn validate_test_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_ratio must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}
