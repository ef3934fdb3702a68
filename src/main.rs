//! Smogcast: traffic, weather and pollution pipeline CLI
//!
//! `run` executes every stage from raw files to a saved model; the other
//! subcommands expose single steps.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use smogcast::cli::{
    run_init_config, run_pipeline, run_predict, run_profile, run_train, Cli, Commands,
    TrainOptions,
};
use smogcast::config::PipelineConfig;
use smogcast::utils::{print_banner, print_completion, print_config};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            weather_dir,
            algorithm,
            problem,
            seed,
            test_ratio,
        } => {
            let mut cfg = match &config {
                Some(path) => PipelineConfig::load(path)
                    .with_context(|| format!("Failed to load configuration {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            // Command-line flags override the file
            if weather_dir.is_some() {
                cfg.weather_dir = weather_dir;
            }
            if let Some(algorithm) = algorithm {
                cfg.algorithm = algorithm;
            }
            if let Some(problem) = problem {
                cfg.problem = problem;
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(test_ratio) = test_ratio {
                cfg.test_ratio = test_ratio;
            }

            print_banner(env!("CARGO_PKG_VERSION"));
            print_config(&cfg);

            let summary = run_pipeline(&cfg)?;
            summary.display();
            print_completion(summary.has_failures());
            if summary.has_failures() {
                bail!(
                    "pipeline finished with failed stages: {}",
                    summary.failed_stages().join(", ")
                );
            }
            Ok(())
        }
        Commands::Train {
            input,
            target,
            algorithm,
            problem,
            features,
            seed,
            test_ratio,
            model,
            report,
        } => run_train(&TrainOptions {
            input,
            target,
            algorithm,
            problem,
            features,
            seed,
            test_ratio,
            model,
            report,
        }),
        Commands::Predict {
            model,
            input,
            output,
        } => run_predict(&model, &input, output.as_deref()),
        Commands::Profile { inputs } => run_profile(&inputs),
        Commands::InitConfig { path } => run_init_config(&path),
    }
}
