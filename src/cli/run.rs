//! Full pipeline run
//!
//! Stages run in order and each returns a new dataset. A failed stage is
//! recorded and every stage depending on its output is skipped; the run
//! itself only errors on problems outside any stage.

use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{error, warn};

use crate::config::PipelineConfig;
use crate::model::{Model, ModelSpec, ProblemKind};
use crate::pipeline::{
    load_dataset, merge_monthly, save_dataset, CleaningRules, TemporalAggregator,
};
use crate::report::{export_evaluation_report, EvaluationReport, RunSummary};
use crate::sources::{
    fetch_years, CsvYearCache, DocumentSource, OpenMeteoArchive, PollutionDocument, YearlySource,
};
use crate::storage::{FileTableStore, TableSink};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_info, print_step_header,
    print_step_time, print_success, print_warning,
};

const EVALUATION_STAGE: &str = "evaluation report";

/// Run one stage, recording its outcome. `None` means the stage failed.
fn run_stage<T>(
    summary: &mut RunSummary,
    name: &str,
    stage: impl FnOnce() -> crate::error::Result<(T, usize)>,
) -> Option<T> {
    let start = Instant::now();
    let outcome = stage();
    let elapsed = start.elapsed();
    match outcome {
        Ok((value, rows)) => {
            summary.produced(name, rows, elapsed);
            print_success(&format!("{} produced {} rows", name, rows));
            print_step_time(elapsed);
            Some(value)
        }
        Err(e) => {
            error!(stage = name, error = %e, "stage failed");
            print_warning(&format!("{} failed: {}", name, e));
            summary.failed(name, &e, elapsed);
            None
        }
    }
}

/// Persist `df` as `table`, recording the outcome as its own stage.
fn store_table(
    summary: &mut RunSummary,
    store: &mut Option<FileTableStore>,
    df: &DataFrame,
    table: &str,
) {
    let name = format!("store {}", table);
    let Some(store) = store.as_mut() else {
        summary.skipped(&name, "storage unavailable");
        return;
    };
    run_stage(summary, &name, || {
        store.create_table_for_schema(df, table)?;
        let rows = store.bulk_insert(df, table)?;
        Ok(((), rows))
    });
}

/// Execute every stage described by `config`.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary> {
    config.validate().context("Invalid configuration")?;
    let mut summary = RunSummary::new();

    let mut store = match FileTableStore::open(&config.storage_dir) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, dir = %config.storage_dir.display(), "storage unavailable");
            print_warning(&format!("Storage unavailable: {}", e));
            None
        }
    };

    // Step 1: traffic counts
    print_step_header(1, "Traffic Counts");
    let traffic = run_stage(&mut summary, "traffic", || {
        let raw = load_dataset(&config.traffic_path, "traffic")?;
        let mut cleaned = CleaningRules::traffic().apply(&raw)?;
        save_dataset(&mut cleaned, &config.cleaned_path("traffic"))?;
        let rows = cleaned.height();
        Ok((cleaned, rows))
    });
    if let Some(df) = &traffic {
        store_table(&mut summary, &mut store, df, &config.traffic_table);
    }

    // Step 2: weather, fetched per year then reduced to months
    print_step_header(2, "Monthly Weather");
    let weather = run_stage(&mut summary, "weather", || {
        let source: Box<dyn YearlySource> = match &config.weather_dir {
            Some(dir) => Box::new(CsvYearCache::new(dir)),
            None => Box::new(OpenMeteoArchive::new(
                config.base_url.clone(),
                config.latitude,
                config.longitude,
            )?),
        };
        let spinner = create_spinner(&format!(
            "Fetching weather {}..={}",
            config.start_year, config.end_year
        ));
        let fetched = fetch_years(source.as_ref(), config.years())?;
        if fetched.failed_years.is_empty() {
            finish_with_success(
                &spinner,
                &format!("{} year(s) fetched", fetched.fetched_years.len()),
            );
        } else {
            let failed: Vec<String> = fetched
                .failed_years
                .iter()
                .map(|(year, _)| year.to_string())
                .collect();
            finish_with_warning(
                &spinner,
                &format!("years without data: {}", failed.join(", ")),
            );
        }

        let mut monthly = TemporalAggregator::weather().aggregate(&fetched.data)?;
        save_dataset(&mut monthly, &config.cleaned_path("weather"))?;
        let rows = monthly.height();
        Ok((monthly, rows))
    });
    if let Some(df) = &weather {
        store_table(&mut summary, &mut store, df, &config.weather_table);
    }

    // Step 3: pollution
    print_step_header(3, "Monthly Pollution");
    let pollution = run_stage(&mut summary, "pollution", || {
        let raw = PollutionDocument::new(&config.pollution_path).load()?;
        let mut monthly = TemporalAggregator::pollution().aggregate(&raw)?;
        save_dataset(&mut monthly, &config.cleaned_path("pollution"))?;
        let rows = monthly.height();
        Ok((monthly, rows))
    });
    if let Some(df) = &pollution {
        store_table(&mut summary, &mut store, df, &config.pollution_table);
    }

    // Step 4: merge
    print_step_header(4, "Merge");
    let merged = match (&weather, &pollution) {
        (Some(weather), Some(pollution)) => run_stage(&mut summary, "merge", || {
            let mut merged = merge_monthly(&[weather, pollution])?;
            save_dataset(&mut merged, &config.merged_path())?;
            let rows = merged.height();
            Ok((merged, rows))
        }),
        _ => {
            print_info("Skipped: weather or pollution aggregate unavailable");
            summary.skipped("merge", "weather or pollution aggregate unavailable");
            None
        }
    };
    if let Some(df) = &merged {
        store_table(&mut summary, &mut store, df, &config.merged_table);
    }

    // Step 5: model
    print_step_header(5, "Model");
    match &merged {
        Some(df) => {
            let trained = run_stage(&mut summary, "model", || {
                let (spec, report) = train_and_evaluate(df, config)?;
                println!();
                for line in report.to_table().to_string().lines() {
                    println!("    {}", line);
                }
                let rows = report.metadata.train_rows + report.metadata.test_rows;
                Ok(((spec, report), rows))
            });
            if let Some((_, report)) = trained {
                let path = config.output_dir.join("evaluation.json");
                let start = Instant::now();
                match export_evaluation_report(&report, &path) {
                    Ok(()) => {
                        summary.produced(EVALUATION_STAGE, 1, start.elapsed());
                        print_info(&format!("Evaluation report written to {}", path.display()));
                    }
                    Err(e) => {
                        error!(stage = EVALUATION_STAGE, error = %e, "stage failed");
                        print_warning(&format!("{} failed: {:#}", EVALUATION_STAGE, e));
                        summary.failed(EVALUATION_STAGE, format!("{:#}", e), start.elapsed());
                    }
                }
            }
        }
        None => {
            print_info("Skipped: merged dataset unavailable");
            summary.skipped("model", "merged dataset unavailable");
        }
    }

    Ok(summary)
}

/// Prepare, train, evaluate and save a model for `df` as configured.
///
/// Classification derives the air-quality category from the configured
/// target before preparing.
pub fn train_and_evaluate(
    df: &DataFrame,
    config: &PipelineConfig,
) -> crate::error::Result<(ModelSpec, EvaluationReport)> {
    let mut model = Model::new(df, config.problem, config.target.clone())
        .with_split(config.seed, config.test_ratio);
    if config.problem == ProblemKind::Classification {
        model.categorize_target(&config.target)?;
    }

    let prepared = model.prepare(&config.features)?;
    model.train_named(&config.algorithm)?;
    let metrics = model.evaluate()?;
    model.save(&config.model_path)?;

    let report = EvaluationReport::new(
        model.spec(),
        &prepared,
        metrics,
        config.seed,
        config.test_ratio,
    );
    Ok((model.into_spec(), report))
}
