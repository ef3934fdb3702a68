//! Benchmarks for monthly aggregation and model training
//!
//! Run with: cargo bench --bench training_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use smogcast::model::{Algorithm, Model, ProblemKind};
use smogcast::pipeline::TemporalAggregator;

/// Daily archive records covering `years` full years from 2000
fn generate_daily_weather(years: i32, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut time = Vec::new();
    for year in 2000..2000 + years {
        for month in 1..=12 {
            for day in 1..=28 {
                time.push(format!("{}-{:02}-{:02}", year, month, day));
            }
        }
    }
    let n = time.len();
    let tmax: Vec<f64> = (0..n).map(|_| 24.0 + rng.gen::<f64>() * 8.0).collect();
    let tmin: Vec<f64> = tmax.iter().map(|t| t - 6.0 - rng.gen::<f64>() * 4.0).collect();
    let precip: Vec<f64> = (0..n)
        .map(|_| if rng.gen::<f64>() < 0.6 { 0.0 } else { rng.gen::<f64>() * 30.0 })
        .collect();

    df! {
        "time" => time,
        "temperature_2m_max" => tmax,
        "temperature_2m_min" => tmin,
        "precipitation_sum" => precip,
    }
    .expect("Failed to create DataFrame")
}

/// Merged monthly rows with a noisy linear pm2_5 target
fn generate_merged(n_rows: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let pm10: Vec<f64> = (0..n_rows).map(|_| 15.0 + rng.gen::<f64>() * 40.0).collect();
    let tmax: Vec<f64> = (0..n_rows).map(|_| 24.0 + rng.gen::<f64>() * 8.0).collect();
    let precip: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 200.0).collect();
    let pm25: Vec<f64> = pm10
        .iter()
        .zip(&tmax)
        .map(|(p, t)| 0.5 * p + 0.2 * t + rng.gen::<f64>() * 2.0 - 1.0)
        .collect();

    df! {
        "Year" => (0..n_rows).map(|i| 2000 + (i / 12) as i32).collect::<Vec<i32>>(),
        "Month" => (0..n_rows).map(|i| (i % 12) as i32 + 1).collect::<Vec<i32>>(),
        "TempMax" => tmax,
        "Precipitation" => precip,
        "pm10" => pm10,
        "pm2_5" => pm25,
    }
    .expect("Failed to create DataFrame")
}

fn benchmark_weather_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("weather_aggregation");
    group.sample_size(30);

    for years in [1, 5, 20] {
        let daily = generate_daily_weather(years, 42);
        let aggregator = TemporalAggregator::weather();
        group.throughput(Throughput::Elements(daily.height() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(years), &daily, |b, daily| {
            b.iter(|| {
                let _ = aggregator.aggregate(black_box(daily));
            });
        });
    }

    group.finish();
}

fn benchmark_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    for n_rows in [120, 600] {
        let df = generate_merged(n_rows, 7);
        group.throughput(Throughput::Elements(n_rows as u64));

        for algorithm in [
            Algorithm::LinearRegression,
            Algorithm::Knn,
            Algorithm::DecisionTree,
            Algorithm::RandomForest,
        ] {
            let mut model = Model::new(&df, ProblemKind::Regression, "pm2_5");
            model.prepare(&[]).expect("Failed to prepare data");

            group.bench_function(BenchmarkId::new(algorithm.name(), n_rows), |b| {
                b.iter(|| {
                    let _ = model.train(black_box(algorithm));
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_weather_aggregation, benchmark_training);
criterion_main!(benches);
