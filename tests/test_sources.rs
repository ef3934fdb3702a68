//! Tests for raw data sources and the yearly fetch loop

use polars::prelude::*;
use smogcast::error::PipelineError;
use smogcast::pipeline::TemporalAggregator;
use smogcast::sources::pollution::parse_pollution_json;
use smogcast::sources::weather::parse_archive_json;
use smogcast::sources::{fetch_years, CsvYearCache, DocumentSource, PollutionDocument};
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_cached_years_are_stacked_in_order() {
    let dir = TempDir::new().unwrap();
    write_weather_year(dir.path(), 2021, &mut create_weather_daily(2021, 2));
    write_weather_year(dir.path(), 2022, &mut create_weather_daily(2022, 3));

    let cache = CsvYearCache::new(dir.path());
    let fetched = fetch_years(&cache, 2021..=2022).unwrap();

    assert_eq!(fetched.fetched_years, vec![2021, 2022]);
    assert!(fetched.failed_years.is_empty());
    assert_eq!(fetched.data.height(), 10);
}

#[test]
fn test_missing_year_is_recorded_not_fatal() {
    let dir = TempDir::new().unwrap();
    write_weather_year(dir.path(), 2020, &mut create_weather_daily(2020, 1));
    write_weather_year(dir.path(), 2022, &mut create_weather_daily(2022, 1));

    let fetched = fetch_years(&CsvYearCache::new(dir.path()), 2020..=2022).unwrap();
    assert_eq!(fetched.fetched_years, vec![2020, 2022]);
    assert_eq!(fetched.failed_years.len(), 1);
    let (year, error) = &fetched.failed_years[0];
    assert_eq!(*year, 2021);
    assert!(matches!(error, PipelineError::SourceNotFound { .. }));
}

#[test]
fn test_no_year_available_is_insufficient() {
    let dir = TempDir::new().unwrap();
    let err = fetch_years(&CsvYearCache::new(dir.path()), 2020..=2021).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData { .. }));
    // Each year's cause is part of the message
    let message = err.to_string();
    assert!(message.contains("2020") && message.contains("2021"), "{}", message);
}

#[test]
fn test_empty_first_year_keeps_later_years_numeric() {
    let dir = TempDir::new().unwrap();
    let mut empty_year = df! {
        "time" => ["2020-01-05", "2020-01-06"],
        "temperature_2m_max" => [None::<f64>, None],
        "temperature_2m_min" => [15.0f64, 16.0],
        "precipitation_sum" => [0.0f64, 1.0],
    }
    .unwrap();
    let mut full_year = df! {
        "time" => ["2021-01-05", "2021-01-06"],
        "temperature_2m_max" => [20.0f64, 22.0],
        "temperature_2m_min" => [15.0f64, 17.0],
        "precipitation_sum" => [2.0f64, 4.0],
    }
    .unwrap();
    write_weather_year(dir.path(), 2020, &mut empty_year);
    write_weather_year(dir.path(), 2021, &mut full_year);

    let fetched = fetch_years(&CsvYearCache::new(dir.path()), 2020..=2021).unwrap();
    assert_eq!(fetched.fetched_years, vec![2020, 2021]);
    assert_eq!(
        fetched.data.column("temperature_2m_max").unwrap().dtype(),
        &DataType::Float64
    );

    let monthly = TemporalAggregator::weather().aggregate(&fetched.data).unwrap();
    assert_eq!(month_keys(&monthly), vec![(2020, 1), (2021, 1)]);
    let tmax = f64_values(&monthly, "TempMax");
    assert!(tmax[0].is_nan());
    assert_eq!(tmax[1], 21.0);
}

#[test]
fn test_archive_response_parsing() {
    let body = r#"{
        "daily": {
            "time": ["2023-01-01", "2023-01-02"],
            "temperature_2m_max": [27.1, null],
            "temperature_2m_min": [17.0, 16.5],
            "precipitation_sum": [0.0, 3.2]
        }
    }"#;
    let df = parse_archive_json(body).unwrap();
    assert_shape(&df, 2, 4);
    assert_eq!(df.column("temperature_2m_max").unwrap().null_count(), 1);
}

#[test]
fn test_pollution_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pollution.json");
    std::fs::write(&path, pollution_json(2024, 4)).unwrap();

    let df = PollutionDocument::new(&path).load().unwrap();
    assert_shape(&df, 4, 7);
    assert_has_columns(&df, &["Year", "Month", "pm10", "pm2_5", "CO", "NO2", "O3"]);
}

#[test]
fn test_pollution_document_missing() {
    let err = PollutionDocument::new("/nonexistent/pollution.json")
        .load()
        .unwrap_err();
    assert!(matches!(err, PipelineError::SourceNotFound { .. }));
}

#[test]
fn test_pollution_month_out_of_range() {
    let body = r#"[{"Year": 2024, "Month": 13, "pm10": 1.0, "pm2_5": 1.0, "CO": 1.0, "NO2": 1.0, "O3": 1.0}]"#;
    assert!(matches!(
        parse_pollution_json(body),
        Err(PipelineError::SchemaMismatch { .. })
    ));
}
