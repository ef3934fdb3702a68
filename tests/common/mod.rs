//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Raw toll-station export as it arrives: padded text, a lower-case station,
/// the excluded station, a sparse count column and a column to drop.
pub fn create_traffic_dataframe() -> DataFrame {
    df! {
        "Año" => [2021i64, 2021, 2021, 2021, 2021],
        "Mes" => [" Enero", "Enero ", "Febrero", " Marzo ", "Marzo"],
        "Puesto de Peaje" => ["escazu", " ALAJUELITA ", "Naranjo", "escazu", "ciudad colón"],
        "Livianos" => [Some(1200i64), None, Some(800), Some(1350), Some(990)],
        "Carga Pesada" => [Some(30.5f64), Some(12.0), None, Some(f64::NAN), Some(8.0)],
        "Cuatro Ejes" => [1i64, 2, 3, 4, 5],
    }
    .unwrap()
}

/// Daily archive records for `year`: two days in each of the first `months` months.
///
/// Values are chosen so every monthly mean is easy to state: TempMax averages
/// to `25 + month`, TempMin to `15 + month`, Precipitation to `month`.
pub fn create_weather_daily(year: i32, months: u32) -> DataFrame {
    let mut time = Vec::new();
    let mut tmax = Vec::new();
    let mut tmin = Vec::new();
    let mut precip = Vec::new();
    for month in 1..=months {
        let m = month as f64;
        for (day, offset) in [(3, -1.0), (17, 1.0)] {
            time.push(format!("{}-{:02}-{:02}", year, month, day));
            tmax.push(25.0 + m + offset);
            tmin.push(15.0 + m + offset);
            precip.push(m + offset);
        }
    }
    df! {
        "time" => time,
        "temperature_2m_max" => tmax,
        "temperature_2m_min" => tmin,
        "precipitation_sum" => precip,
    }
    .unwrap()
}

/// Monthly pollution JSON for the first `months` months of `year`.
///
/// pm2_5 follows pm10 and temperature closely so that models can fit it, and
/// spans the Good, Moderate and Unhealthy for Sensitive Groups categories.
pub fn pollution_json(year: i32, months: u32) -> String {
    let records: Vec<serde_json::Value> = (1..=months)
        .map(|month| {
            let m = month as f64;
            let pm10 = 10.0 + 6.0 * m;
            serde_json::json!({
                "Year": year,
                "Month": month,
                "pm10": pm10,
                "pm2_5": 0.5 * pm10 + 0.2 * (25.0 + m) - 5.0,
                "CO": 300.0 + 10.0 * m,
                "NO2": 12.0 + m,
                "O3": 40.0 - m,
            })
        })
        .collect();
    serde_json::to_string(&records).unwrap()
}

/// A merged monthly dataset of `n` months with a near-linear pm2_5 target
pub fn create_merged_dataframe(n: usize) -> DataFrame {
    let pm10: Vec<f64> = (0..n).map(|i| 18.0 + (i % 9) as f64 * 4.0 + (i / 9) as f64).collect();
    let tmax: Vec<f64> = (0..n).map(|i| 24.0 + (i % 5) as f64).collect();
    let tmin: Vec<f64> = tmax.iter().map(|t| t - 9.0).collect();
    let precip: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
    let pm25: Vec<f64> = pm10
        .iter()
        .zip(&tmax)
        .map(|(p, t)| 0.55 * p + 0.3 * t - 2.0)
        .collect();
    df! {
        "Year" => (0..n).map(|i| 2018 + (i / 12) as i32).collect::<Vec<i32>>(),
        "Month" => (0..n).map(|i| (i % 12) as i32 + 1).collect::<Vec<i32>>(),
        "TempMax" => tmax,
        "TempMin" => tmin,
        "Precipitation" => precip,
        "pm10" => pm10,
        "pm2_5" => pm25,
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Write `df` as `<dir>/<year>.csv`, the weather cache layout
pub fn write_weather_year(dir: &Path, year: i32, df: &mut DataFrame) {
    let mut file = std::fs::File::create(dir.join(format!("{}.csv", year))).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

/// (Year, Month) pairs of a keyed frame, in row order
pub fn month_keys(df: &DataFrame) -> Vec<(i32, i32)> {
    let years = df.column("Year").unwrap().cast(&DataType::Int32).unwrap();
    let months = df.column("Month").unwrap().cast(&DataType::Int32).unwrap();
    years
        .i32()
        .unwrap()
        .into_iter()
        .zip(months.i32().unwrap().into_iter())
        .map(|(y, m)| (y.unwrap(), m.unwrap()))
        .collect()
}

/// Float values of a column, nulls as NaN
pub fn f64_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}
