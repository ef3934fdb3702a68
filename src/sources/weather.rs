//! Daily weather from the ERA5 archive, one request per year

use std::path::PathBuf;
use std::time::Duration;

use polars::prelude::*;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::pipeline::load_dataset;

use super::YearlySource;

pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/era5";

const DAILY_VARIABLES: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum";

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
}

/// Parse the archive's columnar `daily` object into a DataFrame.
pub fn parse_archive_json(body: &str) -> Result<DataFrame> {
    let response: ArchiveResponse = serde_json::from_str(body)?;
    let daily = response.daily;
    let n = daily.time.len();
    for (name, len) in [
        ("temperature_2m_max", daily.temperature_2m_max.len()),
        ("temperature_2m_min", daily.temperature_2m_min.len()),
        ("precipitation_sum", daily.precipitation_sum.len()),
    ] {
        if len != n {
            return Err(PipelineError::schema_mismatch(
                "weather",
                name,
                &format!("{} values", n),
                format!("{} values", len),
            ));
        }
    }

    Ok(df! {
        "time" => daily.time,
        "temperature_2m_max" => daily.temperature_2m_max,
        "temperature_2m_min" => daily.temperature_2m_min,
        "precipitation_sum" => daily.precipitation_sum,
    }?)
}

/// Blocking client for the ERA5 daily archive at a fixed location
pub struct OpenMeteoArchive {
    client: reqwest::blocking::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
}

impl OpenMeteoArchive {
    pub fn new(base_url: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            latitude,
            longitude,
        })
    }
}

impl YearlySource for OpenMeteoArchive {
    fn name(&self) -> &str {
        "weather"
    }

    fn fetch(&self, year: i32) -> Result<DataFrame> {
        let start = format!("{}-01-01", year);
        let end = format!("{}-12-31", year);
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("daily", DAILY_VARIABLES.to_string()),
                ("start_date", start),
                ("end_date", end),
                ("timezone", "auto".to_string()),
            ])
            .send()?
            .error_for_status()?
            .text()?;
        parse_archive_json(&body)
    }
}

/// Yearly weather chunks stored as `<dir>/<year>.csv`
pub struct CsvYearCache {
    dir: PathBuf,
}

impl CsvYearCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir.join(format!("{}.csv", year))
    }
}

impl YearlySource for CsvYearCache {
    fn name(&self) -> &str {
        "weather"
    }

    fn fetch(&self, year: i32) -> Result<DataFrame> {
        load_dataset(&self.path_for(year), &format!("weather {}", year))
    }
}
