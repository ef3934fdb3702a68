use std::fs;
use std::path::PathBuf;

use polars::prelude::*;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::pipeline::{MONTH, YEAR};

use super::DocumentSource;

/// One monthly record of the pollution document
#[derive(Debug, Deserialize)]
struct PollutionRecord {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Month")]
    month: i32,
    pm10: Option<f64>,
    pm2_5: Option<f64>,
    #[serde(rename = "CO")]
    co: Option<f64>,
    #[serde(rename = "NO2")]
    no2: Option<f64>,
    #[serde(rename = "O3")]
    o3: Option<f64>,
}

/// Parse a JSON array of monthly pollution records.
pub fn parse_pollution_json(body: &str) -> Result<DataFrame> {
    let records: Vec<PollutionRecord> = serde_json::from_str(body)?;

    if let Some((row, bad)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| !(1..=12).contains(&r.month))
    {
        return Err(PipelineError::schema_mismatch(
            "pollution",
            MONTH,
            "month in 1..=12",
            format!("{} at row {}", bad.month, row),
        ));
    }

    Ok(df! {
        YEAR => records.iter().map(|r| r.year).collect::<Vec<_>>(),
        MONTH => records.iter().map(|r| r.month).collect::<Vec<_>>(),
        "pm10" => records.iter().map(|r| r.pm10).collect::<Vec<_>>(),
        "pm2_5" => records.iter().map(|r| r.pm2_5).collect::<Vec<_>>(),
        "CO" => records.iter().map(|r| r.co).collect::<Vec<_>>(),
        "NO2" => records.iter().map(|r| r.no2).collect::<Vec<_>>(),
        "O3" => records.iter().map(|r| r.o3).collect::<Vec<_>>(),
    }?)
}

/// Pollution readings stored as a JSON document on disk
pub struct PollutionDocument {
    path: PathBuf,
}

impl PollutionDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for PollutionDocument {
    fn name(&self) -> &str {
        "pollution"
    }

    fn load(&self) -> Result<DataFrame> {
        if !self.path.exists() {
            return Err(PipelineError::SourceNotFound {
                source_name: self.name().to_string(),
                path: self.path.clone(),
            });
        }
        parse_pollution_json(&fs::read_to_string(&self.path)?)
    }
}
