//! Run configuration
//!
//! Every location, table name and training knob a run needs is carried here
//! and passed into the components that use it. A JSON file may override any
//! subset of the defaults.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::ProblemKind;
use crate::sources::weather::DEFAULT_ARCHIVE_URL;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw traffic-count export (CSV or Parquet)
    pub traffic_path: PathBuf,
    /// Directory of `<year>.csv` weather chunks; the remote archive is used when unset
    pub weather_dir: Option<PathBuf>,
    pub latitude: f64,
    pub longitude: f64,
    pub start_year: i32,
    pub end_year: i32,
    pub base_url: String,
    /// Monthly pollution document (JSON array)
    pub pollution_path: PathBuf,
    /// Where cleaned and merged CSV files are written
    pub output_dir: PathBuf,

    pub traffic_table: String,
    pub weather_table: String,
    pub pollution_table: String,
    pub merged_table: String,
    pub storage_dir: PathBuf,

    pub seed: u64,
    pub test_ratio: f64,
    pub algorithm: String,
    pub problem: ProblemKind,
    pub target: String,
    /// Requested features; empty means the default candidate list
    pub features: Vec<String>,
    pub model_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            traffic_path: PathBuf::from("data/raw/traffic.csv"),
            weather_dir: None,
            latitude: 9.9281,
            longitude: -84.0907,
            start_year: 2020,
            end_year: 2024,
            base_url: DEFAULT_ARCHIVE_URL.to_string(),
            pollution_path: PathBuf::from("data/raw/pollution.json"),
            output_dir: PathBuf::from("data/processed"),
            traffic_table: "FlujoVehicular".to_string(),
            weather_table: "ClimaMensual".to_string(),
            pollution_table: "ContaminacionMensual".to_string(),
            merged_table: "ClimaContaminacion".to_string(),
            storage_dir: PathBuf::from("data/warehouse"),
            seed: 42,
            test_ratio: 0.2,
            algorithm: "LinearRegression".to_string(),
            problem: ProblemKind::Regression,
            target: "pm2_5".to_string(),
            features: Vec::new(),
            model_path: PathBuf::from("data/models/model.json"),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON configuration; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::SourceNotFound {
                source_name: "config".to_string(),
                path: path.to_path_buf(),
            });
        }
        let config: PipelineConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.start_year > self.end_year {
            return Err(PipelineError::InvalidConfig(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PipelineError::InvalidConfig(format!(
                "coordinates ({}, {}) are out of range",
                self.latitude, self.longitude
            )));
        }
        let tables = [
            &self.traffic_table,
            &self.weather_table,
            &self.pollution_table,
            &self.merged_table,
        ];
        if tables.iter().any(|t| t.trim().is_empty()) {
            return Err(PipelineError::InvalidConfig(
                "table names must not be empty".to_string(),
            ));
        }
        if self.target.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "target must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    /// Output location of a cleaned dataset, e.g. `traffic_clean.csv`
    pub fn cleaned_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}_clean.csv", name))
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output_dir.join("merged.csv")
    }
}
