//! Raw data collaborators
//!
//! Sources yield raw records as DataFrames. Retry and pagination live behind
//! these traits so aggregation never depends on how the data was obtained.

pub mod pollution;
pub mod weather;

pub use pollution::PollutionDocument;
pub use weather::{CsvYearCache, OpenMeteoArchive};

use std::ops::RangeInclusive;

use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::concat_chunks;

/// A source fetched one calendar year at a time
pub trait YearlySource {
    fn name(&self) -> &str;

    /// Raw daily records for `year`
    fn fetch(&self, year: i32) -> Result<DataFrame>;
}

/// A source read as a single structured document
pub trait DocumentSource {
    fn name(&self) -> &str;

    fn load(&self) -> Result<DataFrame>;
}

/// Outcome of fetching a range of years
#[derive(Debug)]
pub struct YearlyFetch {
    /// All successful years stacked in year order
    pub data: DataFrame,
    pub fetched_years: Vec<i32>,
    pub failed_years: Vec<(i32, PipelineError)>,
}

/// Fetch every year in `years` sequentially and stack the successes.
///
/// A failing year is recorded and skipped; it never affects the years
/// already fetched. Fails only when no year succeeds.
pub fn fetch_years<S: YearlySource + ?Sized>(
    source: &S,
    years: RangeInclusive<i32>,
) -> Result<YearlyFetch> {
    let mut chunks: Vec<DataFrame> = Vec::new();
    let mut fetched_years = Vec::new();
    let mut failed_years = Vec::new();

    for year in years {
        match source.fetch(year) {
            Ok(chunk) => {
                info!(source = source.name(), year, rows = chunk.height(), "year fetched");
                chunks.push(chunk);
                fetched_years.push(year);
            }
            Err(e) => {
                warn!(source = source.name(), year, error = %e, "year fetch failed");
                failed_years.push((year, e));
            }
        }
    }

    if chunks.is_empty() {
        let causes: Vec<String> = failed_years
            .iter()
            .map(|(year, e)| format!("{}: {}", year, e))
            .collect();
        return Err(PipelineError::insufficient(
            "fetch",
            format!(
                "no year could be fetched from {} ({})",
                source.name(),
                causes.join("; ")
            ),
        ));
    }

    Ok(YearlyFetch {
        data: concat_chunks(&chunks)?,
        fetched_years,
        failed_years,
    })
}
