//! Reduction of daily series to (Year, Month) granularity

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

use super::cleaner::has_column;

/// Join key column holding the calendar year
pub const YEAR: &str = "Year";
/// Join key column holding the calendar month (1-12)
pub const MONTH: &str = "Month";

const STAGE: &str = "aggregate";

/// Per-column reduction applied inside each (Year, Month) group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Mean,
    Sum,
    Min,
    Max,
}

/// One output column of a monthly aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub output: String,
    pub source: String,
    pub reduction: Reduction,
}

impl Aggregation {
    fn expr(&self) -> Expr {
        let base = col(self.source.as_str());
        let reduced = match self.reduction {
            Reduction::Mean => base.mean(),
            Reduction::Sum => base.sum(),
            Reduction::Min => base.min(),
            Reduction::Max => base.max(),
        };
        reduced.alias(self.output.as_str())
    }
}

/// Groups a dataset by (Year, Month) and reduces each declared column.
///
/// With a date column, Year and Month are derived from it; without one the
/// dataset must already carry the key columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalAggregator {
    pub date_column: Option<String>,
    pub aggregations: Vec<Aggregation>,
}

impl TemporalAggregator {
    /// Aggregator deriving the keys from `date_column`
    pub fn by_date(date_column: impl Into<String>) -> Self {
        Self {
            date_column: Some(date_column.into()),
            aggregations: Vec::new(),
        }
    }

    /// Aggregator for data already keyed by Year and Month
    pub fn keyed() -> Self {
        Self {
            date_column: None,
            aggregations: Vec::new(),
        }
    }

    pub fn reduce(
        mut self,
        output: impl Into<String>,
        source: impl Into<String>,
        reduction: Reduction,
    ) -> Self {
        self.aggregations.push(Aggregation {
            output: output.into(),
            source: source.into(),
            reduction,
        });
        self
    }

    pub fn mean(self, output: impl Into<String>, source: impl Into<String>) -> Self {
        self.reduce(output, source, Reduction::Mean)
    }

    /// Monthly means of the daily archive variables
    pub fn weather() -> Self {
        Self::by_date("time")
            .mean("TempMax", "temperature_2m_max")
            .mean("TempMin", "temperature_2m_min")
            .mean("Precipitation", "precipitation_sum")
    }

    /// Monthly means of the pollutant concentrations
    pub fn pollution() -> Self {
        let mut agg = Self::keyed();
        for pollutant in ["pm10", "pm2_5", "CO", "NO2", "O3"] {
            agg = agg.mean(pollutant, pollutant);
        }
        agg
    }

    /// Produce one row per (Year, Month), in order of first appearance.
    pub fn aggregate(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut keyed = match &self.date_column {
            Some(date_column) => with_year_month(df, date_column)?,
            None => normalize_keys(df)?,
        };

        for source in self.sources() {
            let values = numeric_values(&keyed, source)?;
            keyed.with_column(Column::new(source.into(), values))?;
        }

        let exprs: Vec<Expr> = self.aggregations.iter().map(Aggregation::expr).collect();
        let out = keyed
            .lazy()
            .group_by_stable([col(YEAR), col(MONTH)])
            .agg(exprs)
            .collect()?;

        debug!(rows_in = df.height(), groups = out.height(), "monthly aggregation complete");
        Ok(out)
    }

    fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for agg in &self.aggregations {
            if !sources.contains(&agg.source.as_str()) {
                sources.push(agg.source.as_str());
            }
        }
        sources
    }
}

/// Stack yearly chunks into one frame before grouping.
///
/// Chunks may disagree on column types (an all-empty year parses as text or
/// null), so each column is cast to a type unified over every chunk first.
pub fn concat_chunks(chunks: &[DataFrame]) -> Result<DataFrame> {
    let Some(first) = chunks.first() else {
        return Err(PipelineError::insufficient(STAGE, "no chunks to concatenate"));
    };

    let mut targets: Vec<(PlSmallStr, DataType)> = Vec::with_capacity(first.width());
    for name in first.get_column_names_owned() {
        let mut columns: Vec<&Column> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let column = chunk.column(name.as_str()).map_err(|_| {
                PipelineError::schema_mismatch(STAGE, name.as_str(), "column present", "absent")
            })?;
            columns.push(column);
        }
        let dtype = unified_dtype(&columns);
        targets.push((name, dtype));
    }

    let mut stacked: Option<DataFrame> = None;
    for chunk in chunks {
        let aligned: Vec<Column> = targets
            .iter()
            .map(|(name, dtype)| -> Result<Column> { Ok(chunk.column(name.as_str())?.cast(dtype)?) })
            .collect::<Result<_>>()?;
        let aligned = DataFrame::new(aligned)?;
        match stacked.as_mut() {
            Some(df) => {
                df.vstack_mut(&aligned)?;
            }
            None => stacked = Some(aligned),
        }
    }
    Ok(stacked.unwrap_or_default())
}

/// Common type of one column across chunks.
///
/// Chunks holding only nulls carry no type information and are ignored. If
/// every chunk is empty the column becomes Float64; numeric types that
/// disagree widen to Float64; any other disagreement falls back to text.
fn unified_dtype(columns: &[&Column]) -> DataType {
    let informative: Vec<&DataType> = columns
        .iter()
        .filter(|c| c.null_count() < c.len())
        .map(|c| c.dtype())
        .collect();
    match informative.first() {
        None => DataType::Float64,
        Some(first) if informative.iter().all(|d| d == first) => (*first).clone(),
        Some(_) if informative.iter().all(|d| d.is_primitive_numeric()) => DataType::Float64,
        Some(_) => DataType::String,
    }
}

fn numeric_values(df: &DataFrame, source: &str) -> Result<Vec<Option<f64>>> {
    if !has_column(df, source) {
        return Err(PipelineError::schema_mismatch(STAGE, source, "numeric", "absent"));
    }
    let column = df.column(source)?;
    if !column.dtype().is_primitive_numeric() && *column.dtype() != DataType::Null {
        return Err(PipelineError::schema_mismatch(STAGE, source, "numeric", column.dtype()));
    }
    // NaN becomes null so that reductions skip it
    Ok(column
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

fn normalize_keys(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    for key in [YEAR, MONTH] {
        if !has_column(df, key) {
            return Err(PipelineError::schema_mismatch(STAGE, key, "Int32", "absent"));
        }
        let column = df.column(key)?;
        if !column.dtype().is_integer() {
            return Err(PipelineError::schema_mismatch(STAGE, key, "Int32", column.dtype()));
        }
        out.with_column(column.cast(&DataType::Int32)?)?;
    }
    Ok(out)
}

/// Add Int32 `Year` and `Month` columns derived from `date_column`.
pub fn with_year_month(df: &DataFrame, date_column: &str) -> Result<DataFrame> {
    let dates = parse_dates(df, date_column)?;
    let years: Vec<i32> = dates.iter().map(|d| d.year()).collect();
    let months: Vec<i32> = dates.iter().map(|d| d.month() as i32).collect();

    let mut out = df.clone();
    out.with_column(Column::new(YEAR.into(), years))?;
    out.with_column(Column::new(MONTH.into(), months))?;
    Ok(out)
}

fn parse_dates(df: &DataFrame, date_column: &str) -> Result<Vec<NaiveDate>> {
    if !has_column(df, date_column) {
        return Err(PipelineError::schema_mismatch(STAGE, date_column, "date", "absent"));
    }
    let column = df.column(date_column)?;
    let fail = |row: usize, value: String| PipelineError::DateParseError {
        column: date_column.to_string(),
        row,
        value,
    };

    match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(text) => parse_date_text(text).ok_or_else(|| fail(row, text.to_string())),
                None => Err(fail(row, "null".to_string())),
            })
            .collect(),
        DataType::Date | DataType::Datetime(_, _) => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or_else(|| fail(0, "epoch".into()))?;
            column
                .cast(&DataType::Date)?
                .cast(&DataType::Int32)?
                .i32()?
                .into_iter()
                .enumerate()
                .map(|(row, days)| {
                    days.and_then(|d| epoch.checked_add_signed(chrono::Duration::days(d as i64)))
                        .ok_or_else(|| fail(row, "null".to_string()))
                })
                .collect()
        }
        other => Err(PipelineError::schema_mismatch(STAGE, date_column, "date", other)),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}
