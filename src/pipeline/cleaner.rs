//! Declarative cleaning of a single tabular source
//!
//! A [`CleaningRules`] value is an ordered list of optional rules. Each rule
//! names the columns it needs and is skipped when they are absent, so one
//! rule set tolerates schema drift between exports of the same source. A rule
//! whose column exists with the wrong type is an error, never a skip.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

use super::missing::{columns_above_threshold, null_ratios};

const STAGE: &str = "clean";

/// A single cleaning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CleaningRule {
    /// Strip leading/trailing whitespace from text columns
    Trim { columns: Vec<String> },
    /// Title-case a categorical text column ("san josé" -> "San José")
    TitleCase { column: String },
    /// Drop rows whose `column` equals `value`
    Exclude { column: String, value: String },
    /// Remove the named columns
    DropColumns { columns: Vec<String> },
    /// Remove columns whose null ratio is above `max_null_ratio`
    DropSparse { max_null_ratio: f64 },
    /// Rename a raw column to its canonical name
    Rename { from: String, to: String },
    /// Replace residual nulls: numeric with 0, text with "", boolean with false.
    /// Columns holding no values at all are removed instead.
    FillNulls,
}

/// Ordered rule set for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningRules {
    pub source: String,
    pub rules: Vec<CleaningRule>,
}

impl CleaningRules {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rules: Vec::new(),
        }
    }

    pub fn trim<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.rules.push(CleaningRule::Trim {
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn title_case(mut self, column: impl Into<String>) -> Self {
        self.rules.push(CleaningRule::TitleCase {
            column: column.into(),
        });
        self
    }

    pub fn exclude(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.rules.push(CleaningRule::Exclude {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn drop_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.rules.push(CleaningRule::DropColumns {
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn drop_sparse(mut self, max_null_ratio: f64) -> Self {
        self.rules.push(CleaningRule::DropSparse { max_null_ratio });
        self
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rules.push(CleaningRule::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn fill_nulls(mut self) -> Self {
        self.rules.push(CleaningRule::FillNulls);
        self
    }

    /// Rules for the toll-station vehicle count export.
    pub fn traffic() -> Self {
        Self::new("traffic")
            .trim(["Mes"])
            .trim(["Puesto de Peaje"])
            .title_case("Puesto de Peaje")
            .exclude("Puesto de Peaje", "Naranjo")
            .drop_columns(["Cuatro Ejes"])
            .fill_nulls()
    }

    /// Apply every rule in order to a copy of `raw`.
    pub fn apply(&self, raw: &DataFrame) -> Result<DataFrame> {
        let mut df = raw.clone();
        for rule in &self.rules {
            df = self.apply_rule(df, rule)?;
        }
        debug!(
            source = %self.source,
            rows_in = raw.height(),
            rows_out = df.height(),
            columns_out = df.width(),
            "cleaning complete"
        );
        Ok(df)
    }

    fn apply_rule(&self, mut df: DataFrame, rule: &CleaningRule) -> Result<DataFrame> {
        match rule {
            CleaningRule::Trim { columns } => {
                for column in columns {
                    if self.present(&df, column) {
                        map_text(&mut df, column, |s| s.trim().to_string())?;
                    }
                }
            }
            CleaningRule::TitleCase { column } => {
                if self.present(&df, column) {
                    map_text(&mut df, column, title_case)?;
                }
            }
            CleaningRule::Exclude { column, value } => {
                if self.present(&df, column) {
                    require_text(&df, column)?;
                    // Nulls are kept; only an exact match is excluded
                    let mask: BooleanChunked = df
                        .column(column)?
                        .str()?
                        .into_iter()
                        .map(|v| v != Some(value.as_str()))
                        .collect();
                    df = df.filter(&mask)?;
                }
            }
            CleaningRule::DropColumns { columns } => {
                let present: Vec<String> = columns
                    .iter()
                    .filter(|c| self.present(&df, c))
                    .cloned()
                    .collect();
                df = df.drop_many(present.iter().map(String::as_str));
            }
            CleaningRule::DropSparse { max_null_ratio } => {
                let sparse = columns_above_threshold(&null_ratios(&df), *max_null_ratio, &[]);
                if !sparse.is_empty() {
                    debug!(source = %self.source, columns = ?sparse, "dropping sparse columns");
                }
                df = df.drop_many(sparse.iter().map(String::as_str));
            }
            CleaningRule::Rename { from, to } => {
                if self.present(&df, from) {
                    if has_column(&df, to) {
                        return Err(PipelineError::ColumnCollision { column: to.clone() });
                    }
                    df.rename(from, to.as_str().into())?;
                }
            }
            CleaningRule::FillNulls => {
                df = fill_residual_nulls(df)?;
            }
        }
        Ok(df)
    }

    fn present(&self, df: &DataFrame, column: &str) -> bool {
        let found = has_column(df, column);
        if !found {
            debug!(source = %self.source, column, "column absent, rule skipped");
        }
        found
    }
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

fn require_text(df: &DataFrame, column: &str) -> Result<()> {
    let dtype = df.column(column)?.dtype().clone();
    if dtype != DataType::String {
        return Err(PipelineError::schema_mismatch(STAGE, column, "String", dtype));
    }
    Ok(())
}

fn map_text(df: &mut DataFrame, column: &str, f: impl Fn(&str) -> String) -> Result<()> {
    require_text(df, column)?;
    let values: Vec<Option<String>> = df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.map(&f))
        .collect();
    df.with_column(Column::new(column.into(), values))?;
    Ok(())
}

/// Upper-case every letter that follows a non-letter, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn fill_residual_nulls(df: DataFrame) -> Result<DataFrame> {
    let height = df.height();
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        if height > 0 && column.null_count() == height {
            debug!(column = %column.name(), "removing column with no values");
            continue;
        }
        let dtype = column.dtype();
        let filled = if dtype.is_float() {
            let values: Vec<f64> = column
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(0.0))
                .collect();
            Column::new(column.name().clone(), values)
        } else if dtype.is_integer() {
            column
                .as_materialized_series()
                .fill_null(FillNullStrategy::Zero)?
                .into_column()
        } else if *dtype == DataType::String {
            let values: Vec<String> = column
                .str()?
                .into_iter()
                .map(|v| v.unwrap_or("").to_string())
                .collect();
            Column::new(column.name().clone(), values)
        } else if *dtype == DataType::Boolean {
            let values: Vec<bool> = column
                .bool()?
                .into_iter()
                .map(|v| v.unwrap_or(false))
                .collect();
            Column::new(column.name().clone(), values)
        } else {
            column.clone()
        };
        columns.push(filled);
    }

    Ok(DataFrame::new(columns)?)
}
