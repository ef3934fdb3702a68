//! Missing and non-finite value imputation for model inputs

use std::collections::HashMap;

use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};

const STAGE: &str = "impute";

/// Feature matrix and target vector after imputation, rows in lockstep
#[derive(Debug, Clone)]
pub struct ImputedData {
    pub features: DataFrame,
    pub target: Column,
    /// Rows removed because a value could not be filled
    pub dropped_rows: usize,
}

/// Fill missing values column-wise and drop rows that stay incomplete.
///
/// ±infinity and NaN count as missing. Numeric columns are filled with the
/// mean of their remaining values, any other column with its most frequent
/// value (as text). A column with no values at all cannot be filled, so every
/// row is dropped rather than guessing.
pub fn impute(features: &DataFrame, target: &Column) -> Result<ImputedData> {
    if features.height() != target.len() {
        return Err(PipelineError::insufficient(
            STAGE,
            format!(
                "feature rows ({}) and target rows ({}) differ",
                features.height(),
                target.len()
            ),
        ));
    }

    let filled: Vec<Column> = features
        .get_columns()
        .iter()
        .map(fill_column)
        .collect::<Result<_>>()?;
    let filled_target = fill_column(target)?;

    let height = features.height();
    let mut keep = vec![true; height];
    for column in filled.iter().chain(std::iter::once(&filled_target)) {
        if column.null_count() == 0 {
            continue;
        }
        let validity = column.as_materialized_series().is_not_null();
        for (row, valid) in validity.into_iter().enumerate() {
            if !valid.unwrap_or(false) {
                keep[row] = false;
            }
        }
    }
    let mask: BooleanChunked = keep.iter().copied().collect();
    let dropped_rows = keep.iter().filter(|k| !**k).count();

    let features = DataFrame::new(filled)?.filter(&mask)?;
    let target = filled_target
        .as_materialized_series()
        .filter(&mask)?
        .into_column();

    if features.height() == 0 {
        return Err(PipelineError::insufficient(
            STAGE,
            "no complete rows remain after imputation",
        ));
    }
    if dropped_rows > 0 {
        debug!(dropped_rows, "rows dropped after imputation");
    }

    Ok(ImputedData {
        features,
        target,
        dropped_rows,
    })
}

/// Fill a single column; numeric columns come back as Float64.
pub fn fill_column(column: &Column) -> Result<Column> {
    if column.dtype().is_primitive_numeric() || *column.dtype() == DataType::Null {
        let values = finite_values(column)?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let filled: Vec<Option<f64>> = if present.is_empty() {
            values
        } else {
            let mean = present.iter().sum::<f64>() / present.len() as f64;
            values.into_iter().map(|v| Some(v.unwrap_or(mean))).collect()
        };
        return Ok(Column::new(column.name().clone(), filled));
    }

    let text = column.cast(&DataType::String)?;
    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    let filled = match mode(&values) {
        Some(most_common) => values
            .into_iter()
            .map(|v| Some(v.unwrap_or_else(|| most_common.clone())))
            .collect(),
        None => values,
    };
    Ok(Column::new(column.name().clone(), filled))
}

/// Column values as f64 with NaN and ±infinity mapped to None
pub fn finite_values(column: &Column) -> Result<Vec<Option<f64>>> {
    Ok(column
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Most frequent value; ties resolve to the smallest value.
fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value.to_string())
}
