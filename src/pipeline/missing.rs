//! Missing value analysis

use polars::prelude::*;

/// Ratio of null values per column, sorted by ratio descending.
///
/// NaN in float columns counts as missing, matching how the imputer treats it.
pub fn null_ratios(df: &DataFrame) -> Vec<(String, f64)> {
    if df.height() == 0 {
        return Vec::new();
    }

    let rows = df.height() as f64;
    let mut ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|column| (column.name().to_string(), missing_count(column) as f64 / rows))
        .collect();

    ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ratios
}

/// Number of null (or NaN) entries in a column
pub fn missing_count(column: &Column) -> usize {
    let nulls = column.null_count();
    if !column.dtype().is_float() {
        return nulls;
    }
    let nans = column
        .cast(&DataType::Float64)
        .ok()
        .and_then(|c| {
            c.f64()
                .ok()
                .map(|ca| ca.into_iter().filter(|v| v.is_some_and(f64::is_nan)).count())
        })
        .unwrap_or(0);
    nulls + nans
}

/// Columns whose null ratio is strictly above `threshold`, excluding `protected` names
pub fn columns_above_threshold(
    ratios: &[(String, f64)],
    threshold: f64,
    protected: &[&str],
) -> Vec<String> {
    ratios
        .iter()
        .filter(|(name, ratio)| *ratio > threshold && !protected.contains(&name.as_str()))
        .map(|(name, _)| name.clone())
        .collect()
}
