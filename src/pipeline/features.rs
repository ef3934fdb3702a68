//! Feature resolution for a target column

use polars::prelude::*;

use crate::error::{PipelineError, Result};

use super::cleaner::has_column;

/// Candidate covariates used when no features are requested, in model order
pub const DEFAULT_FEATURES: &[&str] = &[
    "pm10",
    "CO",
    "NO2",
    "O3",
    "TempMax",
    "TempMin",
    "Precipitation",
    "Year",
    "Month",
];

/// Resolve the ordered feature list for `target`.
///
/// The requested list (or [`DEFAULT_FEATURES`] when empty) is filtered to
/// columns present in `df`, never including the target itself. Duplicates keep
/// their first position.
pub fn select_features(df: &DataFrame, target: &str, requested: &[String]) -> Result<Vec<String>> {
    if !has_column(df, target) {
        return Err(PipelineError::NoUsableFeatures {
            target: target.to_string(),
        });
    }

    let candidates: Vec<&str> = if requested.is_empty() {
        DEFAULT_FEATURES.to_vec()
    } else {
        requested.iter().map(String::as_str).collect()
    };

    let mut features: Vec<String> = Vec::new();
    for name in candidates {
        if name != target && has_column(df, name) && !features.iter().any(|f| f == name) {
            features.push(name.to_string());
        }
    }

    if features.is_empty() {
        return Err(PipelineError::NoUsableFeatures {
            target: target.to_string(),
        });
    }
    Ok(features)
}
