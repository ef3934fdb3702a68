//! Air-quality categories derived from a pm2.5 concentration
//!
//! Classification mode replaces the continuous pollutant target with an
//! ordinal label. Breakpoints follow the US EPA pm2.5 index; each bin includes
//! its upper edge.

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

use super::cleaner::has_column;

/// Column name of the derived categorical target
pub const CATEGORY_COLUMN: &str = "AirQualityCategory";

/// Upper edges (inclusive) of every category except the last
const BREAKPOINTS: [f64; 4] = [12.0, 35.4, 55.4, 150.4];

/// Ordered air-quality category, from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AirQualityCategory {
    Good,
    Moderate,
    UnhealthyForSensitive,
    VeryUnhealthy,
    Hazardous,
}

impl AirQualityCategory {
    pub const ALL: [AirQualityCategory; 5] = [
        AirQualityCategory::Good,
        AirQualityCategory::Moderate,
        AirQualityCategory::UnhealthyForSensitive,
        AirQualityCategory::VeryUnhealthy,
        AirQualityCategory::Hazardous,
    ];

    /// Category of a pm2.5 concentration; `None` for NaN.
    pub fn from_pm25(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        let bin = BREAKPOINTS
            .iter()
            .position(|&edge| value <= edge)
            .unwrap_or(BREAKPOINTS.len());
        Some(Self::ALL[bin])
    }

    pub fn label(self) -> &'static str {
        match self {
            AirQualityCategory::Good => "Good",
            AirQualityCategory::Moderate => "Moderate",
            AirQualityCategory::UnhealthyForSensitive => "Unhealthy for Sensitive Groups",
            AirQualityCategory::VeryUnhealthy => "Very Unhealthy",
            AirQualityCategory::Hazardous => "Hazardous",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for AirQualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map every value of a numeric series to its category label.
///
/// Nulls and NaN stay null.
pub fn categorize(values: &Column) -> Result<Column> {
    if !values.dtype().is_primitive_numeric() {
        return Err(PipelineError::schema_mismatch(
            "categorize",
            values.name().as_str(),
            "numeric",
            values.dtype(),
        ));
    }
    let labels: Vec<Option<&str>> = values
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.and_then(AirQualityCategory::from_pm25).map(AirQualityCategory::label))
        .collect();
    Ok(Column::new(CATEGORY_COLUMN.into(), labels))
}

/// Add the categorical target next to the numeric `pm25_column`, which is kept unchanged.
pub fn with_category_target(df: &DataFrame, pm25_column: &str) -> Result<DataFrame> {
    if !has_column(df, pm25_column) {
        return Err(PipelineError::schema_mismatch(
            "categorize",
            pm25_column,
            "numeric",
            "absent",
        ));
    }
    let mut out = df.clone();
    out.with_column(categorize(df.column(pm25_column)?)?)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints_include_upper_edge() {
        use AirQualityCategory::*;
        assert_eq!(AirQualityCategory::from_pm25(12.0), Some(Good));
        assert_eq!(AirQualityCategory::from_pm25(12.1), Some(Moderate));
        assert_eq!(AirQualityCategory::from_pm25(35.4), Some(Moderate));
        assert_eq!(AirQualityCategory::from_pm25(35.5), Some(UnhealthyForSensitive));
        assert_eq!(AirQualityCategory::from_pm25(55.4), Some(UnhealthyForSensitive));
        assert_eq!(AirQualityCategory::from_pm25(150.4), Some(VeryUnhealthy));
        assert_eq!(AirQualityCategory::from_pm25(150.5), Some(Hazardous));
        assert_eq!(AirQualityCategory::from_pm25(-3.0), Some(Good));
        assert_eq!(AirQualityCategory::from_pm25(f64::INFINITY), Some(Hazardous));
        assert_eq!(AirQualityCategory::from_pm25(f64::NAN), None);
    }

    #[test]
    fn test_labels_round_trip() {
        for category in AirQualityCategory::ALL {
            assert_eq!(AirQualityCategory::from_label(category.label()), Some(category));
        }
    }

    #[test]
    fn test_categorize_keeps_nulls() {
        let values = Column::new("pm2_5".into(), [Some(5.0f64), None, Some(40.0)]);
        let labels = categorize(&values).unwrap();
        assert_eq!(labels.name().as_str(), CATEGORY_COLUMN);
        let labels: Vec<Option<&str>> = labels.str().unwrap().into_iter().collect();
        assert_eq!(
            labels,
            vec![Some("Good"), None, Some("Unhealthy for Sensitive Groups")]
        );
    }

    #[test]
    fn test_categorize_rejects_text() {
        let values = Column::new("pm2_5".into(), ["high", "low"]);
        assert!(categorize(&values).is_err());
    }
}
