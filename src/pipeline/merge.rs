//! Inner join of monthly aggregates on (Year, Month)

use std::collections::HashSet;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

use super::aggregate::{MONTH, YEAR};
use super::cleaner::has_column;

const STAGE: &str = "merge";
const ROW_ORDER: &str = "__left_row";

/// Inner-join two or more (Year, Month)-keyed datasets.
///
/// Output rows follow the first input's order with unmatched keys removed.
/// Rows still missing a value in any joined column are dropped as well.
/// Non-key column names must be unique across inputs.
pub fn merge_monthly(inputs: &[&DataFrame]) -> Result<DataFrame> {
    if inputs.len() < 2 {
        return Err(PipelineError::insufficient(
            STAGE,
            format!("need at least two datasets, got {}", inputs.len()),
        ));
    }

    check_collisions(inputs)?;

    let keys = [col(YEAR), col(MONTH)];
    let mut joined = with_int_keys(inputs[0])?
        .with_row_index(ROW_ORDER.into(), None)?
        .lazy();
    for input in &inputs[1..] {
        joined = joined.join(
            with_int_keys(input)?.lazy(),
            keys.clone(),
            keys.clone(),
            JoinArgs::new(JoinType::Inner),
        );
    }

    let joined = joined
        .sort([ROW_ORDER], SortMultipleOptions::default())
        .collect()?
        .drop(ROW_ORDER)?;
    let merged = drop_incomplete(&joined)?;

    let incomplete = joined.height() - merged.height();
    if incomplete > 0 {
        warn!(
            dropped = incomplete,
            "months with a missing value in a joined column removed"
        );
    }

    let smallest = inputs.iter().map(|df| df.height()).min().unwrap_or(0);
    if joined.height() < smallest {
        // Sparse calendar coverage is expected, but worth knowing about
        warn!(
            kept = joined.height(),
            smallest_input = smallest,
            "inner join dropped months missing from at least one source"
        );
    }
    debug!(rows = merged.height(), columns = merged.width(), "merge complete");

    Ok(merged)
}

/// Keep only rows with a value (not null, not NaN) in every non-key column.
fn drop_incomplete(df: &DataFrame) -> Result<DataFrame> {
    let predicate = df
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != YEAR && c.name().as_str() != MONTH)
        .map(|c| {
            let present = col(c.name().clone()).is_not_null();
            if c.dtype().is_float() {
                present.and(col(c.name().clone()).is_not_nan())
            } else {
                present
            }
        })
        .reduce(|all, next| all.and(next));

    match predicate {
        Some(predicate) => Ok(df.clone().lazy().filter(predicate).collect()?),
        None => Ok(df.clone()),
    }
}

fn check_collisions(inputs: &[&DataFrame]) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for df in inputs {
        for key in [YEAR, MONTH] {
            if !has_column(df, key) {
                return Err(PipelineError::schema_mismatch(STAGE, key, "Int32", "absent"));
            }
        }
        for name in df.get_column_names() {
            let name = name.as_str();
            if name == YEAR || name == MONTH {
                continue;
            }
            if !seen.insert(name.to_string()) {
                return Err(PipelineError::ColumnCollision {
                    column: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn with_int_keys(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    for key in [YEAR, MONTH] {
        let column = df.column(key)?;
        if !column.dtype().is_integer() {
            return Err(PipelineError::schema_mismatch(STAGE, key, "Int32", column.dtype()));
        }
        out.with_column(column.cast(&DataType::Int32)?)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_two_inputs() {
        let df = df! { "Year" => [2020i32], "Month" => [1i32] }.unwrap();
        assert!(matches!(
            merge_monthly(&[&df]),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_key_width_mismatch_is_normalized() {
        let a = df! { "Year" => [2020i64, 2020], "Month" => [1i64, 2], "a" => [1.0f64, 2.0] }.unwrap();
        let b = df! { "Year" => [2020i32], "Month" => [2i32], "b" => [5.0f64] }.unwrap();
        let merged = merge_monthly(&[&a, &b]).unwrap();
        assert_eq!(merged.height(), 1);
        assert_eq!(merged.column("a").unwrap().f64().unwrap().get(0), Some(2.0));
        assert_eq!(merged.column("b").unwrap().f64().unwrap().get(0), Some(5.0));
        assert!(!has_column(&merged, ROW_ORDER));
    }

    #[test]
    fn test_months_with_missing_values_are_dropped() {
        let a = df! {
            "Year" => [2020i32, 2020, 2020],
            "Month" => [1i32, 2, 3],
            "TempMax" => [Some(26.0f64), Some(27.0), Some(f64::NAN)],
        }
        .unwrap();
        let b = df! {
            "Year" => [2020i32, 2020, 2020],
            "Month" => [1i32, 2, 3],
            "pm2_5" => [Some(12.0f64), None, Some(14.0)],
        }
        .unwrap();
        let merged = merge_monthly(&[&a, &b]).unwrap();
        assert_eq!(merged.height(), 1);
        assert_eq!(merged.column("Month").unwrap().i32().unwrap().get(0), Some(1));
    }

    #[test]
    fn test_float_keys_rejected() {
        let a = df! { "Year" => [2020.0f64], "Month" => [1.0f64] }.unwrap();
        let b = df! { "Year" => [2020i32], "Month" => [1i32] }.unwrap();
        assert!(matches!(
            merge_monthly(&[&a, &b]),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }
}
