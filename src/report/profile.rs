//! Exploratory profile of a dataset: shape, types, nulls, duplicates and
//! basic statistics per column

use std::fmt;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{finite_values, missing_count};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub nulls: usize,
    pub numeric: Option<NumericSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub duplicated_rows: usize,
    pub column_profiles: Vec<ColumnProfile>,
}

impl DatasetProfile {
    pub fn from_dataframe(name: &str, df: &DataFrame) -> Result<Self> {
        let column_profiles = df
            .get_columns()
            .iter()
            .map(|column| -> Result<ColumnProfile> {
                let numeric = if column.dtype().is_primitive_numeric() {
                    let present: Vec<f64> = finite_values(column)?.into_iter().flatten().collect();
                    (!present.is_empty()).then(|| NumericSummary {
                        min: present.iter().copied().fold(f64::INFINITY, f64::min),
                        mean: present.iter().sum::<f64>() / present.len() as f64,
                        max: present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    })
                } else {
                    None
                };
                Ok(ColumnProfile {
                    name: column.name().to_string(),
                    dtype: column.dtype().to_string(),
                    nulls: missing_count(column),
                    numeric,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Rows identical to an earlier row
        let duplicated_rows = if df.width() == 0 {
            0
        } else {
            df.height()
                - df
                    .unique_stable(None, UniqueKeepStrategy::First, None)?
                    .height()
        };

        Ok(Self {
            name: name.to_string(),
            rows: df.height(),
            columns: df.width(),
            duplicated_rows,
            column_profiles,
        })
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Column").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Nulls").add_attribute(Attribute::Bold),
            Cell::new("Min").add_attribute(Attribute::Bold),
            Cell::new("Mean").add_attribute(Attribute::Bold),
            Cell::new("Max").add_attribute(Attribute::Bold),
        ]);

        for c in &self.column_profiles {
            let stat = |f: fn(&NumericSummary) -> f64| {
                c.numeric
                    .as_ref()
                    .map(|n| format!("{:.2}", f(n)))
                    .unwrap_or_else(|| "-".to_string())
            };
            table.add_row(vec![
                Cell::new(&c.name),
                Cell::new(&c.dtype),
                Cell::new(c.nulls).fg(if c.nulls > 0 { Color::Yellow } else { Color::White }),
                Cell::new(stat(|n| n.min)),
                Cell::new(stat(|n| n.mean)),
                Cell::new(stat(|n| n.max)),
            ]);
        }
        table
    }
}

impl fmt::Display for DatasetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} rows × {} columns, {} duplicated rows",
            self.name, self.rows, self.columns, self.duplicated_rows
        )?;
        write!(f, "{}", self.to_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_counts() {
        let df = df! {
            "Year" => [2020i32, 2020, 2021],
            "pm2_5" => [Some(10.0f64), Some(10.0), None],
            "site" => ["a", "a", "b"],
        }
        .unwrap();
        let profile = DatasetProfile::from_dataframe("pollution", &df).unwrap();

        assert_eq!((profile.rows, profile.columns), (3, 3));
        assert_eq!(profile.duplicated_rows, 1);

        let pm = &profile.column_profiles[1];
        assert_eq!(pm.nulls, 1);
        let stats = pm.numeric.as_ref().unwrap();
        assert_eq!((stats.min, stats.mean, stats.max), (10.0, 10.0, 10.0));
        assert!(profile.column_profiles[2].numeric.is_none());
    }

    #[test]
    fn test_display_includes_shape() {
        let df = df! { "x" => [1.0f64, 2.0] }.unwrap();
        let rendered = DatasetProfile::from_dataframe("weather", &df).unwrap().to_string();
        assert!(rendered.contains("weather: 2 rows × 1 columns"));
    }
}
