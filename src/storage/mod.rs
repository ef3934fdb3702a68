//! Persistent table sink
//!
//! Stages hand finished datasets to a [`TableSink`]. The sink infers a SQL
//! column type for every column and creates the table once; inserts are
//! all-or-nothing.

pub mod file_store;

pub use file_store::FileTableStore;

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Column type of a stored table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl SqlType {
    /// Infer the SQL type from a polars dtype; anything unrecognized is stored as text
    pub fn infer(dtype: &DataType) -> SqlType {
        match dtype {
            DataType::Boolean => SqlType::Boolean,
            DataType::Float32 | DataType::Float64 => SqlType::Float,
            DataType::Date | DataType::Datetime(_, _) => SqlType::Timestamp,
            d if d.is_integer() => SqlType::Integer,
            _ => SqlType::Text,
        }
    }

    /// Polars type that values of this column are stored and read back as
    pub fn dtype(self) -> DataType {
        match self {
            SqlType::Integer => DataType::Int64,
            SqlType::Float => DataType::Float64,
            SqlType::Boolean => DataType::Boolean,
            SqlType::Text => DataType::String,
            SqlType::Timestamp => DataType::Datetime(TimeUnit::Microseconds, None),
        }
    }

    /// DDL spelling used in `CREATE TABLE`
    pub fn ddl(self) -> &'static str {
        match self {
            SqlType::Integer => "INT",
            SqlType::Float => "FLOAT",
            SqlType::Text => "NVARCHAR(MAX)",
            SqlType::Boolean => "BIT",
            SqlType::Timestamp => "DATETIME",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ddl())
    }
}

/// Named, typed column of a stored table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
}

/// Column definitions inferred from a dataset, in column order
pub fn infer_schema(df: &DataFrame) -> Vec<ColumnDef> {
    df.get_columns()
        .iter()
        .map(|c| ColumnDef {
            name: c.name().to_string(),
            sql_type: SqlType::infer(c.dtype()),
        })
        .collect()
}

/// `CREATE TABLE` statement for `table` with the given columns
pub fn create_table_statement(table: &str, columns: &[ColumnDef]) -> String {
    let body: Vec<String> = columns
        .iter()
        .map(|c| format!("[{}] {}", c.name, c.sql_type))
        .collect();
    format!("CREATE TABLE [{}] ({})", table, body.join(", "))
}

/// A persistent destination for finished datasets
pub trait TableSink {
    /// Create `table` with a schema inferred from `df`; no-op if it already exists.
    fn create_table_for_schema(&mut self, df: &DataFrame, table: &str) -> Result<()>;

    /// Append every row of `df` to `table`, or nothing if any row fails.
    fn bulk_insert(&mut self, df: &DataFrame, table: &str) -> Result<usize>;

    /// Read back the full contents of `table`.
    fn query(&self, table: &str) -> Result<DataFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_sql_types() {
        let df = df! {
            "Year" => [2020i32],
            "count" => [3u64],
            "pm2_5" => [11.5f64],
            "site" => ["Escazu"],
            "open" => [true],
        }
        .unwrap();
        let types: Vec<SqlType> = infer_schema(&df).into_iter().map(|c| c.sql_type).collect();
        assert_eq!(
            types,
            vec![
                SqlType::Integer,
                SqlType::Integer,
                SqlType::Float,
                SqlType::Text,
                SqlType::Boolean
            ]
        );
    }

    #[test]
    fn test_create_table_statement() {
        let columns = vec![
            ColumnDef {
                name: "Year".to_string(),
                sql_type: SqlType::Integer,
            },
            ColumnDef {
                name: "Puesto de Peaje".to_string(),
                sql_type: SqlType::Text,
            },
        ];
        assert_eq!(
            create_table_statement("FlujoVehicular", &columns),
            "CREATE TABLE [FlujoVehicular] ([Year] INT, [Puesto de Peaje] NVARCHAR(MAX))"
        );
    }
}
