//! Directory-backed table store
//!
//! Each table is a pair of files: `<table>.schema.json` with the column
//! definitions and `<table>.csv` with the rows. Writes go to a temporary file
//! that replaces the table file only after it is complete.

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::save_dataset;

use super::{create_table_statement, infer_schema, ColumnDef, SqlType, TableSink};

const STAGE: &str = "storage";

#[derive(Debug, Clone)]
pub struct FileTableStore {
    root: PathBuf,
}

impl FileTableStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.schema_path(table).exists()
    }

    /// Stored column definitions of `table`
    pub fn schema(&self, table: &str) -> Result<Vec<ColumnDef>> {
        let path = self.schema_path(table);
        if !path.exists() {
            return Err(PipelineError::SourceNotFound {
                source_name: format!("table {}", table),
                path,
            });
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn schema_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.schema.json", table))
    }

    fn data_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.csv", table))
    }

    fn staging_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.staging.csv", table))
    }

    fn check_compatible(table: &str, stored: &[ColumnDef], df: &DataFrame) -> Result<()> {
        let incoming = infer_schema(df);
        if incoming.len() != stored.len() {
            return Err(PipelineError::schema_mismatch(
                STAGE,
                table,
                &format!("{} columns", stored.len()),
                format!("{} columns", incoming.len()),
            ));
        }
        for (want, got) in stored.iter().zip(incoming.iter()) {
            // Integers widen into float columns; nothing else converts implicitly
            let compatible = want.name == got.name
                && (want.sql_type == got.sql_type
                    || (want.sql_type == SqlType::Float && got.sql_type == SqlType::Integer));
            if !compatible {
                return Err(PipelineError::schema_mismatch(
                    STAGE,
                    &got.name,
                    &format!("{} {}", want.name, want.sql_type),
                    format!("{} {}", got.name, got.sql_type),
                ));
            }
        }
        Ok(())
    }

    fn typed(df: DataFrame, schema: &[ColumnDef]) -> Result<DataFrame> {
        let columns: Vec<Column> = schema
            .iter()
            .map(|def| -> Result<Column> {
                let column = df.column(&def.name)?;
                Ok(column.cast(&def.sql_type.dtype())?)
            })
            .collect::<Result<_>>()?;
        Ok(DataFrame::new(columns)?)
    }
}

impl TableSink for FileTableStore {
    fn create_table_for_schema(&mut self, df: &DataFrame, table: &str) -> Result<()> {
        if self.table_exists(table) {
            return Ok(());
        }
        let columns = infer_schema(df);
        let mut empty = df.clear();
        save_dataset(&mut empty, &self.data_path(table))?;
        fs::write(self.schema_path(table), serde_json::to_string_pretty(&columns)?)?;
        info!(table, ddl = %create_table_statement(table, &columns), "table created");
        Ok(())
    }

    fn bulk_insert(&mut self, df: &DataFrame, table: &str) -> Result<usize> {
        let schema = self.schema(table)?;
        Self::check_compatible(table, &schema, df)?;

        let mut combined = self.query(table)?;
        combined.vstack_mut(&Self::typed(df.clone(), &schema)?)?;

        let staging = self.staging_path(table);
        if let Err(e) = save_dataset(&mut combined, &staging) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        fs::rename(&staging, self.data_path(table))?;

        info!(table, rows = df.height(), "rows inserted");
        Ok(df.height())
    }

    fn query(&self, table: &str) -> Result<DataFrame> {
        let schema = self.schema(table)?;
        let path = self.data_path(table);
        if !path.exists() {
            return Err(PipelineError::SourceNotFound {
                source_name: format!("table {}", table),
                path,
            });
        }
        // Stored types win over inference so "007" stays text
        let csv_schema: Schema = schema
            .iter()
            .map(|def| Field::new(def.name.as_str().into(), def.sql_type.dtype()))
            .collect();
        let rows = LazyCsvReader::new(&path)
            .with_has_header(true)
            .with_schema(Some(Arc::new(csv_schema)))
            .finish()?
            .collect()?;
        Self::typed(rows, &schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = FileTableStore::open(dir.path()).unwrap();
        let df = df! { "Year" => [2020i32], "pm2_5" => [10.5f64] }.unwrap();

        store.create_table_for_schema(&df, "Pollution").unwrap();
        let other = df! { "x" => ["text"] }.unwrap();
        store.create_table_for_schema(&other, "Pollution").unwrap();

        let schema = store.schema("Pollution").unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].sql_type, SqlType::Integer);
    }

    #[test]
    fn test_insert_into_missing_table_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = FileTableStore::open(dir.path()).unwrap();
        let df = df! { "x" => [1i32] }.unwrap();
        assert!(matches!(
            store.bulk_insert(&df, "Nope"),
            Err(PipelineError::SourceNotFound { .. })
        ));
    }
}
