//! Dataset loading and export for CSV and Parquet files

use std::path::Path;

use polars::prelude::*;

use crate::error::{PipelineError, Result};

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV or Parquet based on extension).
///
/// `source_name` is only used to label the error when the file is missing.
pub fn load_dataset(path: &Path, source_name: &str) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        });
    }

    let lf = match extension_of(path).as_str() {
        "csv" => LazyCsvReader::new(path).with_has_header(true).finish()?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
        other => {
            return Err(PipelineError::InvalidConfig(format!(
                "unsupported file format '{}' for {}. Supported formats: csv, parquet",
                other,
                path.display()
            )))
        }
    };

    Ok(lf.collect()?)
}

/// Save a dataset to file (CSV or Parquet based on extension).
///
/// CSV output is UTF-8 with a header row. Parent directories are created.
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match extension_of(path).as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)?;
            ParquetWriter::new(file).finish(df)?;
        }
        other => {
            return Err(PipelineError::InvalidConfig(format!(
                "unsupported output format '{}'. Supported formats: csv, parquet",
                other
            )))
        }
    }

    Ok(())
}
