use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};

use super::ModelSpec;

const FORMAT_VERSION: u32 = 1;

/// On-disk envelope of a fitted model
#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    saved_at: DateTime<Utc>,
    model: ModelSpec,
}

/// Write a fitted model as JSON, creating parent directories.
pub fn save_model(spec: &ModelSpec, path: &Path) -> Result<()> {
    if spec.estimator.is_none() {
        return Err(PipelineError::ModelNotTrained);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = ModelFile {
        format_version: FORMAT_VERSION,
        saved_at: Utc::now(),
        model: spec.clone(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    info!(path = %path.display(), target = %spec.target, "model saved");
    Ok(())
}

pub fn load_model(path: &Path) -> Result<ModelSpec> {
    if !path.exists() {
        return Err(PipelineError::ModelNotFound {
            path: path.to_path_buf(),
        });
    }
    let file: ModelFile = serde_json::from_str(&fs::read_to_string(path)?)?;
    if file.format_version != FORMAT_VERSION {
        return Err(PipelineError::InvalidConfig(format!(
            "model file version {} is not supported (expected {})",
            file.format_version, FORMAT_VERSION
        )));
    }
    Ok(file.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProblemKind;

    #[test]
    fn test_missing_file_is_model_not_found() {
        assert!(matches!(
            load_model(Path::new("/nonexistent/model.json")),
            Err(PipelineError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn test_untrained_model_cannot_be_saved() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = ModelSpec::new(ProblemKind::Regression, "pm2_5");
        assert!(matches!(
            save_model(&spec, &dir.path().join("m.json")),
            Err(PipelineError::ModelNotTrained)
        ));
    }
}
