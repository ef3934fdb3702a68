//! Model preparation, training, evaluation and prediction
//!
//! A [`Model`] owns a copy of the merged dataset. Its lifecycle is
//! `new` → (`categorize_target`) → `prepare` → `train` → `evaluate` / `predict`
//! / `save`. The fitted part lives in a [`ModelSpec`], which is what gets
//! persisted and can predict on its own after [`load_model`].

pub mod algorithm;
pub mod estimator;
pub mod forest;
pub mod knn;
pub mod linear;
pub mod logistic;
pub mod metrics;
pub mod persist;
pub mod split;
pub mod tree;

pub use algorithm::{Algorithm, ProblemKind};
pub use estimator::{Estimator, Task};
pub use metrics::{ClassificationMetrics, ClassMetrics, Metrics, RegressionMetrics};
pub use persist::{load_model, save_model};
pub use split::{train_test_split, SplitIndices};

use std::path::Path;

use faer::Mat;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::{
    finite_values, impute, select_features, with_category_target, AirQualityCategory,
    CATEGORY_COLUMN,
};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// One prediction: a number for regression, a class label for classification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Value(f64),
    Label(String),
}

impl Prediction {
    /// Collect predictions into a column named `name`
    pub fn to_column(name: &str, predictions: &[Prediction]) -> Column {
        if predictions.iter().all(|p| matches!(p, Prediction::Value(_))) {
            let values: Vec<f64> = predictions
                .iter()
                .filter_map(|p| match p {
                    Prediction::Value(v) => Some(*v),
                    Prediction::Label(_) => None,
                })
                .collect();
            Column::new(name.into(), values)
        } else {
            let labels: Vec<String> = predictions.iter().map(ToString::to_string).collect();
            Column::new(name.into(), labels)
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prediction::Value(v) => write!(f, "{}", v),
            Prediction::Label(l) => f.write_str(l),
        }
    }
}

/// Problem definition plus the fitted estimator, independent of any dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ProblemKind,
    pub target: String,
    /// Feature columns in the order the estimator expects them
    pub features: Vec<String>,
    /// Class labels indexed by the estimator's class predictions
    pub classes: Vec<String>,
    pub estimator: Option<Estimator>,
}

impl ModelSpec {
    pub fn new(kind: ProblemKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            features: Vec::new(),
            classes: Vec::new(),
            estimator: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.estimator.is_some()
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.estimator.as_ref().map(Estimator::algorithm)
    }

    /// Predict for new observations.
    ///
    /// Non-finite and missing feature values are replaced by that column's
    /// mean over `df` (0.0 when the column has no values).
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<Prediction>> {
        let estimator = self.estimator.as_ref().ok_or(PipelineError::ModelNotTrained)?;

        let mut columns = Vec::with_capacity(self.features.len());
        for name in &self.features {
            let column = df.column(name).map_err(|_| {
                PipelineError::schema_mismatch("predict", name, "numeric feature", "absent")
            })?;
            let values = numeric_values("predict", column)?;
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let fill = if present.is_empty() {
                0.0
            } else {
                present.iter().sum::<f64>() / present.len() as f64
            };
            columns.push(values.into_iter().map(|v| v.unwrap_or(fill)).collect::<Vec<_>>());
        }

        let x = Mat::from_fn(df.height(), columns.len(), |i, j| columns[j][i]);
        Ok(estimator
            .predict(&x)
            .into_iter()
            .map(|v| self.to_prediction(v))
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_model(self, path)
    }

    fn to_prediction(&self, raw: f64) -> Prediction {
        match self.kind {
            ProblemKind::Regression => Prediction::Value(raw),
            ProblemKind::Classification => Prediction::Label(
                self.classes
                    .get(raw as usize)
                    .cloned()
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Partition sizes produced by [`Model::prepare`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSummary {
    pub features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Rows lost because imputation could not complete them
    pub dropped_rows: usize,
}

struct Prepared {
    x_train: Mat<f64>,
    y_train: Vec<f64>,
    x_test: Mat<f64>,
    y_test: Vec<f64>,
    summary: PreparedSummary,
}

/// Training lifecycle over one dataset
pub struct Model {
    data: DataFrame,
    spec: ModelSpec,
    seed: u64,
    test_ratio: f64,
    prepared: Option<Prepared>,
}

impl Model {
    pub fn new(data: &DataFrame, kind: ProblemKind, target: impl Into<String>) -> Self {
        Self {
            data: data.clone(),
            spec: ModelSpec::new(kind, target),
            seed: DEFAULT_SEED,
            test_ratio: DEFAULT_TEST_RATIO,
            prepared: None,
        }
    }

    pub fn with_split(mut self, seed: u64, test_ratio: f64) -> Self {
        self.seed = seed;
        self.test_ratio = test_ratio;
        self
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn into_spec(self) -> ModelSpec {
        self.spec
    }

    pub fn target(&self) -> &str {
        &self.spec.target
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn prepared(&self) -> Option<&PreparedSummary> {
        self.prepared.as_ref().map(|p| &p.summary)
    }

    /// Add the air-quality category derived from `pm25_column` and make it the target.
    ///
    /// Any earlier preparation is discarded.
    pub fn categorize_target(&mut self, pm25_column: &str) -> Result<()> {
        self.data = with_category_target(&self.data, pm25_column)?;
        self.spec.target = CATEGORY_COLUMN.to_string();
        self.prepared = None;
        info!(source = pm25_column, target = CATEGORY_COLUMN, "target categorized");
        Ok(())
    }

    /// Resolve features, impute, encode and split into train / held-out partitions.
    pub fn prepare(&mut self, requested: &[String]) -> Result<PreparedSummary> {
        let features = select_features(&self.data, &self.spec.target, requested)?;
        let feature_df = DataFrame::new(
            features
                .iter()
                .map(|f| self.data.column(f).cloned())
                .collect::<PolarsResult<Vec<Column>>>()?,
        )?;
        let target = self.data.column(&self.spec.target)?;
        let imputed = impute(&feature_df, target)?;

        let x = feature_matrix(&imputed.features)?;
        let (y, classes) = match self.spec.kind {
            ProblemKind::Regression => {
                let y: Vec<f64> = numeric_values("prepare", &imputed.target)?
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect();
                (y, Vec::new())
            }
            ProblemKind::Classification => encode_labels(&imputed.target)?,
        };

        let split = train_test_split(x.nrows(), self.test_ratio, self.seed)?;
        let take = |rows: &[usize]| Mat::from_fn(rows.len(), x.ncols(), |i, j| x[(rows[i], j)]);
        let summary = PreparedSummary {
            features: features.clone(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            dropped_rows: imputed.dropped_rows,
        };
        let prepared = Prepared {
            x_train: take(&split.train),
            y_train: split.train.iter().map(|&i| y[i]).collect(),
            x_test: take(&split.test),
            y_test: split.test.iter().map(|&i| y[i]).collect(),
            summary: summary.clone(),
        };

        info!(
            target = %self.spec.target,
            features = features.len(),
            train_rows = summary.train_rows,
            test_rows = summary.test_rows,
            "data prepared"
        );
        self.spec.features = features;
        self.spec.classes = classes;
        self.prepared = Some(prepared);
        Ok(summary)
    }

    /// Fit `algorithm` on the training partition, replacing any earlier estimator.
    pub fn train(&mut self, algorithm: Algorithm) -> Result<()> {
        if !algorithm.supports(self.spec.kind) {
            return Err(PipelineError::UnsupportedAlgorithm {
                kind: self.spec.kind.to_string(),
                algorithm: algorithm.to_string(),
            });
        }
        let prepared = self.prepared.as_ref().ok_or_else(|| {
            PipelineError::insufficient("train", "data has not been prepared")
        })?;

        let task = match self.spec.kind {
            ProblemKind::Regression => Task::Regression,
            ProblemKind::Classification => Task::Classification {
                n_classes: self.spec.classes.len(),
            },
        };
        let estimator = Estimator::fit(
            algorithm,
            task,
            &prepared.x_train,
            &prepared.y_train,
            self.seed,
        )?;
        self.spec.estimator = Some(estimator);
        info!(%algorithm, kind = %self.spec.kind, "model trained");
        Ok(())
    }

    /// Resolve `name` for this model's problem kind, then [`train`](Self::train).
    pub fn train_named(&mut self, name: &str) -> Result<Algorithm> {
        let algorithm = Algorithm::resolve(self.spec.kind, name)?;
        self.train(algorithm)?;
        Ok(algorithm)
    }

    /// Score the fitted estimator on the held-out partition.
    pub fn evaluate(&self) -> Result<Metrics> {
        let estimator = self.spec.estimator.as_ref().ok_or(PipelineError::ModelNotTrained)?;
        let prepared = self.prepared.as_ref().ok_or_else(|| {
            PipelineError::insufficient("evaluate", "no held-out partition available")
        })?;

        let predicted = estimator.predict(&prepared.x_test);
        Ok(match self.spec.kind {
            ProblemKind::Regression => Metrics::Regression(metrics::regression_metrics(
                &prepared.y_test,
                &predicted,
            )),
            ProblemKind::Classification => {
                let y_true: Vec<usize> = prepared.y_test.iter().map(|&v| v as usize).collect();
                let y_pred: Vec<usize> = predicted.iter().map(|&v| v as usize).collect();
                Metrics::Classification(metrics::classification_metrics(
                    &y_true,
                    &y_pred,
                    &self.spec.classes,
                ))
            }
        })
    }

    pub fn predict(&self, df: &DataFrame) -> Result<Vec<Prediction>> {
        self.spec.predict(df)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.spec.save(path)
    }
}

/// Column values as f64 (non-finite as None); non-numeric columns are rejected.
fn numeric_values(stage: &str, column: &Column) -> Result<Vec<Option<f64>>> {
    let dtype = column.dtype();
    if !(dtype.is_primitive_numeric() || *dtype == DataType::Null) {
        return Err(PipelineError::schema_mismatch(
            stage,
            column.name().as_str(),
            "numeric",
            dtype,
        ));
    }
    finite_values(column)
}

fn feature_matrix(df: &DataFrame) -> Result<Mat<f64>> {
    let columns: Vec<Vec<f64>> = df
        .get_columns()
        .iter()
        .map(|c| -> Result<Vec<f64>> {
            Ok(numeric_values("prepare", c)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect())
        })
        .collect::<Result<_>>()?;
    Ok(Mat::from_fn(df.height(), columns.len(), |i, j| columns[j][i]))
}

/// Class indices for every row plus the ordered class labels.
///
/// Air-quality categories are ordered by severity, anything else lexically.
fn encode_labels(target: &Column) -> Result<(Vec<f64>, Vec<String>)> {
    let text = target.cast(&DataType::String)?;
    let labels: Vec<String> = text
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();

    let mut classes: Vec<String> = labels.clone();
    classes.sort();
    classes.dedup();
    if classes.iter().all(|c| AirQualityCategory::from_label(c).is_some()) {
        classes.sort_by_key(|c| AirQualityCategory::from_label(c));
    }

    let y = labels
        .iter()
        .map(|l| classes.iter().position(|c| c == l).unwrap_or(0) as f64)
        .collect();
    Ok((y, classes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly() -> DataFrame {
        let n = 24;
        let pm10: Vec<f64> = (0..n).map(|i| 20.0 + i as f64).collect();
        let temp: Vec<f64> = (0..n).map(|i| 22.0 + (i % 6) as f64).collect();
        let pm25: Vec<f64> = pm10.iter().zip(&temp).map(|(a, t)| 0.5 * a + 0.2 * t).collect();
        df! {
            "Year" => (0..n).map(|i| 2020 + i / 12).collect::<Vec<i32>>(),
            "Month" => (0..n).map(|i| i % 12 + 1).collect::<Vec<i32>>(),
            "pm10" => pm10,
            "TempMax" => temp,
            "pm2_5" => pm25,
        }
        .unwrap()
    }

    #[test]
    fn test_lifecycle_regression() {
        let mut model = Model::new(&monthly(), ProblemKind::Regression, "pm2_5");
        let summary = model.prepare(&[]).unwrap();
        assert_eq!(summary.features, vec!["pm10", "TempMax", "Year", "Month"]);
        assert_eq!(summary.test_rows, 5);
        assert_eq!(summary.train_rows, 19);

        assert!(matches!(model.evaluate(), Err(PipelineError::ModelNotTrained)));
        model.train(Algorithm::LinearRegression).unwrap();
        match model.evaluate().unwrap() {
            Metrics::Regression(m) => assert!(m.r2 > 0.99),
            other => panic!("unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn test_retraining_replaces_estimator() {
        let mut model = Model::new(&monthly(), ProblemKind::Regression, "pm2_5");
        model.prepare(&[]).unwrap();
        model.train(Algorithm::LinearRegression).unwrap();
        model.train(Algorithm::Knn).unwrap();
        assert_eq!(model.spec().algorithm(), Some(Algorithm::Knn));
    }

    #[test]
    fn test_train_before_prepare_fails() {
        let mut model = Model::new(&monthly(), ProblemKind::Regression, "pm2_5");
        assert!(model.train(Algorithm::DecisionTree).is_err());
    }

    #[test]
    fn test_categorized_classes_ordered_by_severity() {
        let df = df! {
            "pm10" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0],
            "pm2_5" => [40.0f64, 5.0, 20.0, 45.0, 8.0, 30.0],
        }
        .unwrap();
        let mut model = Model::new(&df, ProblemKind::Classification, "pm2_5");
        model.categorize_target("pm2_5").unwrap();
        assert_eq!(model.target(), CATEGORY_COLUMN);
        model.prepare(&[]).unwrap();
        assert_eq!(
            model.spec().classes,
            vec!["Good", "Moderate", "Unhealthy for Sensitive Groups"]
        );
    }

    #[test]
    fn test_predict_fills_missing_with_column_mean() {
        let mut model = Model::new(&monthly(), ProblemKind::Regression, "pm2_5");
        model.prepare(&["pm10".to_string()]).unwrap();
        model.train(Algorithm::LinearRegression).unwrap();

        let new = df! { "pm10" => [Some(30.0f64), None, Some(f64::INFINITY), Some(40.0)] }.unwrap();
        let predictions = model.predict(&new).unwrap();
        assert_eq!(predictions.len(), 4);
        let Prediction::Value(filled) = predictions[1] else {
            panic!("expected a numeric prediction");
        };
        let Prediction::Value(at_mean) = model
            .predict(&df! { "pm10" => [35.0f64] }.unwrap())
            .unwrap()[0]
        else {
            panic!("expected a numeric prediction");
        };
        assert!((filled - at_mean).abs() < 1e-9);
    }
}
