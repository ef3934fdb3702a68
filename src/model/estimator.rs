//! Fitted estimator variants behind one predict interface

use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

use super::algorithm::Algorithm;
use super::forest::{RandomForest, DEFAULT_TREES};
use super::knn::{KNearestNeighbors, DEFAULT_NEIGHBORS};
use super::linear::LinearRegression;
use super::logistic::LogisticRegression;
use super::tree::{DecisionTree, TreeParams};

/// What the estimator predicts; class predictions are indices stored as f64
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum Task {
    Regression,
    Classification { n_classes: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "params")]
pub enum Estimator {
    LinearRegression(LinearRegression),
    LogisticRegression(LogisticRegression),
    #[serde(rename = "KNN")]
    Knn(KNearestNeighbors),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Estimator {
    /// Fit `algorithm` on the training partition. `seed` drives every random choice.
    pub fn fit(algorithm: Algorithm, task: Task, x: &Mat<f64>, y: &[f64], seed: u64) -> Result<Self> {
        use rand::SeedableRng;

        Ok(match algorithm {
            Algorithm::LinearRegression => {
                Estimator::LinearRegression(LinearRegression::fit(x, y)?)
            }
            Algorithm::LogisticRegression => {
                let Task::Classification { n_classes } = task else {
                    return Err(PipelineError::UnsupportedAlgorithm {
                        kind: "regression".to_string(),
                        algorithm: algorithm.to_string(),
                    });
                };
                let labels: Vec<usize> = y.iter().map(|&v| v as usize).collect();
                Estimator::LogisticRegression(LogisticRegression::fit(x, &labels, n_classes)?)
            }
            Algorithm::Knn => {
                Estimator::Knn(KNearestNeighbors::fit(x, y, task, DEFAULT_NEIGHBORS)?)
            }
            Algorithm::DecisionTree => {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                let rows: Vec<usize> = (0..x.nrows()).collect();
                Estimator::DecisionTree(DecisionTree::fit(
                    x,
                    y,
                    &rows,
                    task,
                    TreeParams::default(),
                    &mut rng,
                )?)
            }
            Algorithm::RandomForest => {
                Estimator::RandomForest(RandomForest::fit(x, y, task, DEFAULT_TREES, seed)?)
            }
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Estimator::LinearRegression(_) => Algorithm::LinearRegression,
            Estimator::LogisticRegression(_) => Algorithm::LogisticRegression,
            Estimator::Knn(_) => Algorithm::Knn,
            Estimator::DecisionTree(_) => Algorithm::DecisionTree,
            Estimator::RandomForest(_) => Algorithm::RandomForest,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Estimator::LinearRegression(m) => m.predict_row(row),
            Estimator::LogisticRegression(m) => m.predict_row(row) as f64,
            Estimator::Knn(m) => m.predict_row(row),
            Estimator::DecisionTree(m) => m.predict_row(row),
            Estimator::RandomForest(m) => m.predict_row(row),
        }
    }

    pub fn predict(&self, x: &Mat<f64>) -> Vec<f64> {
        let mut row = vec![0.0; x.ncols()];
        (0..x.nrows())
            .map(|i| {
                for (j, v) in row.iter_mut().enumerate() {
                    *v = x[(i, j)];
                }
                self.predict_row(&row)
            })
            .collect()
    }
}

/// Most frequent class index; ties go to the lower index.
pub(crate) fn majority_vote(votes: impl Iterator<Item = usize>, n_classes: usize) -> usize {
    let mut counts = vec![0usize; n_classes.max(1)];
    for v in votes {
        if let Some(c) = counts.get_mut(v) {
            *c += 1;
        }
    }
    let mut best = 0;
    for (k, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_vote_ties_to_lower_index() {
        assert_eq!(majority_vote([2, 1, 2, 1].into_iter(), 3), 1);
        assert_eq!(majority_vote([0, 2, 2].into_iter(), 3), 2);
    }

    #[test]
    fn test_every_algorithm_fits_regression_or_rejects() {
        let x = Mat::from_fn(12, 2, |i, j| (i + j) as f64);
        let y: Vec<f64> = (0..12).map(|i| i as f64 * 2.0).collect();
        for algorithm in Algorithm::ALL {
            let fitted = Estimator::fit(algorithm, Task::Regression, &x, &y, 42);
            if algorithm == Algorithm::LogisticRegression {
                assert!(fitted.is_err());
            } else {
                let estimator = fitted.unwrap();
                assert_eq!(estimator.algorithm(), algorithm);
                assert_eq!(estimator.predict(&x).len(), 12);
            }
        }
    }

    #[test]
    fn test_json_tags_algorithm() {
        let x = Mat::from_fn(3, 1, |i, _| i as f64);
        let estimator =
            Estimator::fit(Algorithm::LinearRegression, Task::Regression, &x, &[1.0, 2.0, 3.0], 0)
                .unwrap();
        let json = serde_json::to_string(&estimator).unwrap();
        assert!(json.contains("\"algorithm\":\"LinearRegression\""));
    }
}
