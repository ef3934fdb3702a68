use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

use super::estimator::{majority_vote, Task};

pub const DEFAULT_NEIGHBORS: usize = 5;

/// Euclidean k-nearest-neighbors over the stored training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    pub k: usize,
    pub task: Task,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl KNearestNeighbors {
    pub fn fit(x: &Mat<f64>, y: &[f64], task: Task, k: usize) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() || k == 0 {
            return Err(PipelineError::insufficient(
                "train",
                format!("{} feature rows for {} targets", x.nrows(), y.len()),
            ));
        }
        let rows = (0..x.nrows())
            .map(|i| (0..x.ncols()).map(|j| x[(i, j)]).collect())
            .collect();
        Ok(Self {
            k,
            task,
            rows,
            targets: y.to_vec(),
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut distances: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, stored)| {
                let d = stored
                    .iter()
                    .zip(row)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>();
                (d, i)
            })
            .collect();
        // Stable sort keeps training order among equidistant rows
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let neighbors = distances
            .iter()
            .take(self.k.min(self.rows.len()))
            .map(|&(_, i)| self.targets[i]);

        match self.task {
            Task::Regression => {
                let (sum, count) = neighbors.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                sum / count as f64
            }
            Task::Classification { n_classes } => {
                majority_vote(neighbors.map(|v| v as usize), n_classes) as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_averages_neighbors() {
        let x = Mat::from_fn(6, 1, |i, _| i as f64);
        let y = vec![0.0, 10.0, 20.0, 30.0, 40.0, 1000.0];
        let model = KNearestNeighbors::fit(&x, &y, Task::Regression, 3).unwrap();
        // neighbors of 1.1 are rows 1, 2, 0
        assert!((model.predict_row(&[1.1]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = Mat::from_fn(2, 1, |i, _| i as f64);
        let model =
            KNearestNeighbors::fit(&x, &[1.0, 3.0], Task::Regression, DEFAULT_NEIGHBORS).unwrap();
        assert!((model.predict_row(&[0.0]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_classification_majority() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let y = vec![0.0, 0.0, 1.0, 1.0, 1.0];
        let model =
            KNearestNeighbors::fit(&x, &y, Task::Classification { n_classes: 2 }, 3).unwrap();
        assert_eq!(model.predict_row(&[4.0]), 1.0);
        assert_eq!(model.predict_row(&[0.0]), 0.0);
    }
}
