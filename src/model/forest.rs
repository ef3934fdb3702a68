use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

use super::estimator::{majority_vote, Task};
use super::tree::{DecisionTree, TreeParams};

pub const DEFAULT_TREES: usize = 100;

/// Bagged ensemble of CART trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub task: Task,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Each tree sees a bootstrap sample of the rows. Classification trees
    /// consider `sqrt(p)` random features per split, regression trees all of them.
    pub fn fit(x: &Mat<f64>, y: &[f64], task: Task, n_trees: usize, seed: u64) -> Result<Self> {
        let n = x.nrows();
        if n == 0 || n != y.len() || n_trees == 0 {
            return Err(PipelineError::insufficient(
                "train",
                format!("random forest on {} rows with {} trees", n, n_trees),
            ));
        }

        let params = TreeParams {
            max_features: match task {
                Task::Classification { .. } => {
                    Some(((x.ncols() as f64).sqrt().floor() as usize).max(1))
                }
                Task::Regression => None,
            },
            ..Default::default()
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, y, &bootstrap, task, params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { task, trees })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let votes = self.trees.iter().map(|t| t.predict_row(row));
        match self.task {
            Task::Regression => votes.sum::<f64>() / self.trees.len() as f64,
            Task::Classification { n_classes } => {
                majority_vote(votes.map(|v| v as usize), n_classes) as f64
            }
        }
    }
}
