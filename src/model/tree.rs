//! CART decision tree stored as an index arena

use faer::Mat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

use super::estimator::{majority_vote, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Features examined per split; all of them when unset
    pub max_features: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_features: None,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub task: Task,
    pub nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `samples` (repeats allowed).
    pub fn fit(
        x: &Mat<f64>,
        y: &[f64],
        samples: &[usize],
        task: Task,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if samples.is_empty() || x.nrows() != y.len() {
            return Err(PipelineError::insufficient(
                "train",
                "decision tree needs at least one training row",
            ));
        }

        let mut tree = Self {
            task,
            nodes: Vec::new(),
        };
        // (node slot, rows, depth)
        let mut pending: Vec<(usize, Vec<usize>, usize)> = Vec::new();
        tree.nodes.push(Node::Leaf { value: 0.0 });
        pending.push((0, samples.to_vec(), 0));

        while let Some((slot, rows, depth)) = pending.pop() {
            let leaf_value = tree.leaf_value(y, &rows);
            let can_split = rows.len() >= params.min_samples_split.max(2)
                && params.max_depth.map_or(true, |d| depth < d)
                && tree.impurity(y, &rows) > 1e-12;

            let best = if can_split {
                tree.best_split(x, y, &rows, params.max_features, rng)
            } else {
                None
            };

            match best {
                Some(split) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                        .iter()
                        .copied()
                        .partition(|&i| x[(i, split.feature)] <= split.threshold);
                    let left = tree.nodes.len();
                    tree.nodes.push(Node::Leaf { value: 0.0 });
                    let right = tree.nodes.len();
                    tree.nodes.push(Node::Leaf { value: 0.0 });
                    tree.nodes[slot] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    pending.push((right, right_rows, depth + 1));
                    pending.push((left, left_rows, depth + 1));
                }
                None => tree.nodes[slot] = Node::Leaf { value: leaf_value },
            }
        }
        Ok(tree)
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    fn leaf_value(&self, y: &[f64], rows: &[usize]) -> f64 {
        match self.task {
            Task::Regression => rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64,
            Task::Classification { n_classes } => {
                majority_vote(rows.iter().map(|&i| y[i] as usize), n_classes) as f64
            }
        }
    }

    fn impurity(&self, y: &[f64], rows: &[usize]) -> f64 {
        match self.task {
            Task::Regression => {
                let mut acc = Moments::default();
                rows.iter().for_each(|&i| acc.add(y[i]));
                acc.mse()
            }
            Task::Classification { n_classes } => {
                let mut counts = vec![0usize; n_classes];
                rows.iter().for_each(|&i| counts[y[i] as usize] += 1);
                gini(&counts, rows.len())
            }
        }
    }

    fn best_split(
        &self,
        x: &Mat<f64>,
        y: &[f64],
        rows: &[usize],
        max_features: Option<usize>,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let p = x.ncols();
        let mut candidates: Vec<usize> = (0..p).collect();
        let quota = match max_features {
            Some(m) if m < p => {
                candidates.shuffle(rng);
                m.max(1)
            }
            _ => p,
        };

        let n = rows.len();
        let mut best: Option<BestSplit> = None;

        // Keep drawing past the quota until some feature yields a valid split
        for (examined, feature) in candidates.into_iter().enumerate() {
            if examined >= quota && best.is_some() {
                break;
            }
            let mut order = rows.to_vec();
            order.sort_by(|&a, &b| x[(a, feature)].total_cmp(&x[(b, feature)]));

            let mut scan = SplitScan::new(self.task, y, &order);
            for pos in 0..n - 1 {
                scan.move_left(y[order[pos]]);
                let here = x[(order[pos], feature)];
                let next = x[(order[pos + 1], feature)];
                if here >= next {
                    continue;
                }
                let impurity = scan.weighted_impurity(pos + 1, n);
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

/// Running sums for variance
#[derive(Debug, Default, Clone, Copy)]
struct Moments {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    fn add(&mut self, v: f64) {
        self.n += 1;
        self.sum += v;
        self.sum_sq += v * v;
    }

    fn remove(&mut self, v: f64) {
        self.n -= 1;
        self.sum -= v;
        self.sum_sq -= v * v;
    }

    fn mse(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let mean = self.sum / self.n as f64;
        (self.sum_sq / self.n as f64 - mean * mean).max(0.0)
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

/// Left/right statistics while sweeping a sorted feature
enum SplitScan {
    Regression {
        left: Moments,
        right: Moments,
    },
    Classification {
        left: Vec<usize>,
        right: Vec<usize>,
    },
}

impl SplitScan {
    fn new(task: Task, y: &[f64], order: &[usize]) -> Self {
        match task {
            Task::Regression => {
                let mut right = Moments::default();
                order.iter().for_each(|&i| right.add(y[i]));
                SplitScan::Regression {
                    left: Moments::default(),
                    right,
                }
            }
            Task::Classification { n_classes } => {
                let mut right = vec![0usize; n_classes];
                order.iter().for_each(|&i| right[y[i] as usize] += 1);
                SplitScan::Classification {
                    left: vec![0usize; n_classes],
                    right,
                }
            }
        }
    }

    fn move_left(&mut self, v: f64) {
        match self {
            SplitScan::Regression { left, right } => {
                left.add(v);
                right.remove(v);
            }
            SplitScan::Classification { left, right } => {
                left[v as usize] += 1;
                right[v as usize] -= 1;
            }
        }
    }

    fn weighted_impurity(&self, n_left: usize, n: usize) -> f64 {
        let n_right = n - n_left;
        let (l, r) = match self {
            SplitScan::Regression { left, right } => (left.mse(), right.mse()),
            SplitScan::Classification { left, right } => {
                (gini(left, n_left), gini(right, n_right))
            }
        };
        (n_left as f64 * l + n_right as f64 * r) / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn all_rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_unlimited_depth_fits_training_data() {
        let x = Mat::from_fn(8, 1, |i, _| i as f64);
        let y = vec![1.0, 4.0, 2.0, 8.0, 5.0, 7.0, 3.0, 6.0];
        let mut rng = StdRng::seed_from_u64(42);
        let tree = DecisionTree::fit(
            &x,
            &y,
            &all_rows(8),
            Task::Regression,
            TreeParams::default(),
            &mut rng,
        )
        .unwrap();
        for (i, expected) in y.iter().enumerate() {
            assert_eq!(tree.predict_row(&[i as f64]), *expected);
        }
    }

    #[test]
    fn test_classification_threshold() {
        let x = Mat::from_fn(6, 2, |i, j| if j == 0 { i as f64 } else { 1.0 });
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut rng = StdRng::seed_from_u64(42);
        let tree = DecisionTree::fit(
            &x,
            &y,
            &all_rows(6),
            Task::Classification { n_classes: 2 },
            TreeParams::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[2.4, 1.0]), 0.0);
        assert_eq!(tree.predict_row(&[2.6, 1.0]), 1.0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = Mat::from_fn(16, 1, |i, _| i as f64);
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let params = TreeParams {
            max_depth: Some(2),
            ..Default::default()
        };
        let tree =
            DecisionTree::fit(&x, &y, &all_rows(16), Task::Regression, params, &mut rng).unwrap();
        assert!(tree.depth() <= 2);
    }
}
