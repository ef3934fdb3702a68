//! Multinomial logistic regression trained by batch gradient descent

use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const MAX_ITER: usize = 1000;
const LEARNING_RATE: f64 = 0.5;
/// Inverse regularization strength, as in an L2 penalty of `1 / (2C) * ||W||²`
const C: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub n_classes: usize,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    /// One row per class: bias followed by feature weights
    pub weights: Vec<Vec<f64>>,
}

impl LogisticRegression {
    /// Fit on `labels` given as class indices in `0..n_classes`.
    pub fn fit(x: &Mat<f64>, labels: &[usize], n_classes: usize) -> Result<Self> {
        let (n, p) = (x.nrows(), x.ncols());
        if n == 0 || n != labels.len() || n_classes == 0 {
            return Err(PipelineError::insufficient(
                "train",
                format!("{} feature rows for {} labels", n, labels.len()),
            ));
        }

        let (means, scales) = standardization(x);
        let z = Mat::from_fn(n, p, |i, j| (x[(i, j)] - means[j]) / scales[j]);

        let mut weights = vec![vec![0.0; p + 1]; n_classes];
        let mut probs = vec![0.0; n_classes];
        let penalty = 1.0 / (C * n as f64);

        for _ in 0..MAX_ITER {
            let mut grad = vec![vec![0.0; p + 1]; n_classes];
            for i in 0..n {
                softmax_into(&weights, |j| z[(i, j)], p, &mut probs);
                for (k, g) in grad.iter_mut().enumerate() {
                    let err = probs[k] - if labels[i] == k { 1.0 } else { 0.0 };
                    g[0] += err;
                    for j in 0..p {
                        g[j + 1] += err * z[(i, j)];
                    }
                }
            }
            for (w, g) in weights.iter_mut().zip(&grad) {
                w[0] -= LEARNING_RATE * g[0] / n as f64;
                for j in 1..=p {
                    w[j] -= LEARNING_RATE * (g[j] / n as f64 + penalty * w[j]);
                }
            }
        }

        Ok(Self {
            n_classes,
            means,
            scales,
            weights,
        })
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let p = self.means.len();
        let mut probs = vec![0.0; self.n_classes];
        softmax_into(
            &self.weights,
            |j| (row[j] - self.means[j]) / self.scales[j],
            p,
            &mut probs,
        );
        probs
    }

    /// Most probable class index; ties go to the lower index
    pub fn predict_row(&self, row: &[f64]) -> usize {
        let probs = self.predict_proba_row(row);
        let mut best = 0;
        for (k, &prob) in probs.iter().enumerate() {
            if prob > probs[best] {
                best = k;
            }
        }
        best
    }
}

/// Column means and standard deviations; constant columns get a scale of 1.
fn standardization(x: &Mat<f64>) -> (Vec<f64>, Vec<f64>) {
    let (n, p) = (x.nrows(), x.ncols());
    let mut means = vec![0.0; p];
    let mut scales = vec![1.0; p];
    for j in 0..p {
        let mean = (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64;
        let var = (0..n).map(|i| (x[(i, j)] - mean).powi(2)).sum::<f64>() / n as f64;
        means[j] = mean;
        if var > 1e-12 {
            scales[j] = var.sqrt();
        }
    }
    (means, scales)
}

fn softmax_into(weights: &[Vec<f64>], feature: impl Fn(usize) -> f64, p: usize, out: &mut [f64]) {
    for (k, w) in weights.iter().enumerate() {
        out[k] = w[0] + (0..p).map(|j| w[j + 1] * feature(j)).sum::<f64>();
    }
    let max = out.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for v in out.iter_mut() {
        *v = (*v - max).exp();
        total += *v;
    }
    for v in out.iter_mut() {
        *v /= total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separates_two_clusters() {
        let rows: Vec<[f64; 2]> = (0..20)
            .map(|i| {
                let offset = if i < 10 { 0.0 } else { 10.0 };
                [offset + (i % 5) as f64 * 0.3, offset - (i % 3) as f64 * 0.2]
            })
            .collect();
        let x = Mat::from_fn(rows.len(), 2, |i, j| rows[i][j]);
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();

        let model = LogisticRegression::fit(&x, &labels, 2).unwrap();
        assert_eq!(model.predict_row(&[0.5, 0.0]), 0);
        assert_eq!(model.predict_row(&[10.5, 10.0]), 1);

        let probs = model.predict_proba_row(&[5.0, 5.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_classes() {
        let x = Mat::from_fn(9, 1, |i, _| (i / 3) as f64 * 5.0 + (i % 3) as f64 * 0.1);
        let labels: Vec<usize> = (0..9).map(|i| i / 3).collect();
        let model = LogisticRegression::fit(&x, &labels, 3).unwrap();
        assert_eq!(model.predict_row(&[0.1]), 0);
        assert_eq!(model.predict_row(&[5.1]), 1);
        assert_eq!(model.predict_row(&[10.1]), 2);
    }
}
