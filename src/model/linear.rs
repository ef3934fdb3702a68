//! Ordinary least squares via the normal equations

use faer::prelude::*;
use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Relative ridge term keeping XᵀX invertible when features are collinear
const RIDGE_EPS: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegression {
    pub fn fit(x: &Mat<f64>, y: &[f64]) -> Result<Self> {
        let (n, p) = (x.nrows(), x.ncols());
        if n == 0 || n != y.len() {
            return Err(PipelineError::insufficient(
                "train",
                format!("{} feature rows for {} targets", n, y.len()),
            ));
        }

        // Design matrix with a leading column of ones for the intercept
        let mut a = Mat::<f64>::zeros(n, p + 1);
        let mut b = Mat::<f64>::zeros(n, 1);
        for i in 0..n {
            a[(i, 0)] = 1.0;
            for j in 0..p {
                a[(i, j + 1)] = x[(i, j)];
            }
            b[(i, 0)] = y[i];
        }

        let mut ata = a.transpose() * &a;
        let atb = a.transpose() * &b;

        // Intercept stays unpenalized
        let scale = (0..=p).map(|k| ata[(k, k)].abs()).fold(0.0, f64::max).max(1.0);
        for k in 1..=p {
            ata[(k, k)] += RIDGE_EPS * scale;
        }

        let solution = ata.partial_piv_lu().solve(&atb);
        if (0..=p).any(|k| !solution[(k, 0)].is_finite()) {
            return Err(PipelineError::insufficient(
                "train",
                "least-squares system is singular",
            ));
        }
        Ok(Self {
            intercept: solution[(0, 0)],
            coefficients: (1..=p).map(|k| solution[(k, 0)]).collect(),
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}
