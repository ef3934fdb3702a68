//! Held-out evaluation metrics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub r2: f64,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metrics {
    Regression(RegressionMetrics),
    Classification(ClassificationMetrics),
}

/// Mean squared error and coefficient of determination.
///
/// When the held-out target is constant, R² is 1.0 for a perfect fit and
/// 0.0 otherwise.
pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return RegressionMetrics {
            mse: 0.0,
            r2: 0.0,
            n_samples: 0,
        };
    }
    let mean = y_true[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true[..n].iter().map(|t| (t - mean).powi(2)).sum();

    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    RegressionMetrics {
        mse: ss_res / n as f64,
        r2,
        n_samples: n,
    }
}

/// Accuracy plus per-class precision, recall and F1.
///
/// Only classes that occur in either `y_true` or `y_pred` are reported.
/// Undefined ratios (no predictions or no support) count as 0.
pub fn classification_metrics(
    y_true: &[usize],
    y_pred: &[usize],
    classes: &[String],
) -> ClassificationMetrics {
    let n = y_true.len().min(y_pred.len());
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    let accuracy = if n == 0 { 0.0 } else { correct as f64 / n as f64 };

    let mut per_class = Vec::new();
    for (k, label) in classes.iter().enumerate() {
        let support = y_true[..n].iter().filter(|&&t| t == k).count();
        let predicted = y_pred[..n].iter().filter(|&&p| p == k).count();
        if support == 0 && predicted == 0 {
            continue;
        }
        let tp = y_true
            .iter()
            .zip(y_pred)
            .filter(|(&t, &p)| t == k && p == k)
            .count();
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        per_class.push(ClassMetrics {
            label: label.clone(),
            precision,
            recall,
            f1,
            support,
        });
    }

    let macro_avg = average(&per_class, |_| 1.0);
    let weighted_avg = average(&per_class, |c| c.support as f64);

    ClassificationMetrics {
        accuracy,
        per_class,
        macro_avg,
        weighted_avg,
        n_samples: n,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn average(classes: &[ClassMetrics], weight: impl Fn(&ClassMetrics) -> f64) -> AveragedMetrics {
    let total: f64 = classes.iter().map(&weight).sum();
    if total == 0.0 {
        return AveragedMetrics {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }
    let avg = |f: fn(&ClassMetrics) -> f64| {
        classes.iter().map(|c| f(c) * weight(c)).sum::<f64>() / total
    };
    AveragedMetrics {
        precision: avg(|c| c.precision),
        recall: avg(|c| c.recall),
        f1: avg(|c| c.f1),
    }
}
