use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    #[default]
    Regression,
    Classification,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::Regression => write!(f, "regression"),
            ProblemKind::Classification => write!(f, "classification"),
        }
    }
}

impl FromStr for ProblemKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "regression" => Ok(ProblemKind::Regression),
            "classification" => Ok(ProblemKind::Classification),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown problem kind '{}', expected regression or classification",
                other
            ))),
        }
    }
}

/// Estimator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    LinearRegression,
    LogisticRegression,
    #[serde(rename = "KNN")]
    Knn,
    DecisionTree,
    RandomForest,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::LinearRegression,
        Algorithm::LogisticRegression,
        Algorithm::Knn,
        Algorithm::DecisionTree,
        Algorithm::RandomForest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::LinearRegression => "LinearRegression",
            Algorithm::LogisticRegression => "LogisticRegression",
            Algorithm::Knn => "KNN",
            Algorithm::DecisionTree => "DecisionTree",
            Algorithm::RandomForest => "RandomForest",
        }
    }

    pub fn supports(self, kind: ProblemKind) -> bool {
        match self {
            Algorithm::LinearRegression => kind == ProblemKind::Regression,
            Algorithm::LogisticRegression => kind == ProblemKind::Classification,
            Algorithm::Knn | Algorithm::DecisionTree | Algorithm::RandomForest => true,
        }
    }

    /// Resolve an algorithm name for `kind`, rejecting pairs outside the supported set.
    pub fn resolve(kind: ProblemKind, name: &str) -> Result<Algorithm> {
        let unsupported = || PipelineError::UnsupportedAlgorithm {
            kind: kind.to_string(),
            algorithm: name.to_string(),
        };
        let algorithm = Algorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(unsupported)?;
        if algorithm.supports(kind) {
            Ok(algorithm)
        } else {
            Err(unsupported())
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_pairs() {
        use Algorithm::*;
        for algorithm in [LinearRegression, Knn, DecisionTree, RandomForest] {
            assert!(algorithm.supports(ProblemKind::Regression));
        }
        for algorithm in [LogisticRegression, Knn, DecisionTree, RandomForest] {
            assert!(algorithm.supports(ProblemKind::Classification));
        }
        assert!(!LogisticRegression.supports(ProblemKind::Regression));
        assert!(!LinearRegression.supports(ProblemKind::Classification));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(
            Algorithm::resolve(ProblemKind::Regression, "knn").unwrap(),
            Algorithm::Knn
        );
        assert_eq!(
            Algorithm::resolve(ProblemKind::Classification, "randomforest").unwrap(),
            Algorithm::RandomForest
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_and_invalid_pairs() {
        assert!(matches!(
            Algorithm::resolve(ProblemKind::Regression, "LogisticRegression"),
            Err(PipelineError::UnsupportedAlgorithm { .. })
        ));
        assert!(matches!(
            Algorithm::resolve(ProblemKind::Regression, "SVM"),
            Err(PipelineError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_problem_kind_parse() {
        assert_eq!(
            "Classification".parse::<ProblemKind>().unwrap(),
            ProblemKind::Classification
        );
        assert!("clustering".parse::<ProblemKind>().is_err());
    }
}
