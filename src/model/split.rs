use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// Row indices of the training and held-out partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_ratio)` rows.
///
/// The same `(n, test_ratio, seed)` always yields the same partitions.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "test_ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::insufficient(
            "split",
            format!(
                "{} rows cannot be split into non-empty partitions at ratio {}",
                n, test_ratio
            ),
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_use_ceiling() {
        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let split = train_test_split(50, 0.2, 1).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_is_reproducible() {
        assert_eq!(
            train_test_split(30, 0.2, 42).unwrap(),
            train_test_split(30, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn test_single_row_cannot_split() {
        assert!(matches!(
            train_test_split(1, 0.2, 42),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
