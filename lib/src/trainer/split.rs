//! Row partitioning for holdout evaluation and cross-validation.
//!
//! Both functions work on row positions only, so a split can be applied to
//! any dataset with [`Dataset::subset`](crate::dataset::Dataset::subset).

use crate::error::{PerfError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Row positions of a train/test partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle split.
///
/// Rows `0..n` are shuffled with `seed`; the first `ceil(n * test_size)`
/// shuffled rows form the test partition, the rest the training partition.
///
/// # Errors
/// [`PerfError::Config`] if `test_size` is not in `(0, 1)`;
/// [`PerfError::TrainingData`] if either partition would be empty.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PerfError::Config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PerfError::TrainingData(format!(
            "cannot split {} rows with test_size {}: a partition would be empty",
            n, test_size
        )));
    }

    let mut rows: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let train = rows.split_off(n_test);
    Ok(Split { train, test: rows })
}

/// K-fold cross-validation over contiguous, unshuffled folds.
///
/// Fold `i` is the `i`-th contiguous block of rows; the first `n % k` folds
/// hold one extra row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    /// # Errors
    /// [`PerfError::Config`] if `n_splits < 2`.
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(PerfError::Config(format!(
                "cross-validation needs at least 2 folds, got {}",
                n_splits
            )));
        }
        Ok(Self { n_splits })
    }

    /// Train/validation partitions of rows `0..n`, one per fold.
    ///
    /// # Errors
    /// [`PerfError::TrainingData`] if `n < n_splits`.
    pub fn split(&self, n: usize) -> Result<Vec<Split>> {
        let k = self.n_splits;
        if n < k {
            return Err(PerfError::TrainingData(format!(
                "{}-fold cross-validation needs at least {} rows, got {}",
                k, k, n
            )));
        }

        let base = n / k;
        let extra = n % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let size = base + usize::from(i < extra);
            let end = start + size;
            folds.push(Split {
                train: (0..start).chain(end..n).collect(),
                test: (start..end).collect(),
            });
            start = end;
        }
        Ok(folds)
    }
}
