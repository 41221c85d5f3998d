//! Repeated random train/test partitions.

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SplitError {
    #[display("test fraction must be in (0, 1), got {value}")]
    InvalidTestFraction { value: f64 },
    #[display(
        "{n_examples} examples cannot be split into {n_train} training and {n_test} test examples"
    )]
    TooFewExamples {
        n_examples: usize,
        n_train: usize,
        n_test: usize,
    },
}

/// One train/test partition of the example indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Training indices, in shuffled order.
    pub train: Vec<usize>,
    /// Test indices, sorted ascending.
    pub test: Vec<usize>,
}

/// Generates `n_splits` independent random partitions.
///
/// Each split draws a fresh permutation of all example indices: the first
/// `n_test = ceil(test_fraction · n)` become the test set, the rest the
/// training set. One generator is seeded once for the whole sequence, so the
/// splits depend only on the seed and not on how they are consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuffleSplit {
    n_examples: usize,
    n_splits: usize,
    n_test: usize,
    seed: u64,
}

impl ShuffleSplit {
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn new(
        n_examples: usize,
        n_splits: usize,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Self, SplitError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(SplitError::InvalidTestFraction {
                value: test_fraction,
            });
        }
        let n_test = (test_fraction * n_examples as f64).ceil() as usize;
        let n_train = n_examples.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(SplitError::TooFewExamples {
                n_examples,
                n_train,
                n_test,
            });
        }
        Ok(Self {
            n_examples,
            n_splits,
            n_test,
            seed,
        })
    }

    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    #[must_use]
    pub fn n_test(&self) -> usize {
        self.n_test
    }

    #[must_use]
    pub fn n_train(&self) -> usize {
        self.n_examples - self.n_test
    }

    /// Iterates over the splits, in order.
    pub fn iter(&self) -> impl Iterator<Item = Split> + use<> {
        let mut rng = Pcg64::seed_from_u64(self.seed);
        let n_examples = self.n_examples;
        let n_test = self.n_test;
        (0..self.n_splits).map(move |_| {
            let mut permutation = (0..n_examples).collect::<Vec<_>>();
            permutation.shuffle(&mut rng);
            let train = permutation.split_off(n_test);
            let mut test = permutation;
            test.sort_unstable();
            Split { train, test }
        })
    }
}
