//! Repeated train/test evaluation of every method.
//!
//! For each split, and for each method in configured order, the harness fits
//! the method on the training indices and records its predictions on the test
//! indices in the [`ResultsStore`]. Cells that are already present are kept
//! unless `overwrite` is set, so an interrupted run resumes where it stopped.

use std::collections::BTreeMap;

use crowdeval_classifier::{FeatureMatrix, FitError, FitOptions, Method, Target};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::{
    results::{ResultsStore, SplitPredictions, StoreError},
    split::{ShuffleSplit, SplitError},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum HarnessError {
    #[display("no features configured for method {method}")]
    MissingFeatures { method: Method },
    #[display("no training target configured for method {method}")]
    MissingTarget { method: Method },
    #[display("inputs for method {method} cover {found} examples, expected {expected}")]
    ExampleCount {
        method: Method,
        expected: usize,
        found: usize,
    },
    #[display("invalid training target: {_0}")]
    Target(FitError),
    #[display("results store does not match this run: {reason}")]
    StoreMismatch { reason: String },
    #[display("invalid split configuration: {_0}")]
    #[from]
    Split(SplitError),
    #[display("method {method} failed on split {split}: {source}")]
    Fit {
        method: Method,
        split: usize,
        source: FitError,
    },
    #[display("failed to update results store: {_0}")]
    #[from]
    Store(StoreError),
}

/// Parameters of one harness run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Methods in evaluation order.
    pub methods: Vec<Method>,
    pub n_splits: usize,
    pub test_fraction: f64,
    pub shuffle_seed: u64,
    /// Base seed for the per-cell generators handed to the methods.
    pub fit_seed: u64,
    pub fit: FitOptions,
    /// Recompute cells that are already in the store.
    pub overwrite: bool,
}

/// How many cells a run computed and how many it left untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub computed: usize,
    pub skipped: usize,
}

/// Evaluates methods over repeated splits, each with its own features and target.
#[derive(Debug, Default, Clone)]
pub struct SplitEvaluationHarness<'a> {
    features: BTreeMap<Method, &'a FeatureMatrix>,
    targets: BTreeMap<Method, Target<'a>>,
}

impl<'a> SplitEvaluationHarness<'a> {
    #[must_use]
    pub fn new(
        features: BTreeMap<Method, &'a FeatureMatrix>,
        targets: BTreeMap<Method, Target<'a>>,
    ) -> Self {
        Self { features, targets }
    }

    /// Registers the inputs of `method`, replacing any previous ones.
    #[must_use]
    pub fn with_method(
        mut self,
        method: Method,
        features: &'a FeatureMatrix,
        target: Target<'a>,
    ) -> Self {
        self.features.insert(method, features);
        self.targets.insert(method, target);
        self
    }

    /// Runs every (split, method) cell, writing results into `store`.
    ///
    /// All inputs are validated before the first fit. The store is persisted
    /// after every split that computed at least one cell.
    pub fn run(
        &self,
        config: &HarnessConfig,
        store: &mut ResultsStore,
    ) -> Result<RunReport, HarnessError> {
        let n_examples = self.validate(config, store)?;
        let splits = ShuffleSplit::new(
            n_examples,
            config.n_splits,
            config.test_fraction,
            config.shuffle_seed,
        )?;

        let mut report = RunReport::default();
        for (split_index, split) in splits.iter().enumerate() {
            log::info!("Test {}/{}", split_index + 1, config.n_splits);
            let mut computed_in_split = 0;
            for (method_index, &method) in config.methods.iter().enumerate() {
                log::info!(
                    "Method {method} ({}/{})",
                    method_index + 1,
                    config.methods.len()
                );
                if !config.overwrite && store.contains(method, split_index) {
                    log::debug!("Skipping {method} on split {split_index}: already computed");
                    report.skipped += 1;
                    continue;
                }

                let features = self.features[&method];
                let target = self.targets[&method];
                let mut rng = cell_rng(config.fit_seed, split_index, method);
                let output = method
                    .fit_and_predict(
                        features,
                        target,
                        &split.train,
                        &split.test,
                        &config.fit,
                        &mut rng,
                    )
                    .map_err(|source| HarnessError::Fit {
                        method,
                        split: split_index,
                        source,
                    })?;
                log::debug!(
                    "{method} on split {split_index}: {}/{} valid predictions",
                    output.valid_count(),
                    split.test.len()
                );
                let predictions =
                    SplitPredictions::from_test_output(n_examples, &split.test, &output);
                store.insert(method, split_index, predictions)?;
                computed_in_split += 1;
            }
            if computed_in_split > 0 {
                store.persist()?;
            }
            report.computed += computed_in_split;
        }
        Ok(report)
    }

    /// Checks every input against the configuration and the store; returns
    /// the shared example count.
    fn validate(
        &self,
        config: &HarnessConfig,
        store: &ResultsStore,
    ) -> Result<usize, HarnessError> {
        let metadata = store.metadata();
        if metadata.methods != config.methods {
            return Err(HarnessError::StoreMismatch {
                reason: format!(
                    "store methods {:?}, run methods {:?}",
                    metadata.methods, config.methods
                ),
            });
        }
        if metadata.n_splits != config.n_splits {
            return Err(HarnessError::StoreMismatch {
                reason: format!(
                    "store has {} splits, run has {}",
                    metadata.n_splits, config.n_splits
                ),
            });
        }

        let expected = metadata.n_examples;
        for &method in &config.methods {
            let features = self
                .features
                .get(&method)
                .ok_or(HarnessError::MissingFeatures { method })?;
            let target = self
                .targets
                .get(&method)
                .ok_or(HarnessError::MissingTarget { method })?;
            method.check_target(target).map_err(HarnessError::Target)?;
            for found in [features.n_examples(), target.n_examples()] {
                if found != expected {
                    return Err(HarnessError::ExampleCount {
                        method,
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(expected)
    }
}

/// Generator for one (split, method) cell.
///
/// Cells never share generator state, so a cell's predictions do not depend
/// on which other cells were computed or skipped.
fn cell_rng(fit_seed: u64, split: usize, method: Method) -> Pcg64 {
    let mut seed = [0; 32];
    seed[..8].copy_from_slice(&fit_seed.to_le_bytes());
    seed[8..16].copy_from_slice(&(split as u64).to_le_bytes());
    seed[16..24].copy_from_slice(&(method as u64).to_le_bytes());
    Pcg64::from_seed(seed)
}
