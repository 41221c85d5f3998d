//! Balanced-accuracy scoring of stored predictions.

use crowdeval_classifier::Method;
use crowdeval_stats::{
    classification::{ConfusionMatrix, round_prediction},
    descriptive::DescriptiveStats,
};

use crate::results::ResultsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{found} ground-truth labels given for a store of {expected} examples")]
pub struct LabelCountError {
    pub expected: usize,
    pub found: usize,
}

/// Balanced accuracy of one method across all splits.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSummary {
    pub method: Method,
    /// One entry per split; `None` where the split could not be scored.
    pub scores: Vec<Option<f64>>,
    pub mean: f64,
    /// Population standard deviation over the scored splits.
    pub std_dev: f64,
}

impl MethodSummary {
    /// Scores of the splits that could be evaluated.
    pub fn evaluated(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().flatten().copied()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.scores.iter().filter(|s| s.is_none()).count()
    }
}

/// Scores the cells of a results store against ground truth.
#[derive(Debug, Clone, Copy)]
pub struct ResultsAggregator<'a> {
    store: &'a ResultsStore,
    labels: &'a [bool],
}

impl<'a> ResultsAggregator<'a> {
    pub fn new(store: &'a ResultsStore, labels: &'a [bool]) -> Result<Self, LabelCountError> {
        let expected = store.metadata().n_examples;
        if labels.len() != expected {
            return Err(LabelCountError {
                expected,
                found: labels.len(),
            });
        }
        Ok(Self { store, labels })
    }

    /// Balanced accuracy of `method` on `split`, over valid predictions only.
    ///
    /// `None` if the cell is missing, holds no valid prediction, or its valid
    /// examples all belong to one class.
    #[must_use]
    pub fn balanced_accuracy(&self, method: Method, split: usize) -> Option<f64> {
        self.confusion_matrix(method, split)?.balanced_accuracy()
    }

    #[must_use]
    pub fn confusion_matrix(&self, method: Method, split: usize) -> Option<ConfusionMatrix> {
        let cell = self.store.get(method, split)?;
        Some(ConfusionMatrix::from_pairs(
            cell.valid()
                .map(|(example, p)| (self.labels[example], round_prediction(p))),
        ))
    }

    /// Summary over all splits of `method`; `None` if no split could be scored.
    #[must_use]
    pub fn summary(&self, method: Method) -> Option<MethodSummary> {
        let scores = (0..self.store.metadata().n_splits)
            .map(|split| self.balanced_accuracy(method, split))
            .collect::<Vec<_>>();
        let stats = DescriptiveStats::new(scores.iter().flatten().copied())?;
        Some(MethodSummary {
            method,
            scores,
            mean: stats.mean,
            std_dev: stats.std_dev,
        })
    }

    /// Summaries for every method of the store, in store order.
    ///
    /// Methods without any scored split are left out.
    #[must_use]
    pub fn summaries(&self) -> Vec<MethodSummary> {
        self.store
            .metadata()
            .methods
            .iter()
            .filter_map(|&method| {
                let summary = self.summary(method);
                if summary.is_none() {
                    log::warn!("No split could be scored for method {method}");
                }
                summary
            })
            .collect()
    }
}
