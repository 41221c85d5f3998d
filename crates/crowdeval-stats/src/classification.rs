//! Binary classification metrics.
//!
//! Predictions are compared against ground truth through a 2×2 confusion
//! matrix. The headline metric is balanced accuracy, the unweighted mean of
//! the recall of each class, which does not reward predicting the majority
//! class on imbalanced data.

/// Rounds a soft prediction (probability of the positive class) to a label.
///
/// Ties round down, so `0.5` is a negative prediction.
///
/// ```
/// use crowdeval_stats::classification::round_prediction;
///
/// assert!(round_prediction(0.51));
/// assert!(!round_prediction(0.5));
/// assert!(!round_prediction(0.0));
/// ```
#[must_use]
pub fn round_prediction(probability: f64) -> bool {
    probability > 0.5
}

/// Confusion counts for a binary classifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
}

impl ConfusionMatrix {
    /// Builds a confusion matrix from `(actual, predicted)` label pairs.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut cm = Self::default();
        for pair in pairs {
            cm.record(pair.0, pair.1);
        }
        cm
    }

    /// Adds one observation.
    pub fn record(&mut self, actual: bool, predicted: bool) {
        match (actual, predicted) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_positives += 1,
        }
    }

    /// Number of actual positives.
    #[must_use]
    pub fn positives(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    /// Number of actual negatives.
    #[must_use]
    pub fn negatives(&self) -> usize {
        self.true_negatives + self.false_positives
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.positives() + self.negatives()
    }

    /// Recall of the positive class (sensitivity). `None` without actual positives.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn true_positive_rate(&self) -> Option<f64> {
        let p = self.positives();
        (p > 0).then(|| self.true_positives as f64 / p as f64)
    }

    /// Recall of the negative class (specificity). `None` without actual negatives.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn true_negative_rate(&self) -> Option<f64> {
        let n = self.negatives();
        (n > 0).then(|| self.true_negatives as f64 / n as f64)
    }

    /// Fraction of correct predictions. `None` when empty.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| (self.true_positives + self.true_negatives) as f64 / total as f64)
    }

    /// Balanced accuracy, `(TPR + TNR) / 2`.
    ///
    /// Returns `None` unless both classes are present among the actual labels,
    /// since the recall of an absent class is undefined.
    #[must_use]
    pub fn balanced_accuracy(&self) -> Option<f64> {
        let tpr = self.true_positive_rate()?;
        let tnr = self.true_negative_rate()?;
        Some(f64::midpoint(tpr, tnr))
    }
}
