//! Randomized corruption of ground-truth labels into a crowd label panel.
//!
//! # Noise model
//!
//! Each labeller `j` has a true positive rate `tpr[j]` and a false positive
//! rate `fpr[j]` (see [`LabellerProfile::assign`]). For every example `i`:
//!
//! - if the truth is positive, labeller `j` reports negative with probability `1 - tpr[j]`
//! - if the truth is negative, labeller `j` reports positive with probability `fpr[j]`
//!
//! Every cell is then hidden with probability `mask_rate`, independently of the
//! label. A *higher* mask rate means *more* missing labels.
//!
//! # Randomness
//!
//! All draws come from the generator passed to [`LabelCorruptionModel::generate`],
//! in a fixed order (rate permutations, then flips labeller by labeller, then
//! masks), so a seeded generator gives a reproducible panel.

use rand::Rng;
use rand_distr::{Bernoulli, BernoulliError, Distribution as _};

use crate::{CrowdLabel, CrowdLabelPanel, LabellerProfile, RateRange};

/// Parameters of the synthetic crowd.
#[derive(Debug, Clone, Copy)]
pub struct LabelCorruptionModel {
    n_labellers: usize,
    tpr_range: RateRange,
    fpr_range: RateRange,
    mask: Bernoulli,
}

impl LabelCorruptionModel {
    /// Creates a corruption model.
    ///
    /// Fails if `mask_rate` is not a probability.
    pub fn new(
        n_labellers: usize,
        tpr_range: RateRange,
        fpr_range: RateRange,
        mask_rate: f64,
    ) -> Result<Self, BernoulliError> {
        Ok(Self {
            n_labellers,
            tpr_range,
            fpr_range,
            mask: Bernoulli::new(mask_rate)?,
        })
    }

    #[must_use]
    pub fn n_labellers(&self) -> usize {
        self.n_labellers
    }

    /// Simulates the crowd on `ground_truth`.
    ///
    /// The result has `n_labellers × ground_truth.len()` cells. With zero
    /// labellers the panel is empty.
    pub fn generate<R>(&self, ground_truth: &[bool], rng: &mut R) -> CrowdLabelPanel
    where
        R: Rng + ?Sized,
    {
        let profiles =
            LabellerProfile::assign(self.n_labellers, self.tpr_range, self.fpr_range, rng);

        let mut labels = Vec::with_capacity(profiles.len() * ground_truth.len());
        for profile in &profiles {
            labels.extend(ground_truth.iter().map(|&truth| {
                if truth {
                    // `random` is in [0, 1), so a rate of 1.0 never flips
                    rng.random::<f64>() <= profile.true_positive_rate
                } else {
                    rng.random::<f64>() < profile.false_positive_rate
                }
            }));
        }

        let cells = labels
            .into_iter()
            .map(|label| {
                if self.mask.sample(rng) {
                    CrowdLabel::Missing
                } else {
                    CrowdLabel::Observed(label)
                }
            })
            .collect();

        CrowdLabelPanel::new(profiles, ground_truth.len(), cells)
    }
}
