//! Crowd-aware logistic regression trained by expectation maximization.
//!
//! The model treats the true label `z_i` of each example as latent. Each
//! labeller `j` has a sensitivity `α_j = P(y_ij = 1 | z_i = 1)` and a
//! specificity `β_j = P(y_ij = 0 | z_i = 0)`, and the prior `P(z_i = 1)` is a
//! logistic regression on the example's features.
//!
//! # Algorithm
//!
//! 1. Initialize posteriors `μ_i = P(z_i = 1 | y, x)`.
//! 2. **M-step**: estimate `α_j`, `β_j` from `μ` over the cells labeller `j`
//!    observed, and refit the logistic regression on soft targets `μ`.
//! 3. **E-step**: recompute `μ_i ∝ a_i p_i` against `b_i (1 - p_i)`, where
//!    `a_i`, `b_i` are the likelihoods of the observed votes under each class.
//! 4. Repeat until the marginal log-likelihood stops improving.
//!
//! Missing cells contribute nothing to any of these sums.
//!
//! # Restarts
//!
//! EM converges to a local optimum. The first restart initializes `μ` from the
//! observed vote fraction, later restarts from uniform random draws; the
//! restart with the highest log-likelihood is kept.
//!
//! # Orientation
//!
//! Swapping the two classes leaves the likelihood unchanged: `μ` becomes
//! `1 - μ`, the classifier is negated and `(α, β)` becomes `(1 - β, 1 - α)`.
//! Before restarts are compared, each fit is swapped if needed so that its
//! predictions agree with the observed vote fractions. When the votes carry
//! no preference, the orientation with `mean α + mean β ≥ 1` is used.

use std::cmp::Ordering;

use crowdeval_crowd::{Consensus, CrowdLabelPanel, majority_vote};
use rand::Rng;

use crate::{
    FeatureMatrix,
    logistic::{LogisticModel, LogisticRegression, SingularHessianError, ln_sigmoid},
};

/// Labeller rates are kept away from 0 and 1 so their logarithms stay finite.
const RATE_EPSILON: f64 = 1e-6;

/// EM hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaykarClassifier {
    pub n_restarts: usize,
    pub max_iterations: usize,
    /// Stop once the log-likelihood improves by less than this.
    pub tolerance: f64,
    /// Classifier used for the M-step.
    pub logistic: LogisticRegression,
}

impl Default for RaykarClassifier {
    fn default() -> Self {
        Self {
            n_restarts: 5,
            max_iterations: 100,
            tolerance: 1e-6,
            logistic: LogisticRegression::default(),
        }
    }
}

/// A fitted crowd-aware classifier.
#[derive(Debug, Clone)]
pub struct RaykarModel {
    classifier: LogisticModel,
    /// Sensitivity per labeller.
    alpha: Vec<f64>,
    /// Specificity per labeller.
    beta: Vec<f64>,
    log_likelihood: f64,
}

impl RaykarModel {
    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        self.classifier.predict_proba(row)
    }

    #[must_use]
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    #[must_use]
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Mean of `α + β - 1` over labellers; positive when the crowd beats chance.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn crowd_informedness(&self) -> f64 {
        if self.alpha.is_empty() {
            return 0.0;
        }
        let total = self
            .alpha
            .iter()
            .zip(&self.beta)
            .map(|(a, b)| a + b - 1.0)
            .sum::<f64>();
        total / self.alpha.len() as f64
    }

    /// The class-swapped model with the same likelihood.
    fn swapped(&self) -> Self {
        Self {
            classifier: self.classifier.negated(),
            alpha: self.beta.iter().map(|b| 1.0 - b).collect(),
            beta: self.alpha.iter().map(|a| 1.0 - a).collect(),
            log_likelihood: self.log_likelihood,
        }
    }

    /// Covariance-like agreement between predictions and vote fractions.
    fn vote_agreement(&self, features: &FeatureMatrix, votes: &[Option<f64>]) -> f64 {
        features
            .rows()
            .zip(votes)
            .filter_map(|(row, vote)| Some((self.predict_proba(row) - 0.5) * ((*vote)? - 0.5)))
            .sum()
    }

    fn oriented(self, features: &FeatureMatrix, votes: &[Option<f64>]) -> Self {
        let swap = match self.vote_agreement(features, votes).partial_cmp(&0.0) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => self.crowd_informedness() < 0.0,
        };
        if swap { self.swapped() } else { self }
    }
}

impl RaykarClassifier {
    /// Fits on `features` and the matching crowd `panel` (same examples, same order).
    ///
    /// Returns `Ok(None)` if the panel has no observed label at all.
    ///
    /// # Panics
    ///
    /// Panics if `features` and `panel` disagree on the number of examples.
    pub fn fit<R>(
        &self,
        features: &FeatureMatrix,
        panel: &CrowdLabelPanel,
        rng: &mut R,
    ) -> Result<Option<RaykarModel>, SingularHessianError>
    where
        R: Rng + ?Sized,
    {
        assert_eq!(features.n_examples(), panel.n_examples());
        if panel.observed_count() == 0 {
            return Ok(None);
        }

        let votes = majority_vote::reduce(panel)
            .iter()
            .map(Consensus::fraction)
            .collect::<Vec<_>>();
        let mut best: Option<RaykarModel> = None;
        for restart in 0..self.n_restarts.max(1) {
            let posteriors = if restart == 0 {
                votes.iter().map(|v| v.unwrap_or(0.5)).collect()
            } else {
                (0..panel.n_examples())
                    .map(|_| rng.random::<f64>())
                    .collect()
            };
            let model = self
                .run_em(features, panel, posteriors)?
                .oriented(features, &votes);
            log::debug!(
                "EM restart {}/{}: log-likelihood {:.4}",
                restart + 1,
                self.n_restarts,
                model.log_likelihood
            );
            if best
                .as_ref()
                .is_none_or(|b| model.log_likelihood > b.log_likelihood)
            {
                best = Some(model);
            }
        }
        Ok(best)
    }

    fn run_em(
        &self,
        features: &FeatureMatrix,
        panel: &CrowdLabelPanel,
        mut posteriors: Vec<f64>,
    ) -> Result<RaykarModel, SingularHessianError> {
        let mut model = self.maximize(features, panel, &posteriors)?;
        model.log_likelihood = expect(features, panel, &model, &mut posteriors);
        for _ in 1..self.max_iterations {
            let mut next = self.maximize(features, panel, &posteriors)?;
            next.log_likelihood = expect(features, panel, &next, &mut posteriors);
            let improvement = next.log_likelihood - model.log_likelihood;
            if improvement < 0.0 {
                break;
            }
            model = next;
            if improvement < self.tolerance {
                break;
            }
        }
        Ok(model)
    }

    fn maximize(
        &self,
        features: &FeatureMatrix,
        panel: &CrowdLabelPanel,
        posteriors: &[f64],
    ) -> Result<RaykarModel, SingularHessianError> {
        let mut alpha = Vec::with_capacity(panel.n_labellers());
        let mut beta = Vec::with_capacity(panel.n_labellers());
        for labeller in 0..panel.n_labellers() {
            let (mut pos_hits, mut pos_mass, mut neg_hits, mut neg_mass) = (0.0, 0.0, 0.0, 0.0);
            for (cell, &mu) in panel.labeller_row(labeller).iter().zip(posteriors) {
                if let Some(label) = cell.observed() {
                    pos_mass += mu;
                    neg_mass += 1.0 - mu;
                    if label {
                        pos_hits += mu;
                    } else {
                        neg_hits += 1.0 - mu;
                    }
                }
            }
            alpha.push(rate(pos_hits, pos_mass));
            beta.push(rate(neg_hits, neg_mass));
        }
        let classifier = self.logistic.fit(features, posteriors, None)?;
        Ok(RaykarModel {
            classifier,
            alpha,
            beta,
            log_likelihood: f64::NEG_INFINITY,
        })
    }
}

fn rate(hits: f64, mass: f64) -> f64 {
    if mass <= 0.0 {
        0.5
    } else {
        (hits / mass).clamp(RATE_EPSILON, 1.0 - RATE_EPSILON)
    }
}

/// E-step: updates `posteriors` in place and returns the marginal log-likelihood.
fn expect(
    features: &FeatureMatrix,
    panel: &CrowdLabelPanel,
    model: &RaykarModel,
    posteriors: &mut [f64],
) -> f64 {
    let mut log_likelihood = 0.0;
    for (example, mu) in posteriors.iter_mut().enumerate() {
        let z = model.classifier.decision_function(features.row(example));
        let mut ln_positive = ln_sigmoid(z);
        let mut ln_negative = ln_sigmoid(-z);
        for (labeller, cell) in panel.example_column(example).enumerate() {
            let Some(label) = cell.observed() else {
                continue;
            };
            let (a, b) = (model.alpha[labeller], model.beta[labeller]);
            if label {
                ln_positive += a.ln();
                ln_negative += (1.0 - b).ln();
            } else {
                ln_positive += (1.0 - a).ln();
                ln_negative += b.ln();
            }
        }
        let ln_total = log_sum_exp(ln_positive, ln_negative);
        *mu = (ln_positive - ln_total).exp();
        log_likelihood += ln_total;
    }
    log_likelihood
}

fn log_sum_exp(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}
