//! L2-regularized logistic regression fitted by Newton's method.
//!
//! The objective is the weighted cross-entropy against targets in `[0, 1]`
//! plus `‖w‖² / (2C)` over the feature weights (the bias is not penalized).
//! Targets may be soft, which lets the EM classifier reuse this model for its
//! M-step.

use crate::{
    FeatureMatrix,
    features::Standardizer,
    linalg,
};

/// Ridge added to the bias entry of the Hessian.
const BIAS_RIDGE: f64 = 1e-9;

/// The Newton system could not be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("logistic regression Hessian is singular")]
pub struct SingularHessianError;

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegression {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the largest Newton step component.
    pub tolerance: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Sample weights that give each class the same total weight.
///
/// Each example of class `k` gets `n / (2 · n_k)`. With a single class
/// present every weight is 1.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn balanced_weights(labels: &[bool]) -> Vec<f64> {
    let n = labels.len();
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return vec![1.0; n];
    }
    let pos_weight = n as f64 / (2.0 * positives as f64);
    let neg_weight = n as f64 / (2.0 * negatives as f64);
    labels
        .iter()
        .map(|&l| if l { pos_weight } else { neg_weight })
        .collect()
}

impl LogisticRegression {
    /// Fits the model.
    ///
    /// `targets` are probabilities of the positive class, one per row of
    /// `features`. `sample_weights`, if given, scale each row's loss.
    ///
    /// # Panics
    ///
    /// Panics if the lengths of `targets` or `sample_weights` differ from the
    /// number of rows.
    pub fn fit(
        &self,
        features: &FeatureMatrix,
        targets: &[f64],
        sample_weights: Option<&[f64]>,
    ) -> Result<LogisticModel, SingularHessianError> {
        assert_eq!(features.n_examples(), targets.len());
        if let Some(w) = sample_weights {
            assert_eq!(w.len(), targets.len());
        }

        let standardizer = Standardizer::fit(features);
        let rows = features
            .rows()
            .map(|row| standardizer.transform_with_bias(row))
            .collect::<Vec<_>>();
        let dim = features.n_features() + 1;
        let lambda = 1.0 / self.c;
        let mut weights = vec![0.0; dim];

        for _ in 0..self.max_iterations {
            let mut gradient = vec![0.0; dim];
            let mut hessian = vec![0.0; dim * dim];
            for (i, x) in rows.iter().enumerate() {
                let s = sample_weights.map_or(1.0, |w| w[i]);
                let p = sigmoid(dot(&weights, x));
                let residual = s * (p - targets[i]);
                let curvature = s * p * (1.0 - p);
                for a in 0..dim {
                    gradient[a] += residual * x[a];
                    for b in 0..dim {
                        hessian[a * dim + b] += curvature * x[a] * x[b];
                    }
                }
            }
            hessian[0] += BIAS_RIDGE;
            for a in 1..dim {
                gradient[a] += lambda * weights[a];
                hessian[a * dim + a] += lambda;
            }

            let step = linalg::solve(hessian, gradient).ok_or(SingularHessianError)?;
            let max_step = step.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
            for (w, d) in weights.iter_mut().zip(&step) {
                *w -= d;
            }
            if max_step < self.tolerance {
                break;
            }
        }

        Ok(LogisticModel {
            standardizer,
            weights,
        })
    }
}

/// A fitted logistic regression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    standardizer: Standardizer,
    /// Bias first, then one weight per standardized feature.
    weights: Vec<f64>,
}

impl LogisticModel {
    /// Linear score `w · x` for a raw feature row.
    #[must_use]
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        dot(&self.weights, &self.standardizer.transform_with_bias(row))
    }

    /// Probability that `row` is positive.
    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The same model with the classes swapped: `p(x)` becomes `1 - p(x)`.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            standardizer: self.standardizer.clone(),
            weights: self.weights.iter().map(|w| -w).collect(),
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln σ(z)`, stable for large `|z|`.
pub(crate) fn ln_sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        -(-z).exp().ln_1p()
    } else {
        z - z.exp().ln_1p()
    }
}
