use std::str::FromStr;

use crowdeval_crowd::{Consensus, CrowdLabelPanel};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    FeatureMatrix,
    logistic::{self, LogisticRegression, SingularHessianError},
    raykar::RaykarClassifier,
};

/// The competing training methods.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum Method {
    /// Crowd-aware EM classifier trained on the full noisy label panel.
    #[display("Raykar")]
    #[serde(rename = "Raykar")]
    Raykar,
    /// Logistic regression trained on majority-vote labels.
    #[display("LR")]
    #[serde(rename = "LR")]
    LogisticRegression,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown method '{name}' (expected one of: Raykar, LR)")]
pub struct UnknownMethodError {
    #[error(not(source))]
    pub name: String,
}

impl FromStr for Method {
    type Err = UnknownMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.to_string() == s)
            .ok_or_else(|| UnknownMethodError { name: s.to_owned() })
    }
}

/// The kind of training target a method consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TargetKind {
    #[display("crowd label panel")]
    Crowd,
    #[display("majority-vote consensus")]
    Consensus,
}

/// Training target handed to a method.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Crowd(&'a CrowdLabelPanel),
    Consensus(&'a [Consensus]),
}

impl Target<'_> {
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Crowd(_) => TargetKind::Crowd,
            Target::Consensus(_) => TargetKind::Consensus,
        }
    }

    #[must_use]
    pub fn n_examples(&self) -> usize {
        match self {
            Target::Crowd(panel) => panel.n_examples(),
            Target::Consensus(consensus) => consensus.len(),
        }
    }
}

/// Hyperparameters shared by the methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// EM restarts for the crowd-aware classifier.
    pub n_restarts: usize,
    /// Iteration cap for both EM and Newton's method.
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Inverse L2 regularization strength.
    pub c: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            n_restarts: 5,
            max_iterations: 100,
            tolerance: 1e-6,
            c: 1.0,
        }
    }
}

impl FitOptions {
    fn logistic(&self) -> LogisticRegression {
        LogisticRegression {
            c: self.c,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }

    fn raykar(&self) -> RaykarClassifier {
        RaykarClassifier {
            n_restarts: self.n_restarts,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            logistic: self.logistic(),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum FitError {
    #[display("method {method} expects a {expected} target, got a {found}")]
    TargetMismatch {
        method: Method,
        expected: TargetKind,
        found: TargetKind,
    },
    #[display("features cover {features} examples but targets cover {targets}")]
    ShapeMismatch { features: usize, targets: usize },
    #[display("example index {index} out of range for {n_examples} examples")]
    IndexOutOfRange { index: usize, n_examples: usize },
    #[display("test indices must be sorted in ascending order")]
    UnsortedTestIndices,
    #[display("failed to fit classifier: {_0}")]
    #[from]
    Singular(SingularHessianError),
}

/// Predictions for the test indices of one fit, in test-index order.
///
/// `None` marks an example for which the method could not produce a
/// prediction (for example, when no training label was observed).
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOutput {
    pub predictions: Vec<Option<f64>>,
}

impl MethodOutput {
    fn unavailable(len: usize) -> Self {
        Self {
            predictions: vec![None; len],
        }
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_some()).count()
    }
}

impl Method {
    pub const ALL: [Method; 2] = [Method::Raykar, Method::LogisticRegression];

    /// The target this method is trained on.
    #[must_use]
    pub fn target_kind(self) -> TargetKind {
        match self {
            Method::Raykar => TargetKind::Crowd,
            Method::LogisticRegression => TargetKind::Consensus,
        }
    }

    /// Checks that `target` is the kind this method consumes.
    pub fn check_target(self, target: &Target<'_>) -> Result<(), FitError> {
        if target.kind() == self.target_kind() {
            Ok(())
        } else {
            Err(FitError::TargetMismatch {
                method: self,
                expected: self.target_kind(),
                found: target.kind(),
            })
        }
    }

    /// Trains on `train` and predicts the probability of the positive class
    /// for every index in `test`.
    ///
    /// `test` must be sorted; the output is aligned with it.
    pub fn fit_and_predict<R>(
        self,
        features: &FeatureMatrix,
        target: Target<'_>,
        train: &[usize],
        test: &[usize],
        options: &FitOptions,
        rng: &mut R,
    ) -> Result<MethodOutput, FitError>
    where
        R: Rng + ?Sized,
    {
        self.check_target(&target)?;
        let n_examples = features.n_examples();
        if target.n_examples() != n_examples {
            return Err(FitError::ShapeMismatch {
                features: n_examples,
                targets: target.n_examples(),
            });
        }
        if let Some(&index) = train.iter().chain(test).find(|&&i| i >= n_examples) {
            return Err(FitError::IndexOutOfRange { index, n_examples });
        }
        if !test.is_sorted() {
            return Err(FitError::UnsortedTestIndices);
        }

        match (self, target) {
            (Method::Raykar, Target::Crowd(panel)) => {
                let train_features = features.select_rows(train);
                let train_panel = panel.select_examples(train);
                let Some(model) = options.raykar().fit(&train_features, &train_panel, rng)? else {
                    log::debug!("{self}: no observed training label, predictions unavailable");
                    return Ok(MethodOutput::unavailable(test.len()));
                };
                Ok(predict_rows(features, test, |row| model.predict_proba(row)))
            }
            (Method::LogisticRegression, Target::Consensus(consensus)) => {
                let (labelled, labels): (Vec<_>, Vec<_>) = train
                    .iter()
                    .filter_map(|&i| consensus[i].label().map(|label| (i, label)))
                    .unzip();
                if labelled.is_empty() {
                    log::debug!("{self}: no training consensus, predictions unavailable");
                    return Ok(MethodOutput::unavailable(test.len()));
                }
                let targets = labels
                    .iter()
                    .map(|&l| if l { 1.0 } else { 0.0 })
                    .collect::<Vec<_>>();
                let weights = logistic::balanced_weights(&labels);
                let model = options.logistic().fit(
                    &features.select_rows(&labelled),
                    &targets,
                    Some(&weights),
                )?;
                Ok(predict_rows(features, test, |row| model.predict_proba(row)))
            }
            (method, target) => Err(FitError::TargetMismatch {
                method,
                expected: method.target_kind(),
                found: target.kind(),
            }),
        }
    }
}

fn predict_rows<F>(features: &FeatureMatrix, rows: &[usize], proba: F) -> MethodOutput
where
    F: Fn(&[f64]) -> f64,
{
    MethodOutput {
        predictions: rows.iter().map(|&i| Some(proba(features.row(i)))).collect(),
    }
}

#[cfg(test)]
mod tests {
    use crowdeval_crowd::{LabelCorruptionModel, RateRange, majority_vote};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn fixture() -> (FeatureMatrix, Vec<bool>, CrowdLabelPanel) {
        let truth = (0..80).map(|i| i % 2 == 0).collect::<Vec<_>>();
        let rows = (0..80_u32)
            .map(|i| {
                let offset = if i % 2 == 0 { 2.0 } else { -2.0 };
                vec![offset + f64::from(i % 7) / 7.0, f64::from(i % 5)]
            })
            .collect::<Vec<_>>();
        let range = RateRange::new(0.6, 0.9).unwrap();
        let fpr = RateRange::new(0.1, 0.3).unwrap();
        let panel = LabelCorruptionModel::new(5, range, fpr, 0.4)
            .unwrap()
            .generate(&truth, &mut Pcg64::seed_from_u64(4));
        (FeatureMatrix::from_rows(rows).unwrap(), truth, panel)
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(method.to_string().parse::<Method>(), Ok(method));
        }
        assert_eq!("LR".parse::<Method>(), Ok(Method::LogisticRegression));
        assert_eq!(
            "SVM".parse::<Method>(),
            Err(UnknownMethodError {
                name: "SVM".to_owned()
            })
        );
    }

    #[test]
    fn test_target_mismatch_is_rejected() {
        let (features, _, panel) = fixture();
        let err = Method::LogisticRegression
            .fit_and_predict(
                &features,
                Target::Crowd(&panel),
                &[0, 1, 2, 3],
                &[4, 5],
                &FitOptions::default(),
                &mut Pcg64::seed_from_u64(0),
            )
            .unwrap_err();
        assert!(matches!(err, FitError::TargetMismatch { .. }));
    }

    #[test]
    fn test_unsorted_test_indices_are_rejected() {
        let (features, _, panel) = fixture();
        let err = Method::Raykar
            .fit_and_predict(
                &features,
                Target::Crowd(&panel),
                &[0, 1, 2, 3],
                &[6, 5],
                &FitOptions::default(),
                &mut Pcg64::seed_from_u64(0),
            )
            .unwrap_err();
        assert!(matches!(err, FitError::UnsortedTestIndices));
    }

    #[test]
    fn test_both_methods_predict_every_test_index() {
        let (features, truth, panel) = fixture();
        let consensus = majority_vote::reduce(&panel);
        let train = (0..60).collect::<Vec<_>>();
        let test = (60..80).collect::<Vec<_>>();
        for (method, target) in [
            (Method::Raykar, Target::Crowd(&panel)),
            (Method::LogisticRegression, Target::Consensus(&consensus)),
        ] {
            let output = method
                .fit_and_predict(
                    &features,
                    target,
                    &train,
                    &test,
                    &FitOptions::default(),
                    &mut Pcg64::seed_from_u64(1),
                )
                .unwrap();
            assert_eq!(output.predictions.len(), test.len());
            assert_eq!(output.valid_count(), test.len());
            let correct = output
                .predictions
                .iter()
                .zip(&test)
                .filter(|&(p, &i)| (p.unwrap() > 0.5) == truth[i])
                .count();
            assert!(correct >= 16, "{method}: {correct}/20 correct");
        }
    }

    #[test]
    fn test_no_consensus_gives_unavailable_predictions() {
        let (features, _, _) = fixture();
        let consensus = vec![Consensus::NoVotes; features.n_examples()];
        let output = Method::LogisticRegression
            .fit_and_predict(
                &features,
                Target::Consensus(&consensus),
                &[0, 1, 2],
                &[3, 4],
                &FitOptions::default(),
                &mut Pcg64::seed_from_u64(0),
            )
            .unwrap();
        assert_eq!(output.predictions, vec![None, None]);
    }
}
