use crowdeval_classifier::{FitOptions, Method};
use crowdeval_crowd::RateRange;
use serde::{Deserialize, Serialize};

use crate::results::RunSettings;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("at least one split is required")]
    NoSplits,
    #[display("at least one method is required")]
    NoMethods,
    #[display("method {method} is listed more than once")]
    DuplicateMethod { method: Method },
    #[display("mask rate must be in [0, 1], got {value}")]
    InvalidMaskRate { value: f64 },
    #[display("test fraction must be in (0, 1), got {value}")]
    InvalidTestFraction { value: f64 },
    #[display("at least one EM restart is required")]
    NoRestarts,
    #[display("at least one iteration is required")]
    NoIterations,
    #[display("tolerance must be finite and non-negative, got {value}")]
    InvalidTolerance { value: f64 },
    #[display("regularization parameter C must be finite and positive, got {value}")]
    InvalidRegularization { value: f64 },
}

/// Every knob of one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub n_splits: usize,
    pub n_labellers: usize,
    pub tpr_range: RateRange,
    pub fpr_range: RateRange,
    /// Probability that any single crowd label is hidden.
    pub mask_rate: f64,
    pub test_fraction: f64,
    /// Seeds the label noise, the masking and the EM restarts.
    pub seed: u64,
    /// Seeds the train/test splits.
    pub shuffle_seed: u64,
    pub methods: Vec<Method>,
    pub fit: FitOptions,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_splits: 20,
            n_labellers: 5,
            tpr_range: RateRange::default(),
            fpr_range: RateRange::default(),
            mask_rate: 0.5,
            test_fraction: 0.25,
            seed: 0,
            shuffle_seed: 0,
            methods: Method::ALL.to_vec(),
            fit: FitOptions::default(),
        }
    }
}

impl ExperimentConfig {
    /// Rejects values no run could use.
    ///
    /// Rate ranges are already valid by construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_splits == 0 {
            return Err(ConfigError::NoSplits);
        }
        if self.methods.is_empty() {
            return Err(ConfigError::NoMethods);
        }
        for (i, &method) in self.methods.iter().enumerate() {
            if self.methods[..i].contains(&method) {
                return Err(ConfigError::DuplicateMethod { method });
            }
        }
        if !(0.0..=1.0).contains(&self.mask_rate) {
            return Err(ConfigError::InvalidMaskRate {
                value: self.mask_rate,
            });
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::InvalidTestFraction {
                value: self.test_fraction,
            });
        }

        let FitOptions {
            n_restarts,
            max_iterations,
            tolerance,
            c,
        } = self.fit;
        if n_restarts == 0 {
            return Err(ConfigError::NoRestarts);
        }
        if max_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance { value: tolerance });
        }
        if !(c.is_finite() && c > 0.0) {
            return Err(ConfigError::InvalidRegularization { value: c });
        }
        Ok(())
    }

    /// Parameter count of the crowd-aware model: one weight per feature, a
    /// bias, and a sensitivity/specificity pair per labeller.
    #[must_use]
    pub fn n_params(&self, n_features: usize) -> usize {
        n_features + 1 + 2 * self.n_labellers
    }

    /// The part of the configuration a results store must agree on to be resumed.
    #[must_use]
    pub fn settings(&self) -> RunSettings {
        RunSettings {
            n_labellers: self.n_labellers,
            tpr_range: self.tpr_range,
            fpr_range: self.fpr_range,
            mask_rate: self.mask_rate,
            test_fraction: self.test_fraction,
            seed: self.seed,
            shuffle_seed: self.shuffle_seed,
            fit: self.fit,
        }
    }

    /// Identification of the compared models, recorded in the results store.
    #[must_use]
    pub fn model_description() -> String {
        let version = env!("CARGO_PKG_VERSION");
        format!(
            "{version} crowdeval RaykarClassifier,{version} crowdeval LogisticRegression"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ExperimentConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.n_splits, 20);
        assert_eq!(config.n_labellers, 5);
        assert_eq!(config.methods, vec![Method::Raykar, Method::LogisticRegression]);
        assert_eq!(config.fit.n_restarts, 5);
    }

    #[test]
    fn test_n_params() {
        let config = ExperimentConfig::default();
        assert_eq!(config.n_params(9), 9 + 1 + 10);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases: [(fn(&mut ExperimentConfig), ConfigError); 7] = [
            (|c| c.n_splits = 0, ConfigError::NoSplits),
            (|c| c.methods.clear(), ConfigError::NoMethods),
            (
                |c| c.methods.push(Method::Raykar),
                ConfigError::DuplicateMethod {
                    method: Method::Raykar,
                },
            ),
            (
                |c| c.mask_rate = 1.5,
                ConfigError::InvalidMaskRate { value: 1.5 },
            ),
            (
                |c| c.test_fraction = 1.0,
                ConfigError::InvalidTestFraction { value: 1.0 },
            ),
            (|c| c.fit.n_restarts = 0, ConfigError::NoRestarts),
            (
                |c| c.fit.c = 0.0,
                ConfigError::InvalidRegularization { value: 0.0 },
            ),
        ];
        for (mutate, expected) in cases {
            let mut config = ExperimentConfig::default();
            mutate(&mut config);
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"n_splits": 3, "methods": ["LR"], "tpr_range": [0.5, 0.9]}"#)
                .unwrap();
        assert_eq!(config.n_splits, 3);
        assert_eq!(config.methods, vec![Method::LogisticRegression]);
        assert_eq!(config.tpr_range, RateRange::new(0.5, 0.9).unwrap());
        assert_eq!(config.fpr_range, ExperimentConfig::default().fpr_range);
        assert_eq!(config.mask_rate, 0.5);

        let err = serde_json::from_str::<ExperimentConfig>(r#"{"tpr_range": [0.9, 0.5]}"#);
        assert!(err.is_err());
    }
}
