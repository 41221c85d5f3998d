use std::collections::BTreeMap;

use chrono::Utc;
use crowdeval_classifier::{FeatureMatrix, Method, Target};
use crowdeval_crowd::{Consensus, CrowdLabelPanel, LabelCorruptionModel, majority_vote};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::{
    config::{ConfigError, ExperimentConfig},
    dataset::Dataset,
    harness::{HarnessConfig, HarnessError, RunReport, SplitEvaluationHarness},
    results::{ResultsStore, StoreMetadata},
};

/// Simulated crowd annotation of a dataset.
#[derive(Debug, Clone)]
pub struct CrowdAnnotation {
    pub panel: CrowdLabelPanel,
    pub consensus: Vec<Consensus>,
}

impl CrowdAnnotation {
    /// The training target `method` consumes.
    #[must_use]
    pub fn target_for(&self, method: Method) -> Target<'_> {
        match method {
            Method::Raykar => Target::Crowd(&self.panel),
            Method::LogisticRegression => Target::Consensus(&self.consensus),
        }
    }
}

/// A validated experiment configuration, ready to run against a dataset.
#[derive(Debug, Clone)]
pub struct Experiment {
    config: ExperimentConfig,
    corruption: LabelCorruptionModel,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let corruption = LabelCorruptionModel::new(
            config.n_labellers,
            config.tpr_range,
            config.fpr_range,
            config.mask_rate,
        )
        .map_err(|_| ConfigError::InvalidMaskRate {
            value: config.mask_rate,
        })?;
        Ok(Self { config, corruption })
    }

    #[must_use]
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Store metadata describing a run of this experiment on `dataset`.
    #[must_use]
    pub fn metadata(&self, dataset: &Dataset) -> StoreMetadata {
        StoreMetadata {
            methods: self.config.methods.clone(),
            n_splits: self.config.n_splits,
            n_examples: dataset.n_examples(),
            n_params: self.config.n_params(dataset.features.n_features()),
            model: ExperimentConfig::model_description(),
            settings: self.config.settings(),
            created_at: Utc::now(),
        }
    }

    /// Corrupts the ground truth into a crowd panel and its majority vote.
    ///
    /// Deterministic in the configured seed.
    #[must_use]
    pub fn annotate(&self, labels: &[bool]) -> CrowdAnnotation {
        let mut rng = Pcg64::seed_from_u64(self.config.seed);
        let panel = self.corruption.generate(labels, &mut rng);
        let consensus = majority_vote::reduce(&panel);
        let observed = panel.observed_count();
        let no_votes = consensus.iter().filter(|c| c.is_no_votes()).count();
        log::info!(
            "Simulated {} labellers over {} examples: {observed} observed labels, {no_votes} examples without votes",
            panel.n_labellers(),
            panel.n_examples()
        );
        for (labeller, profile) in panel.profiles().iter().enumerate() {
            log::debug!(
                "Labeller {labeller}: TPR {:.3}, FPR {:.3}",
                profile.true_positive_rate,
                profile.false_positive_rate
            );
        }
        CrowdAnnotation { panel, consensus }
    }

    #[must_use]
    pub fn harness_config(&self, overwrite: bool) -> HarnessConfig {
        HarnessConfig {
            methods: self.config.methods.clone(),
            n_splits: self.config.n_splits,
            test_fraction: self.config.test_fraction,
            shuffle_seed: self.config.shuffle_seed,
            fit_seed: self.config.seed,
            fit: self.config.fit,
            overwrite,
        }
    }

    /// Annotates `dataset` and evaluates every method over all splits.
    pub fn run(
        &self,
        dataset: &Dataset,
        store: &mut ResultsStore,
        overwrite: bool,
    ) -> Result<RunReport, HarnessError> {
        let annotation = self.annotate(&dataset.labels);
        let (features, targets) = method_inputs(&self.config.methods, dataset, &annotation);
        let harness = SplitEvaluationHarness::new(features, targets);
        let report = harness.run(&self.harness_config(overwrite), store)?;
        log::info!(
            "Computed {} cells, kept {} existing cells",
            report.computed,
            report.skipped
        );
        Ok(report)
    }
}

/// Every method shares the dataset features; targets follow each method's kind.
#[must_use]
pub fn method_inputs<'a>(
    methods: &[Method],
    dataset: &'a Dataset,
    annotation: &'a CrowdAnnotation,
) -> (
    BTreeMap<Method, &'a FeatureMatrix>,
    BTreeMap<Method, Target<'a>>,
) {
    let features = methods.iter().map(|&m| (m, &dataset.features)).collect();
    let targets = methods
        .iter()
        .map(|&m| (m, annotation.target_for(m)))
        .collect();
    (features, targets)
}

#[cfg(test)]
mod tests {
    use crowdeval_classifier::FitOptions;
    use crowdeval_crowd::RateRange;
    use rand::Rng as _;

    use super::*;
    use crate::{aggregate::ResultsAggregator, results::StoreError};

    fn dataset(n: usize) -> Dataset {
        dataset_with_spread(n, 1.0, 1.5)
    }

    /// Classes are separable along the first feature when `noise < center`.
    fn dataset_with_spread(n: usize, center: f64, noise: f64) -> Dataset {
        let mut rng = Pcg64::seed_from_u64(2024);
        let labels = (0..n).map(|i| i % 2 == 0).collect::<Vec<_>>();
        let rows = labels
            .iter()
            .map(|&l| {
                let center = if l { center } else { -center };
                vec![
                    center + rng.random_range(-noise..noise),
                    rng.random_range(-1.0..1.0),
                    0.5 * center + rng.random_range(-1.0..1.0),
                ]
            })
            .collect::<Vec<_>>();
        Dataset {
            features: FeatureMatrix::from_rows(rows).unwrap(),
            labels,
        }
    }

    fn run(config: ExperimentConfig, dataset: &Dataset) -> ResultsStore {
        let experiment = Experiment::new(config).unwrap();
        let mut store = ResultsStore::new(experiment.metadata(dataset));
        experiment.run(dataset, &mut store, false).unwrap();
        store
    }

    #[test]
    fn test_end_to_end_default_configuration() {
        let dataset = dataset(100);
        let store = run(ExperimentConfig::default(), &dataset);
        assert_eq!(store.computed_count(), 40);
        assert_eq!(store.metadata().n_params, 3 + 1 + 2 * 5);

        let aggregator = ResultsAggregator::new(&store, &dataset.labels).unwrap();
        for method in Method::ALL {
            let summary = aggregator.summary(method).unwrap();
            assert_eq!(summary.scores.len(), 20);
            assert!(summary.mean.is_finite());
            assert!(summary.mean > 0.0 && summary.mean < 1.0, "{summary:?}");
            assert!(summary.std_dev >= 0.0);
        }
    }

    #[test]
    fn test_informative_crowd_beats_chance_on_every_split() {
        let dataset = dataset_with_spread(100, 2.0, 1.0);
        let config = ExperimentConfig {
            tpr_range: RateRange::new(0.6, 0.9).unwrap(),
            fpr_range: RateRange::new(0.1, 0.4).unwrap(),
            ..ExperimentConfig::default()
        };
        let store = run(config, &dataset);
        let aggregator = ResultsAggregator::new(&store, &dataset.labels).unwrap();
        for method in Method::ALL {
            let summary = aggregator.summary(method).unwrap();
            assert!(summary.mean > 0.5, "{summary:?}");
        }
        let raykar = aggregator.summary(Method::Raykar).unwrap();
        assert_eq!(raykar.evaluated().count(), 20);
        for (split, score) in raykar.scores.iter().enumerate() {
            let score = score.unwrap();
            assert!(score > 0.5, "split {split}: {score}");
        }
    }

    #[test]
    fn test_same_seeds_reproduce_results() {
        let dataset = dataset(60);
        let config = ExperimentConfig {
            n_splits: 4,
            fit: FitOptions {
                n_restarts: 2,
                ..FitOptions::default()
            },
            ..ExperimentConfig::default()
        };
        let a = run(config.clone(), &dataset);
        let b = run(config, &dataset);
        for method in Method::ALL {
            for split in 0..4 {
                assert_eq!(a.get(method, split), b.get(method, split));
            }
        }
    }

    #[test]
    fn test_store_of_another_crowd_is_not_resumed() {
        let dataset = dataset(40);
        let path = std::env::temp_dir().join(format!(
            "crowdeval-{}-other-crowd.json",
            std::process::id()
        ));
        let config = ExperimentConfig {
            n_splits: 2,
            ..ExperimentConfig::default()
        };
        let experiment = Experiment::new(config.clone()).unwrap();
        let mut store = ResultsStore::open_or_create(&path, experiment.metadata(&dataset)).unwrap();
        experiment.run(&dataset, &mut store, false).unwrap();
        store.persist().unwrap();

        let other = Experiment::new(ExperimentConfig {
            n_labellers: 9,
            seed: 7,
            mask_rate: 0.9,
            ..config.clone()
        })
        .unwrap();
        let err = ResultsStore::open_or_create(&path, other.metadata(&dataset)).unwrap_err();
        assert!(matches!(err, StoreError::Incompatible { .. }), "{err}");

        let reseeded = Experiment::new(ExperimentConfig { seed: 7, ..config }).unwrap();
        let err = ResultsStore::open_or_create(&path, reseeded.metadata(&dataset)).unwrap_err();
        assert!(
            matches!(err, StoreError::Incompatible { field: "seed", .. }),
            "{err}"
        );

        let resumed = ResultsStore::open_or_create(&path, experiment.metadata(&dataset)).unwrap();
        assert_eq!(resumed.computed_count(), 4);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_annotation_follows_seed() {
        let dataset = dataset(30);
        let experiment = Experiment::new(ExperimentConfig::default()).unwrap();
        let a = experiment.annotate(&dataset.labels);
        let b = experiment.annotate(&dataset.labels);
        assert_eq!(a.panel, b.panel);
        assert_eq!(a.consensus, b.consensus);

        let other = Experiment::new(ExperimentConfig {
            seed: 1,
            ..ExperimentConfig::default()
        })
        .unwrap()
        .annotate(&dataset.labels);
        assert_ne!(a.panel, other.panel);
    }

    #[test]
    fn test_fully_masked_crowd_yields_no_scores() {
        let dataset = dataset(40);
        let config = ExperimentConfig {
            n_splits: 2,
            mask_rate: 1.0,
            ..ExperimentConfig::default()
        };
        let store = run(config, &dataset);
        assert_eq!(store.computed_count(), 4);
        let aggregator = ResultsAggregator::new(&store, &dataset.labels).unwrap();
        for method in Method::ALL {
            assert_eq!(store.get(method, 0).unwrap().valid_count(), 0);
            assert_eq!(aggregator.summary(method), None);
        }
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let err = Experiment::new(ExperimentConfig {
            methods: vec![Method::LogisticRegression, Method::LogisticRegression],
            ..ExperimentConfig::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateMethod {
                method: Method::LogisticRegression
            }
        );
    }
}
