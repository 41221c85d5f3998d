//! The crowd-label experiment: load data, simulate a crowd, evaluate methods
//! over repeated splits, and score the stored predictions.
//!
//! # Flow
//!
//! ```text
//! TableFormat::load            → Dataset (features + ground truth)
//! Experiment::annotate         → CrowdLabelPanel + majority-vote Consensus
//! SplitEvaluationHarness::run  → ResultsStore (method × split predictions)
//! ResultsAggregator::summary   → mean / std of balanced accuracy per method
//! ```
//!
//! # Seeds
//!
//! A run is fully determined by two seeds. `seed` drives the label noise, the
//! masking and the per-cell generators of the methods; `shuffle_seed` drives
//! the train/test splits. Changing one leaves the other stream untouched.
//!
//! # Modules
//!
//! - [`dataset`]: Input table loader
//! - [`config`]: Experiment configuration and validation
//! - [`split`]: Repeated random train/test partitions
//! - [`harness`]: Split × method evaluation loop
//! - [`results`]: JSON-backed store of per-split predictions
//! - [`aggregate`]: Balanced-accuracy scoring and summaries
//! - [`experiment`]: Wiring of the above for one configured run

pub use self::{
    aggregate::{MethodSummary, ResultsAggregator},
    config::{ConfigError, ExperimentConfig},
    dataset::{Dataset, DatasetError, TableFormat},
    experiment::{CrowdAnnotation, Experiment},
    harness::{HarnessConfig, HarnessError, RunReport, SplitEvaluationHarness},
    results::{ResultsStore, RunSettings, SplitPredictions, StoreError, StoreMetadata},
    split::{ShuffleSplit, Split, SplitError},
};

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod experiment;
pub mod harness;
pub mod results;
pub mod split;
