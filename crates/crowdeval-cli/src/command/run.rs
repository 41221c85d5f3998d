use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use crowdeval_classifier::Method;
use crowdeval_experiment::{Experiment, ExperimentConfig, ResultsStore};

use super::CommonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    #[clap(flatten)]
    pub(super) common: CommonArg,
    /// Recompute cells already present in the results file
    #[arg(long)]
    overwrite: bool,
    /// Experiment configuration (JSON); the flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for label noise, masking and EM restarts
    #[arg(long)]
    seed: Option<u64>,
    /// Seed for the train/test splits
    #[arg(long)]
    shuffle_seed: Option<u64>,
    /// Number of train/test splits
    #[arg(long)]
    splits: Option<usize>,
    /// Number of simulated labellers
    #[arg(long)]
    labellers: Option<usize>,
    /// Probability of hiding each crowd label
    #[arg(long)]
    mask_rate: Option<f64>,
    /// Fraction of examples held out for testing
    #[arg(long)]
    test_fraction: Option<f64>,
    /// Methods to evaluate, in order (Raykar, LR)
    #[arg(long, value_delimiter = ',')]
    methods: Option<Vec<Method>>,
    /// EM restarts for the crowd-aware classifier
    #[arg(long)]
    restarts: Option<usize>,
}

impl RunArg {
    fn experiment_config(&self) -> anyhow::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => read_config_file(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(shuffle_seed) = self.shuffle_seed {
            config.shuffle_seed = shuffle_seed;
        }
        if let Some(splits) = self.splits {
            config.n_splits = splits;
        }
        if let Some(labellers) = self.labellers {
            config.n_labellers = labellers;
        }
        if let Some(mask_rate) = self.mask_rate {
            config.mask_rate = mask_rate;
        }
        if let Some(test_fraction) = self.test_fraction {
            config.test_fraction = test_fraction;
        }
        if let Some(methods) = &self.methods {
            config.methods.clone_from(methods);
        }
        if let Some(restarts) = self.restarts {
            config.fit.n_restarts = restarts;
        }
        Ok(config)
    }
}

fn read_config_file(path: &Path) -> anyhow::Result<ExperimentConfig> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;
    let config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config JSON file: {}", path.display()))?;
    Ok(config)
}

pub(crate) fn run(arg: &RunArg) -> anyhow::Result<()> {
    let config = arg.experiment_config()?;
    let experiment = Experiment::new(config).context("Invalid experiment configuration")?;
    log::debug!("Configuration: {:?}", experiment.config());

    let dataset = arg.common.load_dataset()?;
    let mut store = ResultsStore::open_or_create(&arg.common.results, experiment.metadata(&dataset))
        .with_context(|| {
            format!(
                "Failed to open results file: {}",
                arg.common.results.display()
            )
        })?;
    experiment
        .run(&dataset, &mut store, arg.overwrite)
        .context("Experiment failed")?;
    store.persist().with_context(|| {
        format!(
            "Failed to save results file: {}",
            arg.common.results.display()
        )
    })?;

    arg.common.summarize(&store, &dataset)
}
