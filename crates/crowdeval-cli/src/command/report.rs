use anyhow::Context as _;
use crowdeval_experiment::ResultsStore;

use super::CommonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ReportArg {
    #[clap(flatten)]
    pub(super) common: CommonArg,
}

pub(crate) fn run(arg: &ReportArg) -> anyhow::Result<()> {
    let ReportArg { common } = arg;
    let dataset = common.load_dataset()?;
    let store = ResultsStore::load(&common.results).with_context(|| {
        format!("Failed to load results file: {}", common.results.display())
    })?;
    let metadata = store.metadata();
    log::info!(
        "Results for {} splits of {} examples, created {} ({})",
        metadata.n_splits,
        metadata.n_examples,
        metadata.created_at,
        metadata.model
    );
    let settings = &metadata.settings;
    log::info!(
        "Crowd of {} labellers, TPR {:?}, FPR {:?}, mask rate {}, seed {}, shuffle seed {}",
        settings.n_labellers,
        settings.tpr_range,
        settings.fpr_range,
        settings.mask_rate,
        settings.seed,
        settings.shuffle_seed
    );
    common.summarize(&store, &dataset)
}
