use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use crowdeval_experiment::{Dataset, ResultsAggregator, ResultsStore, TableFormat};
use log::LevelFilter;

use crate::plot::{self, PlotContext, PlotStyle};

use self::{report::ReportArg, run::RunArg};

mod report;
mod run;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log per-split and per-restart details
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Simulate a crowd, evaluate every method over repeated splits, and report
    Run(#[clap(flatten)] RunArg),
    /// Re-score an existing results file without fitting anything
    Report(#[clap(flatten)] ReportArg),
}

/// Arguments shared by every mode.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CommonArg {
    /// Input table: id, features..., class code
    #[arg(long)]
    input: PathBuf,
    /// Results file (JSON)
    #[arg(long)]
    results: PathBuf,
    /// Show the per-split balanced accuracies in a terminal chart
    #[arg(long)]
    plot: bool,
    #[arg(long, default_value = "scatter")]
    plot_style: PlotStyle,
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logger(args.verbose);
    match args.mode {
        Mode::Run(arg) => run::run(&arg)?,
        Mode::Report(arg) => report::run(&arg)?,
    }
    Ok(())
}

impl CommonArg {
    fn load_dataset(&self) -> anyhow::Result<Dataset> {
        let dataset = TableFormat::default()
            .load(&self.input)
            .with_context(|| format!("Failed to load input table: {}", self.input.display()))?;
        log::info!(
            "Loaded {} examples ({} positive) with {} features",
            dataset.n_examples(),
            dataset.n_positives(),
            dataset.features.n_features()
        );
        Ok(dataset)
    }

    /// Logs the balanced-accuracy summary of every method, then plots it if requested.
    fn summarize(&self, store: &ResultsStore, dataset: &Dataset) -> anyhow::Result<()> {
        let aggregator = ResultsAggregator::new(store, &dataset.labels)
            .context("Results file does not match the input table")?;
        let summaries = aggregator.summaries();
        for summary in &summaries {
            let method = summary.method;
            log::info!(
                "Average balanced accuracy ({method}): {:.2}%",
                summary.mean * 100.0
            );
            log::info!(
                "Standard deviation ({method}): {:.2}%",
                summary.std_dev * 100.0
            );
            if summary.skipped() > 0 {
                log::warn!(
                    "{method}: {} of {} splits could not be scored",
                    summary.skipped(),
                    summary.scores.len()
                );
            }
        }

        if self.plot {
            let context = PlotContext::new(&store.metadata().methods);
            plot::show(&context, self.plot_style, &summaries)?;
        }
        Ok(())
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_unknown_method_is_rejected_at_parse_time() {
        let err = CommandArgs::try_parse_from([
            "crowdeval",
            "run",
            "--input",
            "data.csv",
            "--results",
            "out.json",
            "--methods",
            "Raykar,SVM",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SVM"), "{err}");
    }

    #[test]
    fn test_report_defaults() {
        let args = CommandArgs::try_parse_from([
            "crowdeval", "report", "-v", "--input", "a.csv", "--results", "r.json",
        ])
        .unwrap();
        assert!(args.verbose);
        let Mode::Report(arg) = args.mode else {
            panic!("expected report mode");
        };
        assert!(!arg.common.plot);
        assert_eq!(arg.common.plot_style, PlotStyle::Scatter);
    }
}
