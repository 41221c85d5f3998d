//! Statistical utilities for the crowdeval experiment.
//!
//! This crate provides the small set of statistics the experiment reports on:
//!
//! - **Descriptive statistics**: mean, population standard deviation, min/max of a sample
//! - **Binary classification metrics**: confusion counts, per-class recall, balanced accuracy
//! - **Histograms**: fixed-width binning of scores for distribution plots
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing per-split scores
//! - [`classification`]: Confusion matrix and balanced accuracy for binary predictions
//! - [`histogram`]: Equal-width bins over an explicit range
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use crowdeval_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing balanced accuracy
//!
//! ```
//! use crowdeval_stats::classification::ConfusionMatrix;
//!
//! // (actual, predicted)
//! let pairs = [(true, true), (true, false), (false, false), (false, false)];
//! let cm = ConfusionMatrix::from_pairs(pairs);
//! assert_eq!(cm.balanced_accuracy(), Some(0.75));
//! ```

pub mod classification;
pub mod descriptive;
pub mod histogram;
