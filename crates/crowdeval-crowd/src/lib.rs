//! Simulated crowd annotation for binary classification data.
//!
//! Real crowdsourced labels are noisy and incomplete: every annotator has their
//! own error profile, and most annotators only see a fraction of the examples.
//! This crate synthesizes that situation from ground-truth labels so that
//! classifiers trained on crowd labels can be evaluated under a known noise
//! model.
//!
//! # Pipeline
//!
//! ```text
//! ground truth (Vec<bool>)
//!     ↓ LabelCorruptionModel::generate
//! CrowdLabelPanel (labeller × example grid of Observed(bool) | Missing)
//!     ↓ majority_vote::reduce
//! Vec<Consensus> (NoVotes | Votes { positive, total })
//! ```
//!
//! # Modules
//!
//! - [`labeller`]: Rate ranges and per-labeller true/false positive rates
//! - [`panel`]: The label grid with its per-cell observation state
//! - [`corruption`]: The randomized corruption model producing a panel
//! - [`majority_vote`]: Per-example consensus over observed votes
//!
//! # Missing labels
//!
//! A masked cell is [`CrowdLabel::Missing`]. There is no way to read a label
//! out of a missing cell, so masked entries cannot leak into consensus,
//! training or evaluation by accident.

pub use self::{
    corruption::LabelCorruptionModel,
    labeller::{LabellerProfile, RateRange, RateRangeError},
    majority_vote::Consensus,
    panel::{CrowdLabel, CrowdLabelPanel},
};

pub mod corruption;
pub mod labeller;
pub mod majority_vote;
pub mod panel;
