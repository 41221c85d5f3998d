//! Classifiers compared by the crowdeval experiment.
//!
//! Every method is reached through the same interface,
//! [`Method::fit_and_predict`]: given features, a training target, train
//! indices and sorted test indices, it returns one soft prediction (or `None`)
//! per test index.
//!
//! # Methods
//!
//! | [`Method`] | target | model |
//! |---|---|---|
//! | `Raykar` | [`Target::Crowd`] | [`raykar::RaykarClassifier`], EM over labeller sensitivities/specificities |
//! | `LR` | [`Target::Consensus`] | [`logistic::LogisticRegression`] with balanced class weights |
//!
//! `Method` is a closed enum: adding a method means adding a variant, and
//! every dispatch site is checked for exhaustiveness by the compiler.
//!
//! # Modules
//!
//! - [`features`]: Dense feature matrix and standardization
//! - [`logistic`]: L2-regularized logistic regression (Newton's method)
//! - [`raykar`]: Crowd-aware EM classifier
//! - [`method`]: Method enum, targets, and the shared fit/predict interface
//! - [`linalg`]: Small dense linear solver

pub use self::{
    features::{FeatureMatrix, RaggedRowsError},
    method::{FitError, FitOptions, Method, MethodOutput, Target, TargetKind, UnknownMethodError},
};

pub mod features;
pub mod linalg;
pub mod logistic;
pub mod method;
pub mod raykar;
