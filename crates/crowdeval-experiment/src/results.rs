//! Persistent store of per-split predictions.
//!
//! The store is a single pretty-printed JSON document:
//!
//! ```text
//! {
//!   "metadata": { "methods": ["Raykar", "LR"], "n_splits": 20, ... },
//!   "cells": { "Raykar": [ { "predictions": [null, 0.93, ...] }, null, ... ], ... }
//! }
//! ```
//!
//! A `null` cell has not been computed yet. Within a cell, `null` marks an
//! example that was either not in the test set or could not be predicted.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fmt,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use crowdeval_classifier::{FitOptions, Method, MethodOutput};
use crowdeval_crowd::RateRange;
use serde::{Deserialize, Serialize};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("failed to open results file {}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[display("failed to parse results file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to write results file {}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[display("failed to serialize results to {}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("results store was created with {field} = {stored}, but this run uses {requested}")]
    Incompatible {
        field: &'static str,
        stored: String,
        requested: String,
    },
    #[display("results store is corrupt: {reason}")]
    Corrupt { reason: String },
    #[display("method {method} is not part of this results store")]
    UnknownMethod { method: Method },
    #[display("split {split} out of range for {n_splits} splits")]
    SplitOutOfRange { split: usize, n_splits: usize },
    #[display("predictions cover {found} examples, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Description of the run that produced a results store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub methods: Vec<Method>,
    pub n_splits: usize,
    pub n_examples: usize,
    /// Parameters of the crowd-aware model: weights, bias and two rates per labeller.
    pub n_params: usize,
    /// Free-text identification of the compared models.
    pub model: String,
    pub settings: RunSettings,
    pub created_at: DateTime<Utc>,
}

/// Settings that, together with the input table, determine every stored cell.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub n_labellers: usize,
    pub tpr_range: RateRange,
    pub fpr_range: RateRange,
    pub mask_rate: f64,
    pub test_fraction: f64,
    pub seed: u64,
    pub shuffle_seed: u64,
    pub fit: FitOptions,
}

fn ensure_same<T>(field: &'static str, stored: &T, requested: &T) -> Result<(), StoreError>
where
    T: PartialEq + fmt::Debug,
{
    if stored == requested {
        return Ok(());
    }
    Err(StoreError::Incompatible {
        field,
        stored: format!("{stored:?}"),
        requested: format!("{requested:?}"),
    })
}

impl StoreMetadata {
    /// Only `created_at` may differ between a stored run and a resumed one.
    fn check_compatible(&self, requested: &Self) -> Result<(), StoreError> {
        ensure_same("methods", &self.methods, &requested.methods)?;
        ensure_same("n_splits", &self.n_splits, &requested.n_splits)?;
        ensure_same("n_examples", &self.n_examples, &requested.n_examples)?;
        ensure_same("n_params", &self.n_params, &requested.n_params)?;
        ensure_same("model", &self.model, &requested.model)?;
        self.settings.check_compatible(&requested.settings)
    }
}

impl RunSettings {
    fn check_compatible(&self, requested: &Self) -> Result<(), StoreError> {
        let Self {
            n_labellers,
            tpr_range,
            fpr_range,
            mask_rate,
            test_fraction,
            seed,
            shuffle_seed,
            fit,
        } = self;
        ensure_same("n_labellers", n_labellers, &requested.n_labellers)?;
        ensure_same("tpr_range", tpr_range, &requested.tpr_range)?;
        ensure_same("fpr_range", fpr_range, &requested.fpr_range)?;
        ensure_same("mask_rate", mask_rate, &requested.mask_rate)?;
        ensure_same("test_fraction", test_fraction, &requested.test_fraction)?;
        ensure_same("seed", seed, &requested.seed)?;
        ensure_same("shuffle_seed", shuffle_seed, &requested.shuffle_seed)?;
        ensure_same("fit", fit, &requested.fit)
    }
}

/// Predictions of one method on one split, over the full example range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPredictions {
    predictions: Vec<Option<f64>>,
}

impl SplitPredictions {
    /// Scatters the per-test-index `output` into a full-length vector.
    ///
    /// # Panics
    ///
    /// Panics if `output` and `test` differ in length or a test index is out
    /// of range.
    #[must_use]
    pub fn from_test_output(n_examples: usize, test: &[usize], output: &MethodOutput) -> Self {
        assert_eq!(test.len(), output.predictions.len());
        let mut predictions = vec![None; n_examples];
        for (&index, &prediction) in test.iter().zip(&output.predictions) {
            predictions[index] = prediction;
        }
        Self { predictions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    #[must_use]
    pub fn get(&self, example: usize) -> Option<f64> {
        self.predictions.get(example).copied().flatten()
    }

    /// Which examples carry a valid prediction.
    #[must_use]
    pub fn mask(&self) -> Vec<bool> {
        self.predictions.iter().map(Option::is_some).collect()
    }

    /// `(example, prediction)` for every valid prediction.
    pub fn valid(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.predictions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p)))
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsStore {
    metadata: StoreMetadata,
    cells: BTreeMap<Method, Vec<Option<SplitPredictions>>>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl ResultsStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new(metadata: StoreMetadata) -> Self {
        let cells = metadata
            .methods
            .iter()
            .map(|&method| (method, vec![None; metadata.n_splits]))
            .collect();
        Self {
            metadata,
            cells,
            path: None,
        }
    }

    /// Loads the store at `path` if it exists, otherwise starts an empty one
    /// that [`persist`](Self::persist) will write there.
    ///
    /// An existing store must agree with `metadata` on everything except its
    /// creation time.
    pub fn open_or_create<P>(path: P, metadata: StoreMetadata) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if path.exists() {
            let mut store = Self::load(path)?;
            store.metadata.check_compatible(&metadata)?;
            log::info!(
                "Resuming results store {} ({} of {} cells computed)",
                path.display(),
                store.computed_count(),
                store.metadata.methods.len() * store.metadata.n_splits
            );
            store.path = Some(path.to_owned());
            return Ok(store);
        }
        log::info!("Creating results store {}", path.display());
        let mut store = Self::new(metadata);
        store.path = Some(path.to_owned());
        Ok(store)
    }

    pub fn load<P>(path: P) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StoreError::Open {
            path: path.to_owned(),
            source,
        })?;
        let mut store: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Parse {
                path: path.to_owned(),
                source,
            })?;
        store.check_shape()?;
        store.path = Some(path.to_owned());
        Ok(store)
    }

    fn check_shape(&self) -> Result<(), StoreError> {
        let StoreMetadata {
            methods,
            n_splits,
            n_examples,
            ..
        } = &self.metadata;
        for method in methods {
            let Some(splits) = self.cells.get(method) else {
                return Err(StoreError::Corrupt {
                    reason: format!("no cells for method {method}"),
                });
            };
            if splits.len() != *n_splits {
                return Err(StoreError::Corrupt {
                    reason: format!(
                        "method {method} has {} splits, expected {n_splits}",
                        splits.len()
                    ),
                });
            }
            if let Some(cell) = splits.iter().flatten().find(|c| c.len() != *n_examples) {
                return Err(StoreError::Corrupt {
                    reason: format!(
                        "method {method} has a split with {} predictions, expected {n_examples}",
                        cell.len()
                    ),
                });
            }
        }
        if let Some(method) = self.cells.keys().find(|m| !methods.contains(m)) {
            return Err(StoreError::Corrupt {
                reason: format!("cells for unlisted method {method}"),
            });
        }
        Ok(())
    }

    /// Writes the store as pretty JSON to `path`.
    ///
    /// The document is written to a sibling `.tmp` file first and renamed over
    /// `path`, so an interrupted write leaves the previous store intact.
    pub fn save<P>(&self, path: P) -> Result<(), StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let temp_path = temp_path_for(path);
        let write_error = |source| StoreError::Write {
            path: path.to_owned(),
            source,
        };
        let file = File::create(&temp_path).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        let written = serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|source| StoreError::Serialize {
                path: path.to_owned(),
                source,
            })
            .and_then(|()| writeln!(writer).map_err(write_error))
            .and_then(|()| writer.flush().map_err(write_error));
        drop(writer);
        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
        fs::rename(&temp_path, path).map_err(write_error)
    }

    /// Saves to the path the store was opened from; a no-op for in-memory stores.
    pub fn persist(&self) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn contains(&self, method: Method, split: usize) -> bool {
        self.get(method, split).is_some()
    }

    #[must_use]
    pub fn get(&self, method: Method, split: usize) -> Option<&SplitPredictions> {
        self.cells.get(&method)?.get(split)?.as_ref()
    }

    pub fn insert(
        &mut self,
        method: Method,
        split: usize,
        predictions: SplitPredictions,
    ) -> Result<(), StoreError> {
        let n_splits = self.metadata.n_splits;
        let n_examples = self.metadata.n_examples;
        if predictions.len() != n_examples {
            return Err(StoreError::LengthMismatch {
                expected: n_examples,
                found: predictions.len(),
            });
        }
        let splits = self
            .cells
            .get_mut(&method)
            .ok_or(StoreError::UnknownMethod { method })?;
        let cell = splits
            .get_mut(split)
            .ok_or(StoreError::SplitOutOfRange { split, n_splits })?;
        *cell = Some(predictions);
        Ok(())
    }

    /// Number of computed cells over all methods.
    #[must_use]
    pub fn computed_count(&self) -> usize {
        self.cells.values().flatten().flatten().count()
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(OsString::from(".tmp"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    fn metadata() -> StoreMetadata {
        StoreMetadata {
            methods: vec![Method::Raykar, Method::LogisticRegression],
            n_splits: 3,
            n_examples: 4,
            n_params: 10,
            model: "test".to_owned(),
            settings: RunSettings::default(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("crowdeval-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn test_scatter_test_output() {
        let output = MethodOutput {
            predictions: vec![Some(0.9), None, Some(0.1)],
        };
        let cell = SplitPredictions::from_test_output(5, &[0, 2, 4], &output);
        assert_eq!(cell.len(), 5);
        assert_eq!(cell.mask(), vec![true, false, false, false, true]);
        assert_eq!(cell.valid().collect::<Vec<_>>(), vec![(0, 0.9), (4, 0.1)]);
        assert_eq!(cell.get(2), None);
        assert_eq!(cell.valid_count(), 2);
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = ResultsStore::new(metadata());
        assert!(!store.contains(Method::Raykar, 1));
        let cell = SplitPredictions {
            predictions: vec![Some(0.2), None, None, Some(0.7)],
        };
        store.insert(Method::Raykar, 1, cell.clone()).unwrap();
        assert!(store.contains(Method::Raykar, 1));
        assert!(!store.contains(Method::LogisticRegression, 1));
        assert_eq!(store.get(Method::Raykar, 1), Some(&cell));
        assert_eq!(store.computed_count(), 1);

        assert!(matches!(
            store.insert(Method::Raykar, 3, cell),
            Err(StoreError::SplitOutOfRange { split: 3, n_splits: 3 })
        ));
        assert!(matches!(
            store.insert(
                Method::Raykar,
                0,
                SplitPredictions {
                    predictions: vec![None]
                }
            ),
            Err(StoreError::LengthMismatch { expected: 4, found: 1 })
        ));
    }

    #[test]
    fn test_save_and_reopen() {
        let path = temp_path("reopen");
        let mut store = ResultsStore::open_or_create(&path, metadata()).unwrap();
        store
            .insert(
                Method::LogisticRegression,
                2,
                SplitPredictions {
                    predictions: vec![None, Some(0.123_456_789), Some(1.0), None],
                },
            )
            .unwrap();
        store.persist().unwrap();

        let reopened = ResultsStore::open_or_create(&path, metadata()).unwrap();
        assert_eq!(reopened, store);

        let mut other = metadata();
        other.n_splits = 5;
        let err = ResultsStore::open_or_create(&path, other).unwrap_err();
        assert!(
            matches!(err, StoreError::Incompatible { field: "n_splits", .. }),
            "{err}"
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_reopen_rejects_different_model_or_settings() {
        let path = temp_path("settings");
        ResultsStore::open_or_create(&path, metadata())
            .unwrap()
            .persist()
            .unwrap();

        let mut later = metadata();
        later.created_at = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        assert!(ResultsStore::open_or_create(&path, later).is_ok());

        let mut other = metadata();
        other.n_params = 21;
        let err = ResultsStore::open_or_create(&path, other).unwrap_err();
        assert!(
            matches!(err, StoreError::Incompatible { field: "n_params", .. }),
            "{err}"
        );

        let mut other = metadata();
        other.model = "other".to_owned();
        let err = ResultsStore::open_or_create(&path, other).unwrap_err();
        assert!(matches!(err, StoreError::Incompatible { field: "model", .. }));

        let mut other = metadata();
        other.settings.n_labellers = 9;
        other.settings.seed = 7;
        let err = ResultsStore::open_or_create(&path, other).unwrap_err();
        assert!(matches!(err, StoreError::Incompatible { field: "n_labellers", .. }));

        let mut other = metadata();
        other.settings.mask_rate = 0.9;
        let err = ResultsStore::open_or_create(&path, other).unwrap_err();
        assert!(matches!(err, StoreError::Incompatible { field: "mask_rate", .. }));

        let mut other = metadata();
        other.settings.fit.n_restarts += 1;
        let err = ResultsStore::open_or_create(&path, other).unwrap_err();
        assert!(matches!(err, StoreError::Incompatible { field: "fit", .. }));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_replaces_file_without_leaving_temp() {
        let path = temp_path("replace");
        let mut store = ResultsStore::new(metadata());
        store.save(&path).unwrap();
        store
            .insert(
                Method::Raykar,
                0,
                SplitPredictions {
                    predictions: vec![Some(0.5); 4],
                },
            )
            .unwrap();
        store.save(&path).unwrap();

        assert!(!temp_path_for(&path).exists());
        assert_eq!(ResultsStore::load(&path).unwrap().computed_count(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stale_temp_file_does_not_affect_store() {
        let path = temp_path("stale");
        let store = ResultsStore::new(metadata());
        store.save(&path).unwrap();
        std::fs::write(temp_path_for(&path), "{ truncated").unwrap();

        let loaded = ResultsStore::load(&path).unwrap();
        assert_eq!(loaded.metadata(), store.metadata());
        assert_eq!(loaded.computed_count(), 0);
        store.save(&path).unwrap();
        assert!(!temp_path_for(&path).exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_corrupt_store_is_rejected() {
        let path = temp_path("corrupt");
        let mut store = ResultsStore::new(metadata());
        store.cells.get_mut(&Method::Raykar).unwrap().pop();
        store.save(&path).unwrap();
        let err = ResultsStore::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "{err}");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ResultsStore::load(temp_path("does-not-exist")).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
        assert!(err.to_string().contains("does-not-exist"));
    }
}
