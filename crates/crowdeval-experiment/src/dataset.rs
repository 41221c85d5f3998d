//! Loader for the flat input table.
//!
//! Each record is `id, feature_1, ..., feature_k, class`. The identifier is
//! ignored, the class code decides the positive class, and a missing-value
//! token in a feature column is imputed to `0.0`.

use std::{
    io,
    num::ParseFloatError,
    path::{Path, PathBuf},
};

use crowdeval_classifier::{FeatureMatrix, RaggedRowsError};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum DatasetError {
    #[display("failed to open input table {}", path.display())]
    Open { path: PathBuf, source: csv::Error },
    #[display("malformed input record: {_0}")]
    #[from]
    Csv(csv::Error),
    #[display("row {row} has {found} columns, expected at least 3 (id, features, class)")]
    TooFewColumns { row: usize, found: usize },
    #[display("row {row}, column {column}: invalid number '{value}'")]
    InvalidNumber {
        row: usize,
        column: usize,
        value: String,
        source: ParseFloatError,
    },
    #[display("inconsistent feature count: {_0}")]
    #[from]
    Ragged(RaggedRowsError),
    #[display("input table has no rows")]
    Empty,
}

/// How to read the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: u8,
    /// Class code that marks a positive example.
    pub positive_class: String,
    /// Feature token that marks a missing value.
    pub missing_token: String,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            positive_class: "4".to_owned(),
            missing_token: "?".to_owned(),
        }
    }
}

/// Features and ground-truth labels, aligned by example index.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: FeatureMatrix,
    pub labels: Vec<bool>,
}

impl Dataset {
    #[must_use]
    pub fn n_examples(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn n_positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

impl TableFormat {
    pub fn load<P>(&self, path: P) -> Result<Dataset, DatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let reader = self
            .reader_builder()
            .from_path(path)
            .map_err(|source| DatasetError::Open {
                path: path.to_owned(),
                source,
            })?;
        let dataset = self.parse(reader)?;
        log::debug!(
            "Loaded {} examples with {} features from {}",
            dataset.n_examples(),
            dataset.features.n_features(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn read<R>(&self, reader: R) -> Result<Dataset, DatasetError>
    where
        R: io::Read,
    {
        self.parse(self.reader_builder().from_reader(reader))
    }

    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true);
        builder
    }

    fn parse<R>(&self, mut reader: csv::Reader<R>) -> Result<Dataset, DatasetError>
    where
        R: io::Read,
    {
        let mut rows = vec![];
        let mut labels = vec![];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() < 3 {
                return Err(DatasetError::TooFewColumns {
                    row,
                    found: record.len(),
                });
            }
            let class = &record[record.len() - 1];
            labels.push(class == self.positive_class);

            let features = (1..record.len() - 1)
                .map(|column| {
                    let value = &record[column];
                    if value == self.missing_token {
                        return Ok(0.0);
                    }
                    value
                        .parse::<f64>()
                        .map_err(|source| DatasetError::InvalidNumber {
                            row,
                            column,
                            value: value.to_owned(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(features);
        }
        if labels.is_empty() {
            return Err(DatasetError::Empty);
        }
        let features = FeatureMatrix::from_rows(rows)?;
        Ok(Dataset { features, labels })
    }
}
