/// Shape error raised when building a [`FeatureMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("row {row} has {found} features, expected {expected}")]
pub struct RaggedRowsError {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

/// Dense row-major matrix of example features.
///
/// Every row has the same number of features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_examples: usize,
    n_features: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Builds a matrix from rows.
    ///
    /// An empty row list gives a matrix with zero examples and zero features.
    pub fn from_rows<I>(rows: I) -> Result<Self, RaggedRowsError>
    where
        I: IntoIterator<Item = Vec<f64>>,
    {
        let mut n_examples = 0;
        let mut n_features = None;
        let mut values = vec![];
        for (row, features) in rows.into_iter().enumerate() {
            n_examples += 1;
            let expected = *n_features.get_or_insert(features.len());
            if features.len() != expected {
                return Err(RaggedRowsError {
                    row,
                    expected,
                    found: features.len(),
                });
            }
            values.extend(features);
        }
        Ok(Self {
            n_examples,
            n_features: n_features.unwrap_or(0),
            values,
        })
    }

    #[must_use]
    pub fn n_examples(&self) -> usize {
        self.n_examples
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn row(&self, example: usize) -> &[f64] {
        assert!(example < self.n_examples, "example index out of range");
        let start = example * self.n_features;
        &self.values[start..start + self.n_features]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_examples()).map(|i| self.row(i))
    }

    /// Copies the given rows, in order, into a new matrix.
    #[must_use]
    pub fn select_rows(&self, examples: &[usize]) -> Self {
        let mut values = Vec::with_capacity(examples.len() * self.n_features);
        for &example in examples {
            values.extend_from_slice(self.row(example));
        }
        Self {
            n_examples: examples.len(),
            n_features: self.n_features,
            values,
        }
    }
}

/// Per-column z-score transform fitted on training rows.
///
/// Constant columns keep a unit scale so they map to zero instead of NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let n = matrix.n_examples().max(1) as f64;
        let mut means = vec![0.0; matrix.n_features()];
        for row in matrix.rows() {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }
        let mut scales = vec![0.0; matrix.n_features()];
        for row in matrix.rows() {
            for ((s, m), x) in scales.iter_mut().zip(&means).zip(row) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut scales {
            *s = (*s / n).sqrt();
            if *s <= f64::EPSILON {
                *s = 1.0;
            }
        }
        Self { means, scales }
    }

    /// Standardizes `row` and prepends a constant bias feature of 1.0.
    #[must_use]
    pub fn transform_with_bias(&self, row: &[f64]) -> Vec<f64> {
        std::iter::once(1.0)
            .chain(
                row.iter()
                    .zip(&self.means)
                    .zip(&self.scales)
                    .map(|((x, m), s)| (x - m) / s),
            )
            .collect()
    }
}
