use std::ops::{Range, RangeInclusive};

/// Counts of values per equal-width bin over an explicit range.
///
/// Values below the range are counted in the first bin and values above it in
/// the last, so every input value lands in exactly one bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Bins in ascending order, covering the range without gaps.
    pub bins: Vec<HistogramBin>,
}

/// A single bin in a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    /// Inclusive start, exclusive end. The last bin also holds the range end.
    pub range: Range<f64>,
    /// The number of values that fall within this bin's range.
    pub count: usize,
}

impl HistogramBin {
    #[must_use]
    pub fn center(&self) -> f64 {
        f64::midpoint(self.range.start, self.range.end)
    }
}

impl Histogram {
    /// Creates a histogram of `num_bins` bins spanning `min..max`.
    ///
    /// # Panics
    ///
    /// Panics if `num_bins` is zero or `min >= max`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use crowdeval_stats::histogram::Histogram;
    /// let histogram = Histogram::fixed_width([0.5, 1.5, 1.7, 9.0], 4, 0.0, 4.0);
    /// let counts = histogram.bins.iter().map(|b| b.count).collect::<Vec<_>>();
    /// assert_eq!(counts, [1, 2, 0, 1]);
    /// ```
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn fixed_width<I>(values: I, num_bins: usize, min: f64, max: f64) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        assert!(num_bins > 0, "histogram needs at least one bin");
        assert!(min < max, "histogram range {min}..{max} is empty");

        let width = (max - min) / num_bins as f64;
        let mut bins = (0..num_bins)
            .map(|i| HistogramBin {
                range: min + width * i as f64..min + width * (i + 1) as f64,
                count: 0,
            })
            .collect::<Vec<_>>();
        for value in values {
            let index = (((value - min) / width).floor().max(0.0) as usize).min(num_bins - 1);
            bins[index].count += 1;
        }
        Self { bins }
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    #[must_use]
    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// Indices from the first to the last non-empty bin, if any bin is non-empty.
    #[must_use]
    pub fn occupied(&self) -> Option<RangeInclusive<usize>> {
        let first = self.bins.iter().position(|b| b.count > 0)?;
        let last = self.bins.iter().rposition(|b| b.count > 0)?;
        Some(first..=last)
    }
}
