use rand::{Rng, seq::SliceRandom as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
pub enum RateRangeError {
    #[display("rate bound {value} is outside [0, 1]")]
    OutOfUnitInterval { value: f64 },
    #[display("rate range is inverted: min {min} > max {max}")]
    Inverted { min: f64, max: f64 },
}

/// A closed interval of rates inside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct RateRange {
    min: f64,
    max: f64,
}

impl Default for RateRange {
    /// The central half of the unit interval, `[0.25, 0.75]`.
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 0.75,
        }
    }
}

impl RateRange {
    pub fn new(min: f64, max: f64) -> Result<Self, RateRangeError> {
        for value in [min, max] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RateRangeError::OutOfUnitInterval { value });
            }
        }
        if min > max {
            return Err(RateRangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `count` evenly spaced rates from `min` to `max` inclusive.
    ///
    /// A single rate is `min`; zero rates is an empty vector.
    ///
    /// ```
    /// use crowdeval_crowd::RateRange;
    ///
    /// let range = RateRange::new(0.25, 0.75).unwrap();
    /// assert_eq!(range.evenly_spaced(5), vec![0.25, 0.375, 0.5, 0.625, 0.75]);
    /// assert_eq!(range.evenly_spaced(1), vec![0.25]);
    /// assert!(range.evenly_spaced(0).is_empty());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn evenly_spaced(&self, count: usize) -> Vec<f64> {
        match count {
            0 => vec![],
            1 => vec![self.min],
            _ => {
                let step = (self.max - self.min) / (count - 1) as f64;
                (0..count)
                    .map(|i| {
                        if i == count - 1 {
                            self.max
                        } else {
                            self.min + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }
}

impl TryFrom<[f64; 2]> for RateRange {
    type Error = RateRangeError;

    fn try_from([min, max]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<RateRange> for [f64; 2] {
    fn from(range: RateRange) -> Self {
        [range.min, range.max]
    }
}

/// Error profile of one simulated labeller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabellerProfile {
    /// Probability of reporting a true positive as positive.
    pub true_positive_rate: f64,
    /// Probability of reporting a true negative as positive.
    pub false_positive_rate: f64,
}

impl LabellerProfile {
    /// Assigns evenly spaced rates to `count` labellers.
    ///
    /// The true positive rates and false positive rates are shuffled with two
    /// independent permutations, so a labeller's two rates are unrelated. The
    /// multiset of each rate is fixed by `count` and the ranges; only the
    /// assignment to labellers is random.
    pub fn assign<R>(
        count: usize,
        tpr_range: RateRange,
        fpr_range: RateRange,
        rng: &mut R,
    ) -> Vec<Self>
    where
        R: Rng + ?Sized,
    {
        let mut tprs = tpr_range.evenly_spaced(count);
        tprs.shuffle(rng);
        let mut fprs = fpr_range.evenly_spaced(count);
        fprs.shuffle(rng);
        std::iter::zip(tprs, fprs)
            .map(|(true_positive_rate, false_positive_rate)| Self {
                true_positive_rate,
                false_positive_rate,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn sorted(mut values: Vec<f64>) -> Vec<f64> {
        values.sort_by(f64::total_cmp);
        values
    }

    #[test]
    fn test_range_validation() {
        assert!(RateRange::new(0.0, 1.0).is_ok());
        assert!(RateRange::new(0.5, 0.5).is_ok());
        assert_eq!(
            RateRange::new(-0.1, 0.5),
            Err(RateRangeError::OutOfUnitInterval { value: -0.1 })
        );
        assert_eq!(
            RateRange::new(0.2, 1.5),
            Err(RateRangeError::OutOfUnitInterval { value: 1.5 })
        );
        assert_eq!(
            RateRange::new(0.75, 0.25),
            Err(RateRangeError::Inverted {
                min: 0.75,
                max: 0.25
            })
        );
    }

    #[test]
    fn test_range_deserialize_validates() {
        let range: RateRange = serde_json::from_str("[0.25, 0.75]").unwrap();
        assert_eq!(range.min(), 0.25);
        assert_eq!(range.max(), 0.75);
        assert!(serde_json::from_str::<RateRange>("[0.75, 0.25]").is_err());
    }

    #[test]
    fn test_assignment_keeps_rate_multiset() {
        let range = RateRange::new(0.25, 0.75).unwrap();
        let mut rng = Pcg64::seed_from_u64(7);
        let profiles = LabellerProfile::assign(5, range, range, &mut rng);
        assert_eq!(profiles.len(), 5);

        let tprs = sorted(profiles.iter().map(|p| p.true_positive_rate).collect());
        let fprs = sorted(profiles.iter().map(|p| p.false_positive_rate).collect());
        assert_eq!(tprs, range.evenly_spaced(5));
        assert_eq!(fprs, range.evenly_spaced(5));
    }

    #[test]
    fn test_assignment_is_seed_deterministic() {
        let range = RateRange::new(0.1, 0.9).unwrap();
        let a = LabellerProfile::assign(8, range, range, &mut Pcg64::seed_from_u64(3));
        let b = LabellerProfile::assign(8, range, range, &mut Pcg64::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_labellers() {
        let range = RateRange::new(0.25, 0.75).unwrap();
        let mut rng = Pcg64::seed_from_u64(0);
        assert!(LabellerProfile::assign(0, range, range, &mut rng).is_empty());
    }
}
