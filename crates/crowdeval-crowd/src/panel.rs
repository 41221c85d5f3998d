use crate::LabellerProfile;

/// One cell of a crowd label panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum CrowdLabel {
    /// The labeller saw the example and reported this label.
    Observed(bool),
    /// The labeller never saw the example.
    Missing,
}

impl CrowdLabel {
    /// Returns the reported label, or `None` for a missing cell.
    #[must_use]
    pub fn observed(self) -> Option<bool> {
        match self {
            Self::Observed(label) => Some(label),
            Self::Missing => None,
        }
    }
}

/// Noisy labels from a panel of labellers, indexed by `(labeller, example)`.
///
/// Cells are stored labeller-major: the labels of one labeller for all
/// examples are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct CrowdLabelPanel {
    profiles: Vec<LabellerProfile>,
    n_examples: usize,
    cells: Vec<CrowdLabel>,
}

impl CrowdLabelPanel {
    /// Creates a panel from labeller-major cells.
    ///
    /// # Panics
    ///
    /// Panics if `cells.len() != profiles.len() * n_examples`.
    #[must_use]
    pub fn new(profiles: Vec<LabellerProfile>, n_examples: usize, cells: Vec<CrowdLabel>) -> Self {
        assert_eq!(
            cells.len(),
            profiles.len() * n_examples,
            "panel cells must cover every (labeller, example) pair"
        );
        Self {
            profiles,
            n_examples,
            cells,
        }
    }

    #[must_use]
    pub fn n_labellers(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn n_examples(&self) -> usize {
        self.n_examples
    }

    /// The error profiles the panel was generated with, one per labeller.
    #[must_use]
    pub fn profiles(&self) -> &[LabellerProfile] {
        &self.profiles
    }

    #[must_use]
    pub fn get(&self, labeller: usize, example: usize) -> CrowdLabel {
        assert!(example < self.n_examples);
        self.cells[labeller * self.n_examples + example]
    }

    /// All labels reported by one labeller, indexed by example.
    #[must_use]
    pub fn labeller_row(&self, labeller: usize) -> &[CrowdLabel] {
        let start = labeller * self.n_examples;
        &self.cells[start..start + self.n_examples]
    }

    /// The labels every labeller gave to one example, in labeller order.
    pub fn example_column(&self, example: usize) -> impl Iterator<Item = CrowdLabel> + '_ {
        assert!(example < self.n_examples);
        (0..self.n_labellers()).map(move |labeller| self.get(labeller, example))
    }

    /// Number of cells that are not [`CrowdLabel::Missing`].
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_observed()).count()
    }

    /// Restricts the panel to the given examples, keeping their order.
    #[must_use]
    pub fn select_examples(&self, examples: &[usize]) -> Self {
        let cells = (0..self.n_labellers())
            .flat_map(|labeller| {
                let row = self.labeller_row(labeller);
                examples.iter().map(move |&example| row[example])
            })
            .collect();
        Self {
            profiles: self.profiles.clone(),
            n_examples: examples.len(),
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> LabellerProfile {
        LabellerProfile {
            true_positive_rate: 1.0,
            false_positive_rate: 0.0,
        }
    }

    fn sample_panel() -> CrowdLabelPanel {
        use CrowdLabel::{Missing, Observed};
        CrowdLabelPanel::new(
            vec![profile(), profile()],
            3,
            vec![
                Observed(true),
                Missing,
                Observed(false),
                Observed(false),
                Observed(true),
                Missing,
            ],
        )
    }

    #[test]
    fn test_indexing() {
        let panel = sample_panel();
        assert_eq!(panel.n_labellers(), 2);
        assert_eq!(panel.n_examples(), 3);
        assert_eq!(panel.get(0, 0), CrowdLabel::Observed(true));
        assert_eq!(panel.get(1, 2), CrowdLabel::Missing);
        assert_eq!(
            panel.example_column(1).collect::<Vec<_>>(),
            vec![CrowdLabel::Missing, CrowdLabel::Observed(true)]
        );
        assert_eq!(panel.observed_count(), 4);
    }

    #[test]
    fn test_select_examples() {
        let panel = sample_panel().select_examples(&[2, 0]);
        assert_eq!(panel.n_examples(), 2);
        assert_eq!(
            panel.labeller_row(0),
            &[CrowdLabel::Observed(false), CrowdLabel::Observed(true)]
        );
        assert_eq!(
            panel.labeller_row(1),
            &[CrowdLabel::Missing, CrowdLabel::Observed(false)]
        );
    }

    #[test]
    fn test_missing_has_no_label() {
        assert_eq!(CrowdLabel::Missing.observed(), None);
        assert_eq!(CrowdLabel::Observed(false).observed(), Some(false));
    }

    #[test]
    #[should_panic(expected = "panel cells must cover")]
    fn test_shape_mismatch_panics() {
        let _ = CrowdLabelPanel::new(vec![profile()], 2, vec![CrowdLabel::Missing]);
    }
}
