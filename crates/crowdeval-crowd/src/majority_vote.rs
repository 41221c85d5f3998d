//! Majority-vote consensus over observed crowd labels.

use crate::CrowdLabelPanel;

/// The crowd's consensus on one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Consensus {
    /// No labeller observed the example; there is no consensus.
    NoVotes,
    /// At least one labeller observed the example.
    Votes { positive: usize, total: usize },
}

impl Consensus {
    /// Fraction of observed votes that are positive.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        match *self {
            Self::NoVotes => None,
            Self::Votes { positive, total } => Some(positive as f64 / total as f64),
        }
    }

    /// Majority label: positive iff strictly more than half the votes are positive.
    ///
    /// ```
    /// use crowdeval_crowd::Consensus;
    ///
    /// assert_eq!(Consensus::Votes { positive: 2, total: 3 }.label(), Some(true));
    /// assert_eq!(Consensus::Votes { positive: 1, total: 2 }.label(), Some(false));
    /// assert_eq!(Consensus::NoVotes.label(), None);
    /// ```
    #[must_use]
    pub fn label(&self) -> Option<bool> {
        match *self {
            Self::NoVotes => None,
            Self::Votes { positive, total } => Some(2 * positive > total),
        }
    }
}

/// Reduces a panel to one consensus per example, counting only observed cells.
#[must_use]
pub fn reduce(panel: &CrowdLabelPanel) -> Vec<Consensus> {
    (0..panel.n_examples())
        .map(|example| {
            let (positive, total) = panel
                .example_column(example)
                .filter_map(|cell| cell.observed())
                .fold((0, 0), |(positive, total), label| {
                    (positive + usize::from(label), total + 1)
                });
            if total == 0 {
                Consensus::NoVotes
            } else {
                Consensus::Votes { positive, total }
            }
        })
        .collect()
}
