use crowdeval_classifier::Method;
use crowdeval_experiment::MethodSummary;
use crowdeval_stats::histogram::Histogram;

use super::PlotContext;

/// Fixed-width histogram bins spanning the y range.
const VIOLIN_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Individual markers.
    Points,
    /// Connected polyline.
    Line,
}

/// Chart data in plot coordinates (x = column, y = percent).
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub method: Method,
    pub name: String,
    pub kind: SeriesKind,
    pub points: Vec<(f64, f64)>,
}

/// Percent scores of the scored splits, clamped to the y range.
fn percent_scores(context: &PlotContext, summary: &MethodSummary) -> Vec<f64> {
    summary
        .evaluated()
        .map(|score| context.clamp_y(score * 100.0))
        .collect()
}

pub fn scatter(context: &PlotContext, summaries: &[MethodSummary]) -> Vec<Series> {
    summaries
        .iter()
        .filter_map(|summary| {
            let x = context.x_position(summary.method)?;
            let points = percent_scores(context, summary)
                .into_iter()
                .map(|y| (x, y))
                .collect();
            Some(Series {
                method: summary.method,
                name: summary.method.to_string(),
                kind: SeriesKind::Points,
                points,
            })
        })
        .collect()
}

pub fn violin(context: &PlotContext, summaries: &[MethodSummary]) -> Vec<Series> {
    let mut series = vec![];
    for summary in summaries {
        let Some(x) = context.x_position(summary.method) else {
            continue;
        };
        let scores = percent_scores(context, summary);
        if scores.is_empty() {
            continue;
        }
        series.push(Series {
            method: summary.method,
            name: summary.method.to_string(),
            kind: SeriesKind::Line,
            points: violin_outline(context, x, &scores),
        });
        let mean = context.clamp_y(summary.mean * 100.0);
        let tick = PlotContext::HALF_WIDTH / 2.0;
        series.push(Series {
            method: summary.method,
            name: format!("{} mean", summary.method),
            kind: SeriesKind::Line,
            points: vec![(x - tick, mean), (x + tick, mean)],
        });
    }
    series
}

/// Closed outline around column `x`: from the lowest score up the left side,
/// through the highest score, and back down the right side.
///
/// The half width at each occupied bin is proportional to its count, reaching
/// [`PlotContext::HALF_WIDTH`] at the fullest bin.
#[expect(clippy::cast_precision_loss)]
fn violin_outline(context: &PlotContext, x: f64, scores: &[f64]) -> Vec<(f64, f64)> {
    let [low, high] = context.y_bounds();
    let histogram = Histogram::fixed_width(scores.iter().copied(), VIOLIN_BINS, low, high);
    let Some(occupied) = histogram.occupied() else {
        return vec![];
    };

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max_count = histogram.max_count().max(1) as f64;
    let ribs = histogram.bins[occupied]
        .iter()
        .map(|bin| {
            let half = PlotContext::HALF_WIDTH * bin.count as f64 / max_count;
            (bin.center().clamp(min, max), half)
        })
        .collect::<Vec<_>>();

    let mut outline = Vec::with_capacity(2 * ribs.len() + 3);
    outline.push((x, min));
    outline.extend(ribs.iter().map(|&(y, half)| (x - half, y)));
    outline.push((x, max));
    outline.extend(ribs.iter().rev().map(|&(y, half)| (x + half, y)));
    outline.push((x, min));
    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(method: Method, scores: &[Option<f64>]) -> MethodSummary {
        let evaluated = scores.iter().flatten().copied().collect::<Vec<_>>();
        #[expect(clippy::cast_precision_loss)]
        let mean = evaluated.iter().sum::<f64>() / evaluated.len() as f64;
        MethodSummary {
            method,
            scores: scores.to_vec(),
            mean,
            std_dev: 0.0,
        }
    }

    fn context() -> PlotContext {
        PlotContext::new(&[Method::Raykar, Method::LogisticRegression])
    }

    #[test]
    fn test_scatter_one_point_per_scored_split() {
        let summaries = [
            summary(Method::Raykar, &[Some(0.5), None, Some(0.75)]),
            summary(Method::LogisticRegression, &[Some(1.0)]),
        ];
        let series = scatter(&context(), &summaries);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].points, vec![(1.0, 50.0), (1.0, 75.0)]);
        assert_eq!(series[1].points, vec![(2.0, 100.0)]);
        assert!(series.iter().all(|s| s.kind == SeriesKind::Points));
    }

    #[test]
    fn test_violin_outline_is_closed_and_mirrored() {
        let summaries = [summary(
            Method::LogisticRegression,
            &[Some(0.52), Some(0.58), Some(0.61), Some(0.63), Some(0.71)],
        )];
        let series = violin(&context(), &summaries);
        assert_eq!(series.len(), 2);

        let outline = &series[0].points;
        assert_eq!(outline.first(), outline.last());
        assert_eq!(outline[0].0, 2.0);
        assert!((outline[0].1 - 52.0).abs() < 1e-9);
        let ribs = (outline.len() - 3) / 2;
        for i in 0..ribs {
            let (left_x, left_y) = outline[1 + i];
            let (right_x, right_y) = outline[outline.len() - 2 - i];
            assert!((left_y - right_y).abs() < 1e-9);
            assert!(((2.0 - left_x) - (right_x - 2.0)).abs() < 1e-9);
            assert!(right_x - 2.0 <= PlotContext::HALF_WIDTH + 1e-9);
            assert!((51.9..=71.1).contains(&left_y));
        }
        // fullest bin (60-65) reaches the full column width
        assert!(
            outline
                .iter()
                .any(|&(x, _)| (x - (2.0 + PlotContext::HALF_WIDTH)).abs() < 1e-9)
        );

        let mean = &series[1].points;
        assert_eq!(mean.len(), 2);
        assert!((mean[0].1 - 61.0).abs() < 1e-9);
    }

    #[test]
    fn test_violin_skips_unscored_methods() {
        let summaries = [MethodSummary {
            method: Method::Raykar,
            scores: vec![None],
            mean: 0.0,
            std_dev: 0.0,
        }];
        assert!(violin(&context(), &summaries).is_empty());
    }
}
