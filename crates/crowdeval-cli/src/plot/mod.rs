//! Terminal chart of per-split balanced accuracy.
//!
//! One column per method along x, balanced accuracy in percent along y. All
//! coordinate state lives in [`PlotContext`]; nothing is kept between plots.

use crowdeval_classifier::Method;
use crowdeval_experiment::MethodSummary;

use self::app::PlotApp;

mod app;
mod shape;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum PlotStyle {
    /// One point per split
    #[default]
    Scatter,
    /// Mirrored density outline with a mean marker
    Violin,
}

/// Axis layout of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotContext {
    methods: Vec<Method>,
    y_bounds: [f64; 2],
}

impl PlotContext {
    /// Balanced accuracy is always drawn on the full percentage scale.
    pub const Y_BOUNDS: [f64; 2] = [0.0, 100.0];
    /// Half the width of one method column, in x units.
    pub const HALF_WIDTH: f64 = 0.4;

    pub fn new(methods: &[Method]) -> Self {
        Self {
            methods: methods.to_vec(),
            y_bounds: Self::Y_BOUNDS,
        }
    }

    /// Zero-based column of `method`, if it is plotted.
    pub fn column(&self, method: Method) -> Option<usize> {
        self.methods.iter().position(|&m| m == method)
    }

    /// Column center of `method`; columns sit at 1, 2, ... with a margin on each side.
    #[expect(clippy::cast_precision_loss)]
    pub fn x_position(&self, method: Method) -> Option<f64> {
        Some((self.column(method)? + 1) as f64)
    }

    #[expect(clippy::cast_precision_loss)]
    pub fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.methods.len() + 1) as f64]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        self.y_bounds
    }

    /// Axis labels are spread evenly over the bounds, so one blank label per
    /// margin puts every method name under its column.
    pub fn x_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.methods.len() + 2);
        labels.push(String::new());
        labels.extend(self.methods.iter().map(ToString::to_string));
        labels.push(String::new());
        labels
    }

    pub fn y_labels(&self) -> Vec<String> {
        let [low, high] = self.y_bounds;
        (0..=4)
            .map(|i| format!("{:.0}", low + (high - low) * f64::from(i) / 4.0))
            .collect()
    }

    fn clamp_y(&self, value: f64) -> f64 {
        value.clamp(self.y_bounds[0], self.y_bounds[1])
    }
}

pub fn show(
    context: &PlotContext,
    style: PlotStyle,
    summaries: &[MethodSummary],
) -> anyhow::Result<()> {
    let series = match style {
        PlotStyle::Scatter => shape::scatter(context, summaries),
        PlotStyle::Violin => shape::violin(context, summaries),
    };
    let mut app = PlotApp::new(context, style, &series);
    ratatui::run(|terminal| app.run(terminal))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_and_labels() {
        let context = PlotContext::new(&[Method::Raykar, Method::LogisticRegression]);
        assert_eq!(context.x_bounds(), [0.0, 3.0]);
        assert_eq!(context.x_position(Method::Raykar), Some(1.0));
        assert_eq!(context.x_position(Method::LogisticRegression), Some(2.0));
        assert_eq!(context.x_labels(), vec!["", "Raykar", "LR", ""]);
        assert_eq!(context.y_bounds(), [0.0, 100.0]);
        assert_eq!(context.y_labels(), vec!["0", "25", "50", "75", "100"]);
    }

    #[test]
    fn test_unplotted_method_has_no_column() {
        let context = PlotContext::new(&[Method::LogisticRegression]);
        assert_eq!(context.x_position(Method::Raykar), None);
        assert_eq!(context.x_position(Method::LogisticRegression), Some(1.0));
    }

    #[test]
    fn test_style_names() {
        assert_eq!("scatter".parse::<PlotStyle>().unwrap(), PlotStyle::Scatter);
        assert_eq!("violin".parse::<PlotStyle>().unwrap(), PlotStyle::Violin);
        assert!("bars".parse::<PlotStyle>().is_err());
    }
}
