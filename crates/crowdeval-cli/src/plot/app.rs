use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
    style::{Color, Style, Stylize as _},
    symbols::{Marker, merge::MergeStrategy},
    text::Line,
    widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph},
};

use super::{
    PlotContext, PlotStyle,
    shape::{Series, SeriesKind},
};

const PALETTE: [Color; 4] = [Color::Cyan, Color::Yellow, Color::Magenta, Color::Green];

#[derive(Debug)]
pub struct PlotApp<'a> {
    context: &'a PlotContext,
    style: PlotStyle,
    series: &'a [Series],
    exiting: bool,
}

impl<'a> PlotApp<'a> {
    pub fn new(context: &'a PlotContext, style: PlotStyle, series: &'a [Series]) -> Self {
        Self {
            context,
            style,
            series,
            exiting: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.exiting {
            terminal.draw(|f| self.draw(f))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let [chart_area, help_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());

        let datasets = self
            .series
            .iter()
            .map(|series| {
                let color = self.color_of(series);
                let dataset = Dataset::default()
                    .name(series.name.clone())
                    .style(Style::default().fg(color))
                    .data(&series.points);
                match series.kind {
                    SeriesKind::Points => dataset.marker(Marker::Dot).graph_type(GraphType::Scatter),
                    SeriesKind::Line => dataset.marker(Marker::Braille).graph_type(GraphType::Line),
                }
            })
            .collect::<Vec<_>>();

        let x_axis = Axis::default()
            .title("Method")
            .bounds(self.context.x_bounds())
            .labels(self.context.x_labels());
        let y_axis = Axis::default()
            .title("Balanced accuracy (%)")
            .bounds(self.context.y_bounds())
            .labels(self.context.y_labels());
        let title = match self.style {
            PlotStyle::Scatter => "Balanced accuracy per split",
            PlotStyle::Violin => "Balanced accuracy distribution",
        };
        let chart = Chart::new(datasets)
            .block(
                Block::bordered()
                    .merge_borders(MergeStrategy::Exact)
                    .title(title),
            )
            .x_axis(x_axis)
            .y_axis(y_axis);
        frame.render_widget(chart, chart_area);

        let help = Paragraph::new(Line::from("q/Esc: quit").dim());
        frame.render_widget(help, help_area);
    }

    /// Series of the same method share a color.
    fn color_of(&self, series: &Series) -> Color {
        let column = self.context.column(series.method).unwrap_or_default();
        PALETTE[column % PALETTE.len()]
    }

    fn handle_events(&mut self) -> anyhow::Result<()> {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                self.handle_key_event(key_event);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key_event: KeyEvent) {
        if matches!(key_event.code, KeyCode::Char('q') | KeyCode::Esc) {
            self.exiting = true;
        }
    }
}
