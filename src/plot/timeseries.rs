//! Timeseries line charts

use super::{Chart, hours_since, padded_range, series_color, split_at_gaps, time_label};
use crate::models::table::value_range;
use crate::models::{TimeSeries, Variable};
use chrono::{DateTime, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;

/// One or more series of the same variable against time
#[derive(Debug, Clone)]
pub struct TimeSeriesChart {
    title: String,
    variable: Variable,
    series: Vec<TimeSeries>,
}

impl TimeSeriesChart {
    #[must_use]
    pub fn new(title: impl Into<String>, variable: Variable) -> Self {
        Self {
            title: title.into(),
            variable,
            series: Vec::new(),
        }
    }

    /// Add a series; series without any value are skipped
    pub fn push(&mut self, series: TimeSeries) {
        if series.value_range().is_some() {
            self.series.push(series);
        }
    }

    /// Series that made it onto the chart
    #[must_use]
    pub fn series(&self) -> &[TimeSeries] {
        &self.series
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// First timestamp over all series, the origin of the x axis
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.series.iter().filter_map(|s| s.time_range()).map(|(first, _)| first).min()
    }

    /// x axis extent in hours since [`TimeSeriesChart::start`]
    #[must_use]
    pub fn time_axis(&self) -> (f64, f64) {
        let Some(start) = self.start() else {
            return (0.0, 1.0);
        };
        let end = self
            .series
            .iter()
            .filter_map(|s| s.time_range())
            .map(|(_, last)| last)
            .max()
            .unwrap_or(start);
        let hours = hours_since(start, end);
        if hours > 0.0 { (0.0, hours) } else { (-0.5, 0.5) }
    }

    #[must_use]
    pub fn value_axis(&self) -> (f64, f64) {
        let (lo, hi) = value_range(self.series.iter().filter_map(TimeSeries::value_range).flat_map(|(lo, hi)| [lo, hi]))
            .unwrap_or((0.0, 1.0));
        padded_range(lo, hi)
    }

    /// Line segments of one series in chart coordinates, split at missing values
    #[must_use]
    pub fn segments(&self, index: usize) -> Vec<Vec<(f64, f64)>> {
        let (Some(start), Some(series)) = (self.start(), self.series.get(index)) else {
            return Vec::new();
        };
        let points: Vec<(f64, Option<f64>)> = series
            .points
            .iter()
            .map(|(t, v)| (hours_since(start, *t), *v))
            .collect();
        split_at_gaps(&points)
    }
}

impl Chart for TimeSeriesChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let (x0, x1) = self.time_axis();
        let (y0, y1) = self.value_axis();
        let start = self.start().unwrap_or_default();
        let span = x1 - x0;

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc("Time [UTC]")
            .y_desc(self.variable.axis_label())
            .x_label_formatter(&|h| time_label(start, *h, span))
            .light_line_style(BLACK.mix(0.08))
            .draw()?;

        for (i, series) in self.series.iter().enumerate() {
            let color = series_color(i);
            let segments = self.segments(i);
            let isolated: Vec<(f64, f64)> = segments.iter().filter(|s| s.len() == 1).map(|s| s[0]).collect();

            chart
                .draw_series(
                    segments
                        .into_iter()
                        .map(|segment| PathElement::new(segment, color.stroke_width(2))),
                )?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            chart.draw_series(isolated.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.85))
            .draw()?;
        Ok(())
    }
}
