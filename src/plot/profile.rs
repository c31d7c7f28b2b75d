//! Vertical profile charts: value on x, altitude on y

use super::{ALTITUDE_LABEL, Chart, padded_range, series_color};
use crate::models::Variable;
use crate::models::table::value_range;
use chrono::{DateTime, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;

/// One profile line
#[derive(Debug, Clone)]
pub struct ProfileLine {
    pub label: String,
    pub time: DateTime<Utc>,
    /// `(altitude, value)` sorted by altitude
    pub points: Vec<(f64, f64)>,
}

/// One or more vertical profiles of the same variable
#[derive(Debug, Clone)]
pub struct ProfileChart {
    title: String,
    variable: Variable,
    lines: Vec<ProfileLine>,
}

impl ProfileChart {
    #[must_use]
    pub fn new(title: impl Into<String>, variable: Variable) -> Self {
        Self {
            title: title.into(),
            variable,
            lines: Vec::new(),
        }
    }

    /// Add a profile; empty profiles are skipped
    pub fn push(&mut self, label: impl Into<String>, time: DateTime<Utc>, points: Vec<(f64, f64)>) {
        if points.is_empty() {
            return;
        }
        self.lines.push(ProfileLine {
            label: format!("{} {}", label.into(), time.format("%H:%M")),
            time,
            points,
        });
    }

    #[must_use]
    pub fn lines(&self) -> &[ProfileLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Padded value axis range
    #[must_use]
    pub fn value_axis(&self) -> (f64, f64) {
        let (lo, hi) = value_range(self.lines.iter().flat_map(|l| l.points.iter().map(|(_, v)| *v)))
            .unwrap_or((0.0, 1.0));
        padded_range(lo, hi)
    }

    /// Padded altitude axis range
    #[must_use]
    pub fn altitude_axis(&self) -> (f64, f64) {
        let (lo, hi) = value_range(self.lines.iter().flat_map(|l| l.points.iter().map(|(a, _)| *a)))
            .unwrap_or((0.0, 1000.0));
        padded_range(lo, hi)
    }
}

impl Chart for ProfileChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let (x0, x1) = self.value_axis();
        let (y0, y1) = self.altitude_axis();

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc(self.variable.axis_label())
            .y_desc(ALTITUDE_LABEL)
            .light_line_style(BLACK.mix(0.08))
            .draw()?;

        for (i, line) in self.lines.iter().enumerate() {
            let color = series_color(i);
            chart
                .draw_series(LineSeries::new(
                    line.points.iter().map(|(altitude, value)| (*value, *altitude)),
                    color.stroke_width(2),
                ))?
                .label(line.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            if line.points.len() < 20 {
                chart.draw_series(
                    line.points
                        .iter()
                        .map(|(altitude, value)| Circle::new((*value, *altitude), 3, color.filled())),
                )?;
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.85))
            .draw()?;
        Ok(())
    }
}
