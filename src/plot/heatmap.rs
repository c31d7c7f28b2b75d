//! Time-height heatmaps

use super::{ALTITUDE_LABEL, Chart, ColorScale, hours_since, time_label};
use crate::MeteoError;
use crate::models::TimeHeightGrid;
use plotters::coord::Shift;
use plotters::prelude::*;

/// Steps drawn in the colour bar
const COLOR_BAR_STEPS: usize = 64;

/// Half extent given to a grid with a single time, in hours
const SINGLE_TIME_HALF_WIDTH_H: f64 = 0.5;
/// Half extent given to a grid with a single level, in m
const SINGLE_LEVEL_HALF_HEIGHT_M: f64 = 50.0;

/// One coloured cell, in chart coordinates (hours, metres)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapCell {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub value: f64,
}

/// Heatmap of one variable over time and altitude
#[derive(Debug, Clone)]
pub struct TimeHeightChart {
    title: String,
    grid: TimeHeightGrid,
    scale: ColorScale,
}

impl TimeHeightChart {
    pub fn new(title: impl Into<String>, grid: TimeHeightGrid) -> Result<Self, MeteoError> {
        let (min, max) = grid
            .value_range()
            .ok_or_else(|| MeteoError::no_data(format!("no {} values to plot", grid.variable.label())))?;
        let scale = ColorScale::for_variable(grid.variable, min, max);
        Ok(Self {
            title: title.into(),
            grid,
            scale,
        })
    }

    #[must_use]
    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Cell edges along the time axis, in hours since the first time
    #[must_use]
    pub fn time_edges(&self) -> Vec<f64> {
        let start = self.grid.times[0];
        let centers: Vec<f64> = self.grid.times.iter().map(|t| hours_since(start, *t)).collect();
        edges(&centers, SINGLE_TIME_HALF_WIDTH_H)
    }

    /// Cell edges along the altitude axis
    #[must_use]
    pub fn altitude_edges(&self) -> Vec<f64> {
        edges(&self.grid.altitudes, SINGLE_LEVEL_HALF_HEIGHT_M)
    }

    /// Every present grid value as a rectangle
    #[must_use]
    pub fn cells(&self) -> Vec<HeatmapCell> {
        let x = self.time_edges();
        let y = self.altitude_edges();
        let mut cells = Vec::new();
        for (ti, row) in self.grid.values.iter().enumerate() {
            for (ai, value) in row.iter().enumerate() {
                if let Some(value) = value {
                    cells.push(HeatmapCell {
                        x0: x[ti],
                        x1: x[ti + 1],
                        y0: y[ai],
                        y1: y[ai + 1],
                        value: *value,
                    });
                }
            }
        }
        cells
    }
}

/// Boundaries halfway between neighbouring centres, extrapolated at both ends
fn edges(centers: &[f64], single_half_width: f64) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [only] => vec![only - single_half_width, only + single_half_width],
        [first, second, ..] => {
            let mut edges = Vec::with_capacity(centers.len() + 1);
            edges.push(first - (second - first) / 2.0);
            edges.extend(centers.windows(2).map(|pair| (pair[0] + pair[1]) / 2.0));
            let n = centers.len();
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

impl Chart for TimeHeightChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let (main, bar) = root.split_horizontally(88.percent_width());
        let x = self.time_edges();
        let y = self.altitude_edges();
        let (x0, x1) = (x[0], x[x.len() - 1]);
        let (y0, y1) = (y[0], y[y.len() - 1]);
        let start = self.grid.times[0];
        let span = x1 - x0;

        let mut chart = ChartBuilder::on(&main)
            .caption(&self.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Time [UTC]")
            .y_desc(ALTITUDE_LABEL)
            .x_label_formatter(&|h| time_label(start, *h, span))
            .draw()?;

        chart.draw_series(self.cells().into_iter().map(|cell| {
            Rectangle::new(
                [(cell.x0, cell.y1), (cell.x1, cell.y0)],
                self.scale.color(cell.value).filled(),
            )
        }))?;

        let mut legend = ChartBuilder::on(&bar)
            .margin_top(60)
            .margin_bottom(65)
            .margin_right(10)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..1.0, self.scale.min()..self.scale.max())?;

        legend
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc(self.grid.variable.axis_label())
            .draw()?;

        legend.draw_series(self.scale.bands(COLOR_BAR_STEPS).into_iter().map(|(lo, hi)| {
            Rectangle::new([(0.0, hi), (1.0, lo)], self.scale.color((lo + hi) / 2.0).filled())
        }))?;
        Ok(())
    }
}
