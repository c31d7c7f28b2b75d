//! Chart rendering
//!
//! Charts are drawn with `plotters` onto either a bitmap (PNG) or an SVG
//! backend. Every chart type implements [`Chart`]; [`render`] owns the
//! backend, the output file and the error mapping.

pub mod colormap;
pub mod heatmap;
pub mod profile;
pub mod timeseries;

use crate::MeteoError;
use crate::models::Variable;
use chrono::{DateTime, Duration, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub use colormap::ColorScale;
pub use heatmap::TimeHeightChart;
pub use profile::ProfileChart;
pub use timeseries::TimeSeriesChart;

/// Share of the data span added on each side of an axis
const AXIS_PADDING: f64 = 0.05;

/// Line colours, cycled per series
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(214, 39, 40),
    RGBColor(44, 160, 44),
    RGBColor(255, 127, 14),
    RGBColor(148, 103, 189),
    RGBColor(23, 190, 207),
];

pub const ALTITUDE_LABEL: &str = "Altitude [m a.s.l.]";

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(MeteoError::validation(format!(
                "unsupported image format '{other}', expected png or svg"
            ))),
        }
    }
}

/// A chart that can draw itself onto any plotters backend
pub trait Chart {
    fn title(&self) -> &str;

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>>;
}

/// Render `chart` to `<dir>/<file_stem>.<ext>` and return the written path
pub fn render<C: Chart>(
    chart: &C,
    dir: &Path,
    file_stem: &str,
    format: ImageFormat,
    size: (u32, u32),
) -> Result<PathBuf, MeteoError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{file_stem}.{}", format.extension()));
    debug!(path = %path.display(), width = size.0, height = size.1, "rendering '{}'", chart.title());

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(&path, size).into_drawing_area();
            draw_on(chart, &root)?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(&path, size).into_drawing_area();
            draw_on(chart, &root)?;
        }
    }

    info!("wrote {}", path.display());
    Ok(path)
}

fn draw_on<C: Chart, DB: DrawingBackend>(chart: &C, root: &DrawingArea<DB, Shift>) -> Result<(), MeteoError> {
    root.fill(&WHITE).map_err(plot_error)?;
    chart.draw(root).map_err(plot_error)?;
    root.present().map_err(plot_error)
}

fn plot_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> MeteoError {
    MeteoError::plot(err.to_string())
}

/// `<station>_<kind>_<variable>_<YYYYmmddHHMM>`
#[must_use]
pub fn file_stem(station: &str, kind: &str, variable: Variable, time: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}_{}",
        station,
        kind,
        variable.short_name(),
        time.format("%Y%m%d%H%M")
    )
}

/// Axis range with padding on both sides; constant data still gets a visible span
#[must_use]
pub fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    let pad = if span.abs() < f64::EPSILON {
        (min.abs() * AXIS_PADDING).max(1.0)
    } else {
        span * AXIS_PADDING
    };
    (min - pad, max + pad)
}

#[must_use]
pub fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Fractional hours from `start` to `time`, the x coordinate of time axes
#[must_use]
pub fn hours_since(start: DateTime<Utc>, time: DateTime<Utc>) -> f64 {
    (time - start).num_seconds() as f64 / 3600.0
}

/// Label for an x coordinate produced by [`hours_since`]
#[must_use]
pub fn time_label(start: DateTime<Utc>, hours: f64, span_hours: f64) -> String {
    let time = start + Duration::seconds((hours * 3600.0).round() as i64);
    if span_hours > 48.0 {
        time.format("%d.%m %Hh").to_string()
    } else {
        time.format("%H:%M").to_string()
    }
}

/// Split a series into runs of consecutive present values
#[must_use]
pub fn split_at_gaps(points: &[(f64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (x, y) in points {
        match y {
            Some(y) => current.push((*x, *y)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}
