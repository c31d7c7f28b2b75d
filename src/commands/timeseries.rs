//! Timeseries command

use super::{MeteoService, ModelFiles, OutputOptions, Source, check_window};
use crate::MeteoError;
use crate::export;
use crate::models::{ProfileTable, TimeSeries, Variable};
use crate::plot::{self, TimeSeriesChart};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct TimeSeriesRequest {
    pub station: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub variable: Variable,
    pub sources: Vec<Source>,
    /// Level read from profile sources, in m a.s.l.
    pub altitude_m: Option<f64>,
    pub models: ModelFiles,
}

impl TimeSeriesRequest {
    fn validate(&self) -> Result<(), MeteoError> {
        check_window(self.start, self.end)?;
        if self.sources.is_empty() {
            return Err(MeteoError::validation("at least one source is required"));
        }
        if self.sources.iter().any(|s| s.is_profile()) && self.altitude_m.is_none() {
            return Err(MeteoError::validation(
                "an altitude is required for profile sources (rs, mwr, icon, arome)",
            ));
        }
        Ok(())
    }
}

/// Series of one source: the single level of surface data, else the level nearest to `altitude`
#[must_use]
pub fn series_for_source(
    source: Source,
    station: &str,
    table: &ProfileTable,
    variable: Variable,
    altitude: Option<f64>,
) -> TimeSeries {
    match altitude.filter(|_| source.is_profile()) {
        Some(altitude) => TimeSeries::new(
            format!("{station} {source} {altitude:.0} m"),
            variable,
            table.series_at_altitude(altitude, variable),
        ),
        None => TimeSeries::from_table(format!("{station} {source}"), table, variable),
    }
}

/// Render the timeseries chart and return its path
#[instrument(skip_all, fields(variable = %request.variable.short_name()))]
pub async fn run_timeseries(
    service: &MeteoService,
    request: &TimeSeriesRequest,
    output: &OutputOptions,
) -> Result<PathBuf> {
    request.validate()?;
    let station = service.station(request.station.as_deref())?;
    let variable = request.variable;

    let mut chart = TimeSeriesChart::new(
        format!(
            "{} {} {} to {}",
            station.name,
            variable.label(),
            request.start.format("%Y-%m-%d %H:%M"),
            request.end.format("%Y-%m-%d %H:%M UTC")
        ),
        variable,
    );
    for source in request.sources.iter().copied().unique() {
        let mut table = service
            .load_source(source, station, request.start, request.end, &request.models)
            .await?;
        table
            .derive(variable)
            .with_context(|| format!("No usable {source} data"))?;
        let series = series_for_source(source, &station.abbreviation, &table, variable, request.altitude_m);
        debug!(source = source.tag(), points = series.points.len(), "series built");
        if series.value_range().is_none() {
            warn!(source = source.tag(), "no {} values, series skipped", variable.short_name());
        }
        chart.push(series);
    }

    if chart.is_empty() {
        return Err(MeteoError::no_data(format!(
            "no {} values between {} and {}",
            variable.label(),
            request.start,
            request.end
        ))
        .into());
    }

    let stem = plot::file_stem(&station.abbreviation, "timeseries", variable, request.start);
    let path = plot::render(&chart, &output.directory, &stem, output.format, output.size)?;
    if output.csv {
        export::export_series(&output.directory, &stem, chart.series())?;
    }
    Ok(path)
}
