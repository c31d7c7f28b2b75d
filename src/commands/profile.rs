//! Vertical profile command: overlay the profile of every source nearest to a time

use super::{MeteoService, ModelFiles, OutputOptions, Source, prepare_table};
use crate::MeteoError;
use crate::export;
use crate::models::{ProfileTable, Variable};
use crate::plot::{self, ProfileChart};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Default half-width of the search window around the requested time, in hours
pub const DEFAULT_WINDOW_HOURS: u32 = 6;

#[derive(Debug, Clone)]
pub struct ProfileRequest {
    /// Station query, default station when absent
    pub station: Option<String>,
    pub time: DateTime<Utc>,
    pub variable: Variable,
    pub sources: Vec<Source>,
    pub lower_altitude_m: Option<f64>,
    pub upper_altitude_m: Option<f64>,
    /// Profiles further than this from `time` are not considered
    pub window_hours: u32,
    pub models: ModelFiles,
}

impl ProfileRequest {
    fn validate(&self) -> Result<(), MeteoError> {
        if self.sources.is_empty() {
            return Err(MeteoError::validation("at least one source is required"));
        }
        if let Some(source) = self.sources.iter().find(|s| !s.is_profile()) {
            return Err(MeteoError::validation(format!("{source} data has no vertical profile")));
        }
        Ok(())
    }
}

/// Render the profile chart and return its path
#[instrument(skip_all, fields(variable = %request.variable.short_name(), time = %request.time))]
pub async fn run_profile(service: &MeteoService, request: &ProfileRequest, output: &OutputOptions) -> Result<PathBuf> {
    request.validate()?;
    let station = service.station(request.station.as_deref())?;
    let (lower, upper) = service.altitude_bounds(request.lower_altitude_m, request.upper_altitude_m);
    let window = Duration::hours(i64::from(request.window_hours));
    let (start, end) = (request.time - window, request.time + window);
    let variable = request.variable;

    let mut chart = ProfileChart::new(
        format!(
            "{} {} {}",
            station.name,
            variable.label(),
            request.time.format("%Y-%m-%d %H:%M UTC")
        ),
        variable,
    );
    let mut charted: Vec<(Source, ProfileTable)> = Vec::new();

    for source in request.sources.iter().copied().unique() {
        let table = service
            .load_source(source, station, start, end, &request.models)
            .await?;
        let table = prepare_table(table, variable, lower, upper)
            .with_context(|| format!("No usable {source} profile"))?;

        let Some(time) = table.nearest_time_with_data(request.time, variable) else {
            warn!(source = source.tag(), "no {} profile in window", variable.short_name());
            continue;
        };
        let points = table.profile_at(time, variable);
        info!(source = source.tag(), levels = points.len(), "profile at {}", time.format("%Y-%m-%d %H:%M"));
        chart.push(source.tag(), time, points);
        charted.push((source, table.slice_time(time, time)));
    }

    if chart.is_empty() {
        return Err(MeteoError::no_data(format!(
            "no {} profile within {} h of {}",
            variable.label(),
            request.window_hours,
            request.time
        ))
        .into());
    }

    let stem = plot::file_stem(&station.abbreviation, "profile", variable, request.time);
    let path = plot::render(&chart, &output.directory, &stem, output.format, output.size)?;
    if output.csv {
        for (source, table) in &charted {
            export::export_table(&output.directory, &format!("{stem}_{source}"), table, variable)?;
        }
    }
    Ok(path)
}
