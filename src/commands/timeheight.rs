//! Time-height heatmap command

use super::{MeteoService, ModelFiles, OutputOptions, Source, check_window, prepare_table};
use crate::MeteoError;
use crate::export;
use crate::models::Variable;
use crate::plot::{self, TimeHeightChart};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct TimeHeightRequest {
    pub station: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub variable: Variable,
    pub source: Source,
    pub lower_altitude_m: Option<f64>,
    pub upper_altitude_m: Option<f64>,
    pub models: ModelFiles,
}

impl TimeHeightRequest {
    fn validate(&self) -> Result<(), MeteoError> {
        check_window(self.start, self.end)?;
        match self.source {
            Source::Mwr | Source::Icon | Source::Arome => Ok(()),
            other => Err(MeteoError::validation(format!(
                "time-height charts need mwr, icon or arome data, not {other}"
            ))),
        }
    }
}

/// Render the heatmap and return its path
#[instrument(skip_all, fields(variable = %request.variable.short_name(), source = %request.source))]
pub async fn run_time_height(
    service: &MeteoService,
    request: &TimeHeightRequest,
    output: &OutputOptions,
) -> Result<PathBuf> {
    request.validate()?;
    let station = service.station(request.station.as_deref())?;
    let (lower, upper) = service.altitude_bounds(request.lower_altitude_m, request.upper_altitude_m);
    let variable = request.variable;

    let table = service
        .load_source(request.source, station, request.start, request.end, &request.models)
        .await?;
    let table = prepare_table(table, variable, lower, upper)
        .with_context(|| format!("No usable {} data", request.source))?;
    let grid = table.to_time_height(variable)?;
    info!(
        times = grid.times.len(),
        levels = grid.altitudes.len(),
        "time-height grid built"
    );

    let chart = TimeHeightChart::new(
        format!(
            "{} {} {} {} to {}",
            station.name,
            request.source.tag().to_uppercase(),
            variable.label(),
            request.start.format("%Y-%m-%d %H:%M"),
            request.end.format("%Y-%m-%d %H:%M UTC")
        ),
        grid,
    )?;

    let kind = format!("timeheight_{}", request.source);
    let stem = plot::file_stem(&station.abbreviation, &kind, variable, request.start);
    let path = plot::render(&chart, &output.directory, &stem, output.format, output.size)?;
    if output.csv {
        export::export_table(&output.directory, &stem, &table, variable)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(source: Source) -> TimeHeightRequest {
        TimeHeightRequest {
            station: None,
            start: Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap(),
            variable: Variable::RelativeHumidity,
            source,
            lower_altitude_m: None,
            upper_altitude_m: None,
            models: ModelFiles::default(),
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(request(Source::Mwr).validate().is_ok());
        assert!(request(Source::Arome).validate().is_ok());
        assert!(request(Source::Rs).validate().is_err());
        assert!(request(Source::Surface).validate().is_err());

        let mut inverted = request(Source::Mwr);
        std::mem::swap(&mut inverted.start, &mut inverted.end);
        assert!(matches!(inverted.validate(), Err(MeteoError::Validation { .. })));
    }
}
