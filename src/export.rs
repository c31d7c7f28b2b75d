//! CSV export of the data behind a chart

use crate::MeteoError;
use crate::models::{ProfileTable, TimeSeries, Variable};
use chrono::{DateTime, Utc};
use csv::Writer;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Write `time,altitude,<variable>` rows of one table column
pub fn write_table<W: io::Write>(writer: W, table: &ProfileTable, variable: Variable) -> Result<(), MeteoError> {
    let mut w = Writer::from_writer(writer);
    w.write_record(["time", "altitude", variable.short_name()])
        .map_err(io::Error::from)?;
    for (time, altitude, value) in table.rows(variable) {
        w.write_record([format_time(time), format!("{altitude:.1}"), format_value(value)])
            .map_err(io::Error::from)?;
    }
    w.flush()?;
    Ok(())
}

/// Write `time,source,<variable>` rows of every series
pub fn write_series<W: io::Write>(writer: W, series: &[TimeSeries]) -> Result<(), MeteoError> {
    let Some(variable) = series.first().map(|s| s.variable) else {
        return Err(MeteoError::no_data("no series to export"));
    };
    let mut w = Writer::from_writer(writer);
    w.write_record(["time", "source", variable.short_name()])
        .map_err(io::Error::from)?;
    for s in series {
        for (time, value) in &s.points {
            w.write_record([format_time(*time), s.label.clone(), format_value(*value)])
                .map_err(io::Error::from)?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Export a table column to `<dir>/<file_stem>.csv`
pub fn export_table(dir: &Path, file_stem: &str, table: &ProfileTable, variable: Variable) -> Result<PathBuf, MeteoError> {
    let path = csv_path(dir, file_stem)?;
    write_table(std::fs::File::create(&path)?, table, variable)?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Export series to `<dir>/<file_stem>.csv`
pub fn export_series(dir: &Path, file_stem: &str, series: &[TimeSeries]) -> Result<PathBuf, MeteoError> {
    let path = csv_path(dir, file_stem)?;
    write_series(std::fs::File::create(&path)?, series)?;
    info!("wrote {}", path.display());
    Ok(path)
}

fn csv_path(dir: &Path, file_stem: &str) -> Result<PathBuf, MeteoError> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.join(format!("{file_stem}.csv")))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}
