//! Decoding of CF-convention time coordinates

use crate::MeteoError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const REFERENCE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Decode raw time values according to the `units` attribute.
///
/// Supports `"<unit> since <reference>"` and the absolute `"day as %Y%m%d.%f"`.
pub fn decode_times(units: &str, values: &[f64]) -> Result<Vec<DateTime<Utc>>, MeteoError> {
    let units = units.trim();
    if units.starts_with("day as %Y%m%d") {
        return values.iter().map(|v| decode_absolute_day(*v)).collect();
    }

    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| MeteoError::model(format!("unsupported time units '{units}'")))?;
    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "h" => 3_600.0,
        "days" | "day" | "d" => 86_400.0,
        other => {
            return Err(MeteoError::model(format!("unsupported time unit '{other}'")));
        }
    };
    let reference = parse_reference(reference)?;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                return Err(MeteoError::model("non-finite time value"));
            }
            offset_from(reference, v * seconds_per_unit * 1000.0)
                .ok_or_else(|| MeteoError::model(format!("time value {v} is out of range")))
        })
        .collect()
}

/// `reference` shifted by `millis` milliseconds, `None` when outside the representable range
fn offset_from(reference: DateTime<Utc>, millis: f64) -> Option<DateTime<Utc>> {
    let millis = millis.round();
    if !(i64::MIN as f64..i64::MAX as f64).contains(&millis) {
        return None;
    }
    reference.checked_add_signed(Duration::try_milliseconds(millis as i64)?)
}

fn parse_reference(reference: &str) -> Result<DateTime<Utc>, MeteoError> {
    let cleaned = reference
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim()
        .replace('T', " ");

    REFERENCE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&cleaned, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MeteoError::model(format!("invalid time reference '{reference}'")))
}

fn decode_absolute_day(value: f64) -> Result<DateTime<Utc>, MeteoError> {
    if !value.is_finite() || value < 0.0 {
        return Err(MeteoError::model(format!("invalid absolute time {value}")));
    }
    let invalid = || MeteoError::model(format!("invalid absolute time {value}"));
    let day = value.trunc() as i64;
    let fraction = value - value.trunc();
    let (year, month, dom) = (day / 10_000, (day / 100) % 100, day % 100);
    let year = i32::try_from(year).map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, month as u32, dom as u32).ok_or_else(invalid)?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc();
    offset_from(midnight, fraction * 86_400_000.0).ok_or_else(invalid)
}
