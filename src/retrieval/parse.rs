//! Parser for the pipe-delimited retrieval output
//!
//! ```text
//! # optional metadata lines
//! station|termin|level|745|746
//! PAY|20240701120000|491|24.3|55
//! PAY|20240701120000|1000|19.8|-9999
//! ```

use crate::models::{DataProduct, ProfileTable, Variable};
use crate::MeteoError;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

const TIME_COLUMN: &str = "termin";
const LEVEL_COLUMN: &str = "level";
const STATION_COLUMN: &str = "station";

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y%m%d%H%M%S", "%Y%m%d%H%M", "%Y-%m-%d %H:%M:%S"];
const MISSING_MARKERS: [&str; 2] = ["", "-"];
const MISSING_SENTINELS: [f64; 3] = [-9999.0, -99999.0, 1e7];

enum Column {
    Time,
    Level,
    Ignored,
    Value(Variable),
}

/// Parse retrieval output into a table.
///
/// Rows without a `level` column are placed at `station_altitude`.
pub fn parse_pipe_table(
    text: &str,
    product: DataProduct,
    station_altitude: f64,
) -> Result<ProfileTable, MeteoError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let Some((header_line, header)) = lines.next() else {
        return Err(MeteoError::no_data("retrieval returned no output"));
    };
    let columns = parse_header(header, header_line, product)?;

    let mut table = ProfileTable::new();
    let mut values = Vec::with_capacity(columns.len());
    for (line_number, line) in lines {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() != columns.len() {
            return Err(MeteoError::parse(
                line_number,
                format!("expected {} fields, found {}", columns.len(), fields.len()),
            ));
        }

        let mut time = None;
        let mut altitude = None;
        values.clear();
        for (column, field) in columns.iter().zip(&fields) {
            match column {
                Column::Time => time = Some(parse_timestamp(field, line_number)?),
                Column::Level => altitude = parse_value(field, line_number)?,
                Column::Ignored => {}
                Column::Value(variable) => values.push((*variable, parse_value(field, line_number)?)),
            }
        }

        // Header validation guarantees a time column
        let Some(time) = time else { continue };
        let altitude = match altitude {
            Some(a) => a,
            None if has_level(&columns) => {
                warn!(line = line_number, "dropping row with missing level");
                continue;
            }
            None => station_altitude,
        };
        table.push_row(time, altitude, &values);
    }

    if table.is_empty() {
        return Err(MeteoError::no_data(format!(
            "no {} rows in retrieval output",
            product.tag()
        )));
    }
    debug!(rows = table.len(), product = product.tag(), "parsed retrieval output");
    Ok(table)
}

fn has_level(columns: &[Column]) -> bool {
    columns.iter().any(|c| matches!(c, Column::Level))
}

fn parse_header(header: &str, line_number: usize, product: DataProduct) -> Result<Vec<Column>, MeteoError> {
    let columns: Vec<Column> = header
        .split('|')
        .map(|name| {
            let name = name.trim();
            if name.eq_ignore_ascii_case(TIME_COLUMN) {
                Column::Time
            } else if name.eq_ignore_ascii_case(LEVEL_COLUMN) {
                Column::Level
            } else if name.eq_ignore_ascii_case(STATION_COLUMN) {
                Column::Ignored
            } else if let Some(variable) = Variable::from_dwh_parameter(product, name) {
                Column::Value(variable)
            } else {
                debug!(parameter = name, "ignoring unknown parameter column");
                Column::Ignored
            }
        })
        .collect();

    let mut seen = Vec::new();
    for column in &columns {
        if let Column::Value(variable) = column {
            if seen.contains(variable) {
                return Err(MeteoError::parse(
                    line_number,
                    format!("parameter for {} appears more than once", variable.label()),
                ));
            }
            seen.push(*variable);
        }
    }

    if !columns.iter().any(|c| matches!(c, Column::Time)) {
        return Err(MeteoError::parse(
            line_number,
            format!("header has no '{TIME_COLUMN}' column"),
        ));
    }
    Ok(columns)
}

/// Parse a UTC timestamp in any of the accepted formats
pub fn parse_timestamp(field: &str, line_number: usize) -> Result<DateTime<Utc>, MeteoError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(field, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MeteoError::parse(line_number, format!("invalid timestamp '{field}'")))
}

/// Parse a numeric field; sentinel values and blanks are missing
pub fn parse_value(field: &str, line_number: usize) -> Result<Option<f64>, MeteoError> {
    if MISSING_MARKERS.contains(&field) {
        return Ok(None);
    }
    let value: f64 = field
        .parse()
        .map_err(|_| MeteoError::parse(line_number, format!("invalid number '{field}'")))?;
    if !value.is_finite() || MISSING_SENTINELS.contains(&value) {
        return Ok(None);
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    const SOUNDING: &str = "\
# dwh_retrieve profile_rs PAY
station|termin|level|744|745|747|748|743
PAY|20240701120000|491|955.2|24.3|12.1|2.0|230
PAY|20240701120000|1000|899.0|19.8|-9999|5.5|245

PAY|20240701120000|1500|850.4|15.1|8.0||250
";

    #[test]
    fn test_parse_sounding() {
        let table = parse_pipe_table(SOUNDING, DataProduct::Radiosounding, 491.0).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.altitudes(), vec![491.0, 1000.0, 1500.0]);
        assert_eq!(
            table.column(Variable::Temperature).unwrap(),
            &[Some(24.3), Some(19.8), Some(15.1)]
        );
        assert_eq!(
            table.column(Variable::DewPoint).unwrap(),
            &[Some(12.1), None, Some(8.0)]
        );
        assert_eq!(table.column(Variable::WindSpeed).unwrap()[2], None);
        assert_eq!(
            table.times(),
            vec![Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()]
        );
    }

    #[test]
    fn test_surface_rows_use_station_altitude() {
        let text = "STATION|TERMIN|tre200s0|ure200s0\nPAY|202407011200|21.5|60\nPAY|202407011210|21.7|59\n";
        let table = parse_pipe_table(text, DataProduct::Surface, 491.0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.altitudes(), vec![491.0]);
        assert_eq!(
            table.column(Variable::RelativeHumidity).unwrap(),
            &[Some(60.0), Some(59.0)]
        );
    }

    #[test]
    fn test_unknown_parameters_are_ignored() {
        let text = "termin|tre200s0|xyz123\n20240701120000|21.5|7\n";
        let table = parse_pipe_table(text, DataProduct::Surface, 491.0).unwrap();
        assert_eq!(table.variables().collect::<Vec<_>>(), vec![Variable::Temperature]);
    }

    #[test]
    fn test_rows_with_missing_level_are_dropped() {
        let text = "termin|level|3147\n20240701120000|-9999|12.0\n20240701120000|600|11.0\n";
        let table = parse_pipe_table(text, DataProduct::Radiometer, 491.0).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_field_count_mismatch() {
        let text = "termin|tre200s0\n20240701120000|21.5|3\n";
        let err = parse_pipe_table(text, DataProduct::Surface, 491.0).unwrap_err();
        assert!(matches!(err, MeteoError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_parameter_column() {
        let text = "termin|level|745|745\n20240701120000|1000|10|11\n20240701120000|2000|20|21\n";
        let err = parse_pipe_table(text, DataProduct::Radiosounding, 491.0).unwrap_err();
        assert!(matches!(err, MeteoError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_missing_time_column() {
        let text = "# meta\nstation|tre200s0\nPAY|21.5\n";
        let err = parse_pipe_table(text, DataProduct::Surface, 491.0).unwrap_err();
        assert!(matches!(err, MeteoError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_output_is_no_data() {
        let header_only = "termin|tre200s0\n";
        assert!(matches!(
            parse_pipe_table(header_only, DataProduct::Surface, 491.0),
            Err(MeteoError::NoData { .. })
        ));
        assert!(matches!(
            parse_pipe_table("  \n# nothing\n", DataProduct::Surface, 491.0),
            Err(MeteoError::NoData { .. })
        ));
    }

    #[rstest]
    #[case("20240701120000")]
    #[case("202407011200")]
    #[case("2024-07-01 12:00:00")]
    fn test_timestamp_formats(#[case] field: &str) {
        assert_eq!(
            parse_timestamp(field, 1).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        assert!(matches!(
            parse_timestamp("yesterday", 4),
            Err(MeteoError::Parse { line: 4, .. })
        ));
    }

    #[rstest]
    #[case("", None)]
    #[case("-", None)]
    #[case("-9999", None)]
    #[case("-99999.0", None)]
    #[case("10000000", None)]
    #[case("1e7", None)]
    #[case("NaN", None)]
    #[case("12.5", Some(12.5))]
    #[case("-3", Some(-3.0))]
    fn test_parse_value(#[case] field: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_value(field, 1).unwrap(), expected);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        assert!(parse_value("12,5", 9).is_err());
    }
}
