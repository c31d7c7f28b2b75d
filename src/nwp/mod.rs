//! Numerical weather prediction model output (ICON, AROME)
//!
//! Model files are NetCDF. Reading them needs the `netcdf` feature and a
//! system libnetcdf; the grid lookup, time decoding and column assembly in
//! this module are pure and always available.

pub mod cf_time;
pub mod column;
pub mod grid;
#[cfg(feature = "netcdf")]
pub mod reader;

use crate::models::{ProfileTable, Station, Variable};
use crate::{MeteoError, derivation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use column::{FieldLayout, ModelColumn, Packing};
pub use grid::{GridMatch, GridPoints};
#[cfg(feature = "netcdf")]
pub use reader::ModelReader;

/// Standard gravity used to turn geopotential into height, in m s-2
const STANDARD_GRAVITY: f64 = 9.806_65;

/// Supported forecast models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Icon,
    Arome,
}

impl ModelKind {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            ModelKind::Icon => "icon",
            ModelKind::Arome => "arome",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Icon => "ICON",
            ModelKind::Arome => "AROME",
        }
    }

    #[must_use]
    pub fn latitude_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Icon => &["clat", "lat", "latitude"],
            ModelKind::Arome => &["latitude", "lat", "nav_lat"],
        }
    }

    #[must_use]
    pub fn longitude_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Icon => &["clon", "lon", "longitude"],
            ModelKind::Arome => &["longitude", "lon", "nav_lon"],
        }
    }

    /// Height variables, full levels first
    #[must_use]
    pub fn height_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Icon => &["z_mc", "HHL", "z_ifc"],
            ModelKind::Arome => &["geopotential_height", "z", "altitude"],
        }
    }

    #[must_use]
    pub fn time_names(self) -> &'static [&'static str] {
        &["time", "valid_time", "t"]
    }

    /// Candidate variable names of every field read from the file
    #[must_use]
    pub fn field_names(self) -> &'static [(Variable, &'static [&'static str])] {
        match self {
            ModelKind::Icon => &[
                (Variable::Temperature, &["temp", "T", "t"]),
                (Variable::Pressure, &["pres", "P", "p"]),
                (Variable::SpecificHumidity, &["qv", "QV", "q"]),
                (Variable::RelativeHumidity, &["rh", "RELHUM"]),
                (Variable::WindU, &["u", "U"]),
                (Variable::WindV, &["v", "V"]),
            ],
            ModelKind::Arome => &[
                (Variable::Temperature, &["t", "air_temperature", "ta"]),
                (Variable::Pressure, &["p", "pres", "air_pressure"]),
                (Variable::SpecificHumidity, &["q", "specific_humidity", "hus"]),
                (Variable::RelativeHumidity, &["r", "relative_humidity", "hur"]),
                (Variable::WindU, &["u", "eastward_wind", "ua"]),
                (Variable::WindV, &["v", "northward_wind", "va"]),
            ],
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelKind {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icon" => Ok(ModelKind::Icon),
            "arome" => Ok(ModelKind::Arome),
            other => Err(MeteoError::validation(format!("unknown model '{other}'"))),
        }
    }
}

/// Convert a raw model value into the unit of `variable`, judged by the
/// `units` attribute of the field.
#[must_use]
pub fn convert_units(variable: Variable, units: &str, value: f64) -> f64 {
    let units = units.trim();
    match variable {
        Variable::Temperature | Variable::DewPoint if units == "K" || units.eq_ignore_ascii_case("kelvin") => {
            derivation::kelvin_to_celsius(value)
        }
        Variable::Pressure if units == "Pa" => derivation::pascal_to_hectopascal(value),
        Variable::SpecificHumidity if is_mass_fraction(units) => derivation::kg_per_kg_to_g_per_kg(value),
        Variable::RelativeHumidity if units == "1" || units == "fraction" => value * 100.0,
        _ => value,
    }
}

fn is_mass_fraction(units: &str) -> bool {
    matches!(units, "kg kg-1" | "kg/kg" | "kg kg**-1" | "1" | "")
}

/// Convert a height field to metres, accepting geopotential in m2 s-2
#[must_use]
pub fn height_in_metres(units: &str, value: f64) -> f64 {
    match units.trim() {
        "m2 s-2" | "m**2 s**-2" | "m2/s2" => value / STANDARD_GRAVITY,
        "km" => value * 1000.0,
        _ => value,
    }
}

/// Average half-level heights (n+1 interfaces) to the n full levels between them
#[must_use]
pub fn full_level_heights(half_levels: &[f64]) -> Vec<f64> {
    half_levels
        .windows(2)
        .map(|pair| (pair[0] + pair[1]) / 2.0)
        .collect()
}

/// Read the vertical column nearest to `station` from a model file
#[cfg(feature = "netcdf")]
pub fn load_model_table(kind: ModelKind, path: &Path, station: &Station) -> Result<ProfileTable, MeteoError> {
    ModelReader::open(kind, path)?.read_column(station)
}

/// Read the vertical column nearest to `station` from a model file
#[cfg(not(feature = "netcdf"))]
pub fn load_model_table(kind: ModelKind, path: &Path, _station: &Station) -> Result<ProfileTable, MeteoError> {
    Err(MeteoError::config(format!(
        "cannot read {kind} file {}: built without the 'netcdf' feature",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Variable::Temperature, "K", 273.15, 0.0)]
    #[case(Variable::Temperature, "degC", 12.0, 12.0)]
    #[case(Variable::Pressure, "Pa", 85_000.0, 850.0)]
    #[case(Variable::Pressure, "hPa", 850.0, 850.0)]
    #[case(Variable::SpecificHumidity, "kg kg-1", 0.008, 8.0)]
    #[case(Variable::RelativeHumidity, "1", 0.5, 50.0)]
    #[case(Variable::WindU, "m s-1", 4.0, 4.0)]
    fn test_convert_units(#[case] variable: Variable, #[case] units: &str, #[case] raw: f64, #[case] expected: f64) {
        assert!((convert_units(variable, units, raw) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_height_in_metres() {
        assert!((height_in_metres("m2 s-2", 9_806.65) - 1000.0).abs() < 1e-9);
        assert_eq!(height_in_metres("m", 1500.0), 1500.0);
        assert_eq!(height_in_metres("km", 1.5), 1500.0);
    }

    #[test]
    fn test_full_level_heights() {
        assert_eq!(full_level_heights(&[3000.0, 2000.0, 1000.0, 500.0]), vec![2500.0, 1500.0, 750.0]);
        assert!(full_level_heights(&[500.0]).is_empty());
    }

    #[test]
    fn test_model_kind_from_str() {
        assert_eq!("ICON".parse::<ModelKind>().unwrap(), ModelKind::Icon);
        assert_eq!(" arome ".parse::<ModelKind>().unwrap(), ModelKind::Arome);
        assert!("cosmo".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_every_model_reads_wind_components() {
        for kind in [ModelKind::Icon, ModelKind::Arome] {
            let names = kind.field_names();
            assert!(names.iter().any(|(v, _)| *v == Variable::WindU));
            assert!(names.iter().any(|(v, _)| *v == Variable::WindV));
        }
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn test_model_files_need_netcdf_feature() {
        let station = Station::new("PAY", "Payerne", 46.8116, 6.9425, 491.0);
        let err = load_model_table(ModelKind::Icon, Path::new("icon.nc"), &station).unwrap_err();
        assert!(matches!(err, MeteoError::Config { .. }));
        assert!(err.to_string().contains("netcdf"));
    }
}
