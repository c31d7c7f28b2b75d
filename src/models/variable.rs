//! Meteorological variables and the data products that carry them

use crate::MeteoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data product requested from the data warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataProduct {
    /// Balloon radiosounding profiles
    Radiosounding,
    /// Microwave radiometer time-height profiles
    Radiometer,
    /// Surface station measurements
    Surface,
}

impl DataProduct {
    /// Product selector passed to the retrieval command
    #[must_use]
    pub fn selector(self) -> &'static str {
        match self {
            DataProduct::Radiosounding => "profile_rs",
            DataProduct::Radiometer => "profile_mwr",
            DataProduct::Surface => "surface",
        }
    }

    /// Short tag used in file names and chart legends
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            DataProduct::Radiosounding => "rs",
            DataProduct::Radiometer => "mwr",
            DataProduct::Surface => "surface",
        }
    }
}

/// Meteorological variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variable {
    /// Air temperature in °C
    Temperature,
    /// Dew point temperature in °C
    DewPoint,
    /// Relative humidity in %
    RelativeHumidity,
    /// Specific humidity in g/kg
    SpecificHumidity,
    /// Potential temperature in K
    PotentialTemperature,
    /// Pressure in hPa
    Pressure,
    /// Horizontal wind speed in m/s
    WindSpeed,
    /// Wind direction in degrees, direction the wind blows from
    WindDirection,
    /// Eastward wind component in m/s
    WindU,
    /// Northward wind component in m/s
    WindV,
}

impl Variable {
    pub const ALL: [Variable; 10] = [
        Variable::Temperature,
        Variable::DewPoint,
        Variable::RelativeHumidity,
        Variable::SpecificHumidity,
        Variable::PotentialTemperature,
        Variable::Pressure,
        Variable::WindSpeed,
        Variable::WindDirection,
        Variable::WindU,
        Variable::WindV,
    ];

    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Variable::Temperature => "temperature",
            Variable::DewPoint => "dewpoint",
            Variable::RelativeHumidity => "rh",
            Variable::SpecificHumidity => "qv",
            Variable::PotentialTemperature => "theta",
            Variable::Pressure => "pressure",
            Variable::WindSpeed => "wind_speed",
            Variable::WindDirection => "wind_dir",
            Variable::WindU => "u",
            Variable::WindV => "v",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Variable::Temperature => "Temperature",
            Variable::DewPoint => "Dew point",
            Variable::RelativeHumidity => "Relative humidity",
            Variable::SpecificHumidity => "Specific humidity",
            Variable::PotentialTemperature => "Potential temperature",
            Variable::Pressure => "Pressure",
            Variable::WindSpeed => "Wind speed",
            Variable::WindDirection => "Wind direction",
            Variable::WindU => "Eastward wind",
            Variable::WindV => "Northward wind",
        }
    }

    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Variable::Temperature | Variable::DewPoint => "°C",
            Variable::RelativeHumidity => "%",
            Variable::SpecificHumidity => "g/kg",
            Variable::PotentialTemperature => "K",
            Variable::Pressure => "hPa",
            Variable::WindSpeed | Variable::WindU | Variable::WindV => "m/s",
            Variable::WindDirection => "°",
        }
    }

    /// Axis caption, e.g. `Temperature [°C]`
    #[must_use]
    pub fn axis_label(self) -> String {
        format!("{} [{}]", self.label(), self.unit())
    }

    /// Parameter code the data warehouse uses for this variable in a product
    #[must_use]
    pub fn dwh_parameter(self, product: DataProduct) -> Option<&'static str> {
        DWH_PARAMETERS
            .iter()
            .find(|(p, v, _)| *p == product && *v == self)
            .map(|(_, _, code)| *code)
    }

    /// Reverse lookup of [`Variable::dwh_parameter`]
    #[must_use]
    pub fn from_dwh_parameter(product: DataProduct, code: &str) -> Option<Self> {
        DWH_PARAMETERS
            .iter()
            .find(|(p, _, c)| *p == product && c.eq_ignore_ascii_case(code))
            .map(|(_, v, _)| *v)
    }

    /// Variables measured directly by a product
    #[must_use]
    pub fn measured_by(product: DataProduct) -> Vec<Self> {
        DWH_PARAMETERS
            .iter()
            .filter(|(p, _, _)| *p == product)
            .map(|(_, v, _)| *v)
            .collect()
    }
}

const DWH_PARAMETERS: &[(DataProduct, Variable, &str)] = &[
    (DataProduct::Radiosounding, Variable::Pressure, "744"),
    (DataProduct::Radiosounding, Variable::Temperature, "745"),
    (DataProduct::Radiosounding, Variable::RelativeHumidity, "746"),
    (DataProduct::Radiosounding, Variable::DewPoint, "747"),
    (DataProduct::Radiosounding, Variable::WindDirection, "743"),
    (DataProduct::Radiosounding, Variable::WindSpeed, "748"),
    (DataProduct::Radiometer, Variable::Temperature, "3147"),
    (DataProduct::Radiometer, Variable::RelativeHumidity, "3148"),
    (DataProduct::Surface, Variable::Temperature, "tre200s0"),
    (DataProduct::Surface, Variable::DewPoint, "tde200s0"),
    (DataProduct::Surface, Variable::RelativeHumidity, "ure200s0"),
    (DataProduct::Surface, Variable::Pressure, "prestas0"),
    (DataProduct::Surface, Variable::WindSpeed, "fkl010z0"),
    (DataProduct::Surface, Variable::WindDirection, "dkl010z0"),
];

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Variable {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" | "t" => Ok(Variable::Temperature),
            "dewpoint" | "dew_point" | "td" => Ok(Variable::DewPoint),
            "rh" | "relative_humidity" => Ok(Variable::RelativeHumidity),
            "qv" | "sh" | "specific_humidity" => Ok(Variable::SpecificHumidity),
            "theta" | "potential_temperature" => Ok(Variable::PotentialTemperature),
            "pressure" | "pres" | "p" => Ok(Variable::Pressure),
            "wind_speed" | "windspeed" | "ff" => Ok(Variable::WindSpeed),
            "wind_dir" | "wind_direction" | "dd" => Ok(Variable::WindDirection),
            "u" => Ok(Variable::WindU),
            "v" => Ok(Variable::WindV),
            _ => Err(MeteoError::UnknownVariable(s.to_string())),
        }
    }
}
