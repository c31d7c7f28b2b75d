//! Closed-form conversions between meteorological variables
//!
//! All functions are stateless. Inputs use the units of [`Variable`](crate::Variable):
//! °C, hPa, m/s, degrees and g/kg.

use metfor::{Celsius, HectoPascal, Kelvin, Quantity};

const ZERO_CELSIUS_IN_KELVIN: f64 = 273.15;

/// Convert temperature from Kelvin to Celsius
#[must_use]
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - ZERO_CELSIUS_IN_KELVIN
}

#[must_use]
pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + ZERO_CELSIUS_IN_KELVIN
}

#[must_use]
pub fn pascal_to_hectopascal(pascal: f64) -> f64 {
    pascal / 100.0
}

/// Specific humidity from kg/kg to g/kg
#[must_use]
pub fn kg_per_kg_to_g_per_kg(q: f64) -> f64 {
    q * 1000.0
}

/// Horizontal wind speed from its components
#[must_use]
pub fn wind_speed(u: f64, v: f64) -> f64 {
    u.hypot(v)
}

/// Meteorological wind direction (where the wind blows from), 0-360°.
///
/// Calm wind reports 0°.
#[must_use]
pub fn wind_direction(u: f64, v: f64) -> f64 {
    if u == 0.0 && v == 0.0 {
        return 0.0;
    }
    (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0)
}

/// Wind components from speed and meteorological direction
#[must_use]
pub fn wind_components(speed: f64, direction_deg: f64) -> (f64, f64) {
    let rad = direction_deg.to_radians();
    (-speed * rad.sin(), -speed * rad.cos())
}

/// Potential temperature in K
#[must_use]
pub fn potential_temperature(temperature_c: f64, pressure_hpa: f64) -> Option<f64> {
    if pressure_hpa <= 0.0 {
        return None;
    }
    let theta: Kelvin = metfor::potential_temperature(HectoPascal(pressure_hpa), Celsius(temperature_c));
    Some(theta.unpack())
}

/// Relative humidity in % from temperature and dew point
#[must_use]
pub fn relative_humidity(temperature_c: f64, dew_point_c: f64) -> Option<f64> {
    metfor::rh(Celsius(temperature_c), Celsius(dew_point_c)).map(|rh| (rh * 100.0).min(100.0))
}

/// Specific humidity in g/kg from dew point and pressure
#[must_use]
pub fn specific_humidity(dew_point_c: f64, pressure_hpa: f64) -> Option<f64> {
    metfor::specific_humidity(Celsius(dew_point_c), HectoPascal(pressure_hpa))
        .map(kg_per_kg_to_g_per_kg)
}

/// Dew point in °C from specific humidity (g/kg) and pressure
#[must_use]
pub fn dew_point_from_specific_humidity(q_g_per_kg: f64, pressure_hpa: f64) -> Option<f64> {
    let q = q_g_per_kg / 1000.0;
    if q <= 0.0 || q >= 1.0 {
        return None;
    }
    metfor::dew_point_from_p_and_specific_humidity(HectoPascal(pressure_hpa), q)
        .map(|dp: Celsius| dp.unpack())
}

/// Relative humidity in % from specific humidity (g/kg), temperature and pressure, capped at 100 %
#[must_use]
pub fn relative_humidity_from_specific(
    q_g_per_kg: f64,
    temperature_c: f64,
    pressure_hpa: f64,
) -> Option<f64> {
    let dew_point = dew_point_from_specific_humidity(q_g_per_kg, pressure_hpa)?;
    relative_humidity(temperature_c, dew_point.min(temperature_c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_unit_conversions() {
        assert_close(kelvin_to_celsius(273.15), 0.0, 1e-9);
        assert_close(celsius_to_kelvin(20.0), 293.15, 1e-9);
        assert_close(pascal_to_hectopascal(101_325.0), 1013.25, 1e-9);
        assert_close(kg_per_kg_to_g_per_kg(0.008), 8.0, 1e-9);
    }

    #[test]
    fn test_wind_speed() {
        assert_close(wind_speed(3.0, 4.0), 5.0, 1e-12);
        assert_close(wind_speed(-3.0, -4.0), 5.0, 1e-12);
    }

    #[rstest]
    #[case(0.0, -5.0, 0.0)] // from the north
    #[case(-5.0, 0.0, 90.0)] // from the east
    #[case(0.0, 5.0, 180.0)] // from the south
    #[case(5.0, 0.0, 270.0)] // from the west
    #[case(5.0, 5.0, 225.0)] // from the south-west
    fn test_wind_direction(#[case] u: f64, #[case] v: f64, #[case] expected: f64) {
        assert_close(wind_direction(u, v), expected, 1e-9);
    }

    #[test]
    fn test_calm_wind_direction() {
        assert_eq!(wind_direction(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_wind_components_invert_direction() {
        let (u, v) = wind_components(10.0, 225.0);
        assert_close(u, 7.0711, 1e-3);
        assert_close(v, 7.0711, 1e-3);
        assert_close(wind_direction(u, v), 225.0, 1e-9);
        assert_close(wind_speed(u, v), 10.0, 1e-9);
    }

    #[test]
    fn test_potential_temperature() {
        assert_close(potential_temperature(20.0, 1000.0).unwrap(), 293.15, 0.01);
        assert_close(potential_temperature(10.0, 850.0).unwrap(), 296.6, 0.3);
        assert!(potential_temperature(10.0, 0.0).is_none());
    }

    #[test]
    fn test_relative_humidity_saturated() {
        assert_close(relative_humidity(15.0, 15.0).unwrap(), 100.0, 0.01);
        let rh = relative_humidity(20.0, 10.0).unwrap();
        assert!(rh > 50.0 && rh < 55.0, "rh was {rh}");
    }

    #[test]
    fn test_specific_humidity() {
        assert_close(specific_humidity(10.0, 1000.0).unwrap(), 7.66, 0.2);
    }

    #[test]
    fn test_relative_humidity_from_specific_humidity() {
        let q = specific_humidity(10.0, 900.0).unwrap();
        let rh = relative_humidity_from_specific(q, 10.0, 900.0).unwrap();
        assert_close(rh, 100.0, 0.5);

        let dry = relative_humidity_from_specific(q, 20.0, 900.0).unwrap();
        assert!(dry < 60.0, "rh was {dry}");
        assert!(relative_humidity_from_specific(0.0, 20.0, 900.0).is_none());
    }
}
