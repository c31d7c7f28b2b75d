//! Station model and lookup table

use crate::MeteoError;
use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};

/// Measurement station
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// National abbreviation used by the data warehouse (e.g. `PAY`)
    pub abbreviation: String,
    /// WMO block and station number
    pub wmo_id: Option<String>,
    /// Human-readable name
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Station elevation in m above sea level
    pub altitude_m: f64,
}

impl Station {
    #[must_use]
    pub fn new(abbreviation: &str, name: &str, latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            abbreviation: abbreviation.to_string(),
            wmo_id: None,
            name: name.to_string(),
            latitude,
            longitude,
            altitude_m,
        }
    }

    #[must_use]
    pub fn with_wmo_id(mut self, wmo_id: &str) -> Self {
        self.wmo_id = Some(wmo_id.to_string());
        self
    }

    /// Format station position as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Great-circle distance to another point in km
    #[must_use]
    pub fn distance_km(&self, latitude: f64, longitude: f64) -> f64 {
        distance(
            HaversineLocation {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            HaversineLocation {
                latitude,
                longitude,
            },
            Units::Kilometers,
        )
    }

    fn matches(&self, query: &str) -> bool {
        self.abbreviation.eq_ignore_ascii_case(query)
            || self.name.eq_ignore_ascii_case(query)
            || self
                .wmo_id
                .as_deref()
                .is_some_and(|id| id == query || id.trim_start_matches('0') == query.trim_start_matches('0'))
    }
}

/// Stations known without any configuration
#[must_use]
pub fn builtin_stations() -> Vec<Station> {
    vec![
        Station::new("PAY", "Payerne", 46.8116, 6.9425, 491.0).with_wmo_id("06610"),
        Station::new("SMA", "Zürich-Fluntern", 47.3780, 8.5661, 556.0).with_wmo_id("06660"),
        Station::new("GVE", "Genève-Cointrin", 46.2479, 6.1278, 411.0).with_wmo_id("06700"),
        Station::new("OTL", "Locarno-Monti", 46.1725, 8.7875, 367.0).with_wmo_id("06762"),
        Station::new("JUN", "Jungfraujoch", 46.5475, 7.9853, 3571.0).with_wmo_id("06730"),
    ]
}

/// Station lookup over the built-in table plus configured extras
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    /// Registry with built-in stations; `extra` entries shadow built-ins of the same abbreviation
    #[must_use]
    pub fn new(extra: &[Station]) -> Self {
        let mut stations: Vec<Station> = extra.to_vec();
        for station in builtin_stations() {
            if !stations
                .iter()
                .any(|s| s.abbreviation.eq_ignore_ascii_case(&station.abbreviation))
            {
                stations.push(station);
            }
        }
        Self { stations }
    }

    /// Find a station by abbreviation, WMO id or name (case-insensitive)
    pub fn find(&self, query: &str) -> Result<&Station, MeteoError> {
        let query = query.trim();
        self.stations
            .iter()
            .find(|s| s.matches(query))
            .ok_or_else(|| MeteoError::UnknownStation(query.to_string()))
    }

    #[must_use]
    pub fn all(&self) -> &[Station] {
        &self.stations
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PAY")]
    #[case("pay")]
    #[case("Payerne")]
    #[case("06610")]
    #[case("6610")]
    fn test_find_payerne(#[case] query: &str) {
        let registry = StationRegistry::default();
        let station = registry.find(query).unwrap();
        assert_eq!(station.abbreviation, "PAY");
        assert_eq!(station.altitude_m, 491.0);
    }

    #[test]
    fn test_unknown_station() {
        let registry = StationRegistry::default();
        let err = registry.find("NOWHERE").unwrap_err();
        assert!(matches!(err, MeteoError::UnknownStation(ref s) if s == "NOWHERE"));
    }

    #[test]
    fn test_extra_station_shadows_builtin() {
        let custom = Station::new("PAY", "Payerne mast", 46.81, 6.94, 500.0);
        let registry = StationRegistry::new(&[custom]);
        assert_eq!(registry.find("PAY").unwrap().altitude_m, 500.0);
        assert_eq!(registry.all().len(), builtin_stations().len());
    }

    #[test]
    fn test_distance_km() {
        let registry = StationRegistry::default();
        let pay = registry.find("PAY").unwrap();
        let gve = registry.find("GVE").unwrap();
        let d = pay.distance_km(gve.latitude, gve.longitude);
        assert!(d > 80.0 && d < 100.0, "distance was {d}");
        assert!(pay.distance_km(pay.latitude, pay.longitude) < 1e-6);
    }
}
