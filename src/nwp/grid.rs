//! Nearest-neighbour lookup on model grids

use crate::MeteoError;
use haversine::{Location as HaversineLocation, Units, distance};

/// Horizontal grid of a model file
#[derive(Debug, Clone, PartialEq)]
pub enum GridPoints {
    /// Regular grid given by 1-D axes; cell index is `lat_index * n_lon + lon_index`
    Regular {
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    },
    /// One coordinate pair per cell (unstructured or curvilinear, flattened)
    Cells {
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    },
}

/// Result of a nearest-neighbour lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMatch {
    /// Flattened horizontal cell index
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance to the requested point
    pub distance_km: f64,
}

impl GridPoints {
    pub fn regular(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Result<Self, MeteoError> {
        if latitudes.is_empty() || longitudes.is_empty() {
            return Err(MeteoError::model("grid has no points"));
        }
        Ok(Self::Regular {
            latitudes,
            longitudes,
        })
    }

    /// Per-cell coordinates in degrees
    pub fn cells(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Result<Self, MeteoError> {
        if latitudes.len() != longitudes.len() {
            return Err(MeteoError::model(format!(
                "grid has {} latitudes but {} longitudes",
                latitudes.len(),
                longitudes.len()
            )));
        }
        if latitudes.is_empty() {
            return Err(MeteoError::model("grid has no points"));
        }
        Ok(Self::Cells {
            latitudes,
            longitudes,
        })
    }

    /// Per-cell coordinates in radians, as on the ICON native grid
    pub fn cells_from_radians(latitudes: &[f64], longitudes: &[f64]) -> Result<Self, MeteoError> {
        Self::cells(
            latitudes.iter().map(|v| v.to_degrees()).collect(),
            longitudes.iter().map(|v| v.to_degrees()).collect(),
        )
    }

    /// Number of horizontal cells
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            GridPoints::Regular {
                latitudes,
                longitudes,
            } => latitudes.len() * longitudes.len(),
            GridPoints::Cells { latitudes, .. } => latitudes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell nearest to the given position
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Result<GridMatch, MeteoError> {
        match self {
            GridPoints::Regular {
                latitudes,
                longitudes,
            } => {
                let lat_index = nearest_on_axis(latitudes, |v| (v - latitude).abs())
                    .ok_or_else(|| MeteoError::model("grid has no points"))?;
                let lon_index = nearest_on_axis(longitudes, |v| longitude_difference(v, longitude))
                    .ok_or_else(|| MeteoError::model("grid has no points"))?;
                let (lat, lon) = (latitudes[lat_index], longitudes[lon_index]);
                Ok(GridMatch {
                    index: lat_index * longitudes.len() + lon_index,
                    latitude: lat,
                    longitude: lon,
                    distance_km: great_circle_km(latitude, longitude, lat, lon),
                })
            }
            GridPoints::Cells {
                latitudes,
                longitudes,
            } => latitudes
                .iter()
                .zip(longitudes)
                .enumerate()
                .filter(|(_, (lat, lon))| lat.is_finite() && lon.is_finite())
                .map(|(index, (&lat, &lon))| GridMatch {
                    index,
                    latitude: lat,
                    longitude: lon,
                    distance_km: great_circle_km(latitude, longitude, lat, lon),
                })
                .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
                .ok_or_else(|| MeteoError::model("grid has no valid points")),
        }
    }
}

fn nearest_on_axis<F: Fn(f64) -> f64>(axis: &[f64], distance: F) -> Option<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .min_by(|(_, a), (_, b)| distance(**a).total_cmp(&distance(**b)))
        .map(|(i, _)| i)
}

/// Absolute longitude difference accounting for the dateline, in degrees
fn longitude_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn great_circle_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    distance(
        HaversineLocation {
            latitude: lat1,
            longitude: lon1,
        },
        HaversineLocation {
            latitude: lat2,
            longitude: lon2,
        },
        Units::Kilometers,
    )
}
