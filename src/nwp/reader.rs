//! NetCDF access to ICON and AROME output

use super::cf_time::decode_times;
use super::column::{FieldLayout, ModelColumn, Packing};
use super::grid::{GridMatch, GridPoints};
use super::{ModelKind, convert_units, height_in_metres};
use crate::MeteoError;
use crate::models::{ProfileTable, Station, Variable};
use chrono::{DateTime, Utc};
use netcdf::AttributeValue;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Model grid cells farther than this from the station are suspicious, in km
const MAX_EXPECTED_DISTANCE_KM: f64 = 25.0;

/// Open model file with its horizontal grid
pub struct ModelReader {
    kind: ModelKind,
    path: PathBuf,
    file: netcdf::File,
    grid: GridPoints,
    spatial_dims: usize,
}

impl std::fmt::Debug for ModelReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelReader")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("cells", &self.grid.len())
            .finish_non_exhaustive()
    }
}

impl ModelReader {
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn open(kind: ModelKind, path: &Path) -> Result<Self, MeteoError> {
        let file = netcdf::open(path)
            .map_err(|e| MeteoError::model(format!("failed to open {}: {e}", path.display())))?;
        let (grid, spatial_dims) = read_grid(&file, kind)?;
        debug!(cells = grid.len(), "model grid loaded");
        Ok(Self {
            kind,
            path: path.to_path_buf(),
            file,
            grid,
            spatial_dims,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    #[must_use]
    pub fn grid(&self) -> &GridPoints {
        &self.grid
    }

    /// Vertical columns at the grid cell nearest to `station`, all time steps
    #[instrument(skip(self, station), fields(model = %self.kind, station = %station.abbreviation))]
    pub fn read_column(&self, station: &Station) -> Result<ProfileTable, MeteoError> {
        let start_time = Instant::now();
        let hit = self.grid.nearest(station.latitude, station.longitude)?;
        info!(
            "nearest {} cell {} at {:.4}, {:.4} ({:.1} km)",
            self.kind, hit.index, hit.latitude, hit.longitude, hit.distance_km
        );
        if hit.distance_km > MAX_EXPECTED_DISTANCE_KM {
            warn!(
                "{} grid cell is {:.1} km from {}, is the file covering the station?",
                self.kind, hit.distance_km, station.abbreviation
            );
        }

        let times = self.times()?;
        let heights = self.heights(&hit)?;
        let mut fields = Vec::new();
        for (variable, names) in self.kind.field_names() {
            let Some(var) = find_variable(&self.file, names) else {
                debug!(variable = variable.short_name(), "field not in file");
                continue;
            };
            let values = self.read_field(&var, &hit, *variable)?;
            fields.push((*variable, values));
        }
        if fields.is_empty() {
            return Err(MeteoError::no_data(format!(
                "{} has no known {} fields",
                self.path.display(),
                self.kind
            )));
        }

        let table = ModelColumn {
            times,
            heights,
            fields,
        }
        .into_table()?;

        let elapsed = start_time.elapsed();
        info!(rows = table.len(), "read model column in {:.3}s", elapsed.as_secs_f64());
        if elapsed.as_secs() > 10 {
            warn!("Slow model read detected: {:.3}s", elapsed.as_secs_f64());
        }
        Ok(table)
    }

    fn times(&self) -> Result<Vec<DateTime<Utc>>, MeteoError> {
        let var = find_variable(&self.file, self.kind.time_names())
            .ok_or_else(|| MeteoError::model(format!("{} has no time variable", self.path.display())))?;
        let units = attribute_string(&var, "units")
            .ok_or_else(|| MeteoError::model("time variable has no units"))?;
        let raw: Vec<f64> = read_values(&var)?;
        decode_times(&units, &raw)
    }

    fn heights(&self, hit: &GridMatch) -> Result<Vec<Vec<f64>>, MeteoError> {
        let var = find_variable(&self.file, self.kind.height_names())
            .ok_or_else(|| MeteoError::model(format!("{} has no height variable", self.path.display())))?;
        let units = attribute_string(&var, "units").unwrap_or_default();
        let columns = self.columns(&var, hit)?;
        Ok(columns
            .into_iter()
            .map(|levels| {
                levels
                    .into_iter()
                    .map(|h| h.map_or(f64::NAN, |h| height_in_metres(&units, h)))
                    .collect()
            })
            .collect())
    }

    fn read_field(
        &self,
        var: &netcdf::Variable<'_>,
        hit: &GridMatch,
        variable: Variable,
    ) -> Result<Vec<Vec<Option<f64>>>, MeteoError> {
        let units = attribute_string(var, "units").unwrap_or_default();
        debug!(variable = variable.short_name(), units = %units, "reading field {}", var.name());
        Ok(self
            .columns(var, hit)?
            .into_iter()
            .map(|levels| {
                levels
                    .into_iter()
                    .map(|v| v.map(|v| convert_units(variable, &units, v)))
                    .collect()
            })
            .collect())
    }

    /// Unpacked `[time][level]` values of `var` at the matched cell
    fn columns(&self, var: &netcdf::Variable<'_>, hit: &GridMatch) -> Result<Vec<Vec<Option<f64>>>, MeteoError> {
        let dimensions: Vec<(String, usize)> = var.dimensions().iter().map(|d| (d.name(), d.len())).collect();
        let layout = FieldLayout::from_dimensions(&dimensions, self.spatial_dims, self.grid.len())
            .map_err(|e| MeteoError::model(format!("{}: {e}", var.name())))?;
        let packing = packing(var);
        let raw = read_values(var)?;

        (0..layout.times)
            .map(|t| {
                layout
                    .extract_column(&raw, t, hit.index)
                    .map(|levels| levels.into_iter().map(|v| packing.unpack(v)).collect())
            })
            .collect()
    }
}

fn read_grid(file: &netcdf::File, kind: ModelKind) -> Result<(GridPoints, usize), MeteoError> {
    let lat_var = find_variable(file, kind.latitude_names())
        .ok_or_else(|| MeteoError::model(format!("no latitude variable for {kind}")))?;
    let lon_var = find_variable(file, kind.longitude_names())
        .ok_or_else(|| MeteoError::model(format!("no longitude variable for {kind}")))?;

    let latitudes = read_values(&lat_var)?;
    let longitudes = read_values(&lon_var)?;
    let in_radians = attribute_string(&lat_var, "units").is_some_and(|u| u.starts_with("radian"));

    let lat_dims: Vec<String> = lat_var.dimensions().iter().map(|d| d.name()).collect();
    let lon_dims: Vec<String> = lon_var.dimensions().iter().map(|d| d.name()).collect();

    match (lat_dims.len(), lon_dims.len()) {
        // Separate 1-D axes of a regular grid
        (1, 1) if lat_dims != lon_dims => Ok((GridPoints::regular(latitudes, longitudes)?, 2)),
        // One coordinate per cell on a shared dimension
        (1, 1) if in_radians => Ok((GridPoints::cells_from_radians(&latitudes, &longitudes)?, 1)),
        (1, 1) => Ok((GridPoints::cells(latitudes, longitudes)?, 1)),
        // Curvilinear 2-D coordinates, flattened
        (2, 2) => Ok((GridPoints::cells(latitudes, longitudes)?, 2)),
        (a, b) => Err(MeteoError::model(format!(
            "unsupported coordinate shapes: latitude {a}-D, longitude {b}-D"
        ))),
    }
}

fn find_variable<'f>(file: &'f netcdf::File, names: &[&str]) -> Option<netcdf::Variable<'f>> {
    names.iter().find_map(|name| file.variable(name))
}

fn read_values(var: &netcdf::Variable<'_>) -> Result<Vec<f64>, MeteoError> {
    var.get_values::<f64, _>(..)
        .map_err(|e| MeteoError::model(format!("failed to read '{}': {e}", var.name())))
}

fn packing(var: &netcdf::Variable<'_>) -> Packing {
    let defaults = Packing::default();
    Packing {
        scale_factor: attribute_f64(var, "scale_factor").unwrap_or(defaults.scale_factor),
        add_offset: attribute_f64(var, "add_offset").unwrap_or(defaults.add_offset),
        fill_value: attribute_f64(var, "_FillValue"),
        missing_value: attribute_f64(var, "missing_value"),
    }
}

fn attribute_f64(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            AttributeValue::Double(d) => Some(d),
            AttributeValue::Float(f) => Some(f64::from(f)),
            AttributeValue::Short(s) => Some(f64::from(s)),
            AttributeValue::Int(i) => Some(f64::from(i)),
            AttributeValue::Schar(b) => Some(f64::from(b)),
            _ => None,
        })
}

fn attribute_string(var: &netcdf::Variable<'_>, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}
