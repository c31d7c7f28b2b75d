//! Assembly of a model column into a [`ProfileTable`]
//!
//! Fields arrive as flat arrays in C order with the horizontal dimensions
//! last. [`FieldLayout`] works out the time/level/cell strides from the
//! dimension list, [`Packing`] undoes CF packing, and [`ModelColumn`]
//! turns the extracted per-time columns into table rows.

use super::full_level_heights;
use crate::MeteoError;
use crate::models::{ProfileTable, Variable};
use chrono::{DateTime, Utc};
use tracing::warn;

/// Strides of a field over (time, level, horizontal cell)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub times: usize,
    pub levels: usize,
    pub cells: usize,
}

impl FieldLayout {
    /// Derive the layout from `(name, length)` dimensions.
    ///
    /// The last `spatial_dims` dimensions must span `grid_len` cells. Of the
    /// leading dimensions, one whose name mentions time is the time axis and
    /// at most one other non-singleton dimension is the vertical axis.
    pub fn from_dimensions(
        dimensions: &[(String, usize)],
        spatial_dims: usize,
        grid_len: usize,
    ) -> Result<Self, MeteoError> {
        if dimensions.len() < spatial_dims {
            return Err(MeteoError::model(format!(
                "field has {} dimensions, grid needs {spatial_dims}",
                dimensions.len()
            )));
        }
        let (leading, spatial) = dimensions.split_at(dimensions.len() - spatial_dims);
        let cells: usize = spatial.iter().map(|(_, len)| *len).product();
        if cells != grid_len {
            return Err(MeteoError::model(format!(
                "field spans {cells} horizontal cells, grid has {grid_len}"
            )));
        }

        let mut times = 1;
        let mut levels = 1;
        let mut seen_level = false;
        for (position, (name, len)) in leading.iter().enumerate() {
            if name.to_ascii_lowercase().contains("time") {
                if position != 0 {
                    return Err(MeteoError::model(format!("time dimension '{name}' is not the first")));
                }
                times = *len;
            } else if *len > 1 {
                if seen_level {
                    return Err(MeteoError::model(format!(
                        "field has more than one vertical dimension ('{name}')"
                    )));
                }
                seen_level = true;
                levels = *len;
            }
        }

        Ok(Self { times, levels, cells })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times * self.levels * self.cells
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of every level at one time step and cell
    pub fn extract_column(&self, values: &[f64], time: usize, cell: usize) -> Result<Vec<f64>, MeteoError> {
        if values.len() != self.len() {
            return Err(MeteoError::model(format!(
                "field has {} values, layout expects {}",
                values.len(),
                self.len()
            )));
        }
        if time >= self.times || cell >= self.cells {
            return Err(MeteoError::model(format!(
                "index (time {time}, cell {cell}) outside field of {} times and {} cells",
                self.times, self.cells
            )));
        }
        let base = time * self.levels * self.cells;
        Ok((0..self.levels)
            .map(|level| values[base + level * self.cells + cell])
            .collect())
    }
}

/// CF packing attributes of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
            missing_value: None,
        }
    }
}

impl Packing {
    /// Unpack a raw value, `None` for fill and missing markers
    #[must_use]
    pub fn unpack(&self, raw: f64) -> Option<f64> {
        if !raw.is_finite() || self.fill_value == Some(raw) || self.missing_value == Some(raw) {
            return None;
        }
        Some(raw * self.scale_factor + self.add_offset)
    }
}

/// Vertical columns of one grid cell over time
#[derive(Debug, Clone, Default)]
pub struct ModelColumn {
    pub times: Vec<DateTime<Utc>>,
    /// `heights[time][level]` in m; a single row applies to every time step
    pub heights: Vec<Vec<f64>>,
    /// `values[time][level]` per field; a single row applies to every time step
    pub fields: Vec<(Variable, Vec<Vec<Option<f64>>>)>,
}

impl ModelColumn {
    /// One table row per (time, level) with a valid height
    pub fn into_table(self) -> Result<ProfileTable, MeteoError> {
        if self.times.is_empty() {
            return Err(MeteoError::no_data("model file has no time steps"));
        }
        if self.heights.is_empty() {
            return Err(MeteoError::no_data("model file has no level heights"));
        }

        let mut table = ProfileTable::new();
        let mut row = Vec::with_capacity(self.fields.len());
        for (t, time) in self.times.iter().enumerate() {
            let raw_heights = pick(&self.heights, t)
                .ok_or_else(|| MeteoError::model(format!("no heights for time step {t}")))?;

            let level_count = self
                .fields
                .iter()
                .filter_map(|(_, values)| pick(values, t).map(Vec::len))
                .max()
                .unwrap_or(raw_heights.len());
            let heights = if raw_heights.len() == level_count + 1 {
                full_level_heights(raw_heights)
            } else {
                raw_heights.clone()
            };
            if t == 0 {
                for (variable, values) in &self.fields {
                    if let Some(levels) = pick(values, t).filter(|l| l.len() != heights.len()) {
                        warn!(
                            variable = variable.short_name(),
                            "field has {} levels but heights have {}, skipping",
                            levels.len(),
                            heights.len()
                        );
                    }
                }
            }

            for (level, height) in heights.iter().enumerate() {
                if !height.is_finite() {
                    continue;
                }
                row.clear();
                for (variable, values) in &self.fields {
                    let value = pick(values, t)
                        .filter(|levels| levels.len() == heights.len())
                        .and_then(|levels| levels[level]);
                    row.push((*variable, value));
                }
                table.push_row(*time, *height, &row);
            }
        }

        if table.is_empty() {
            return Err(MeteoError::no_data("model column has no valid levels"));
        }
        Ok(table)
    }
}

fn pick<T>(rows: &[T], time: usize) -> Option<&T> {
    if rows.len() == 1 { rows.first() } else { rows.get(time) }
}
