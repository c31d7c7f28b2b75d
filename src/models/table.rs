//! Tabular profile data and its reshaped views
//!
//! [`ProfileTable`] is a small column store: one row per (time, altitude)
//! observation and one optional value per variable. Every source, whether
//! retrieval output or a model column, ends up in this shape before slicing,
//! derivation and charting.

use crate::derivation;
use crate::models::Variable;
use crate::MeteoError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Altitudes closer than this are treated as the same level, in m
const LEVEL_TOLERANCE_M: f64 = 1e-3;

/// Row-aligned observations indexed by time and altitude
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileTable {
    times: Vec<DateTime<Utc>>,
    altitudes: Vec<f64>,
    columns: BTreeMap<Variable, Vec<Option<f64>>>,
}

impl ProfileTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation row; variables not given are missing in this row
    pub fn push_row(&mut self, time: DateTime<Utc>, altitude: f64, values: &[(Variable, Option<f64>)]) {
        let row = self.times.len();
        self.times.push(time);
        self.altitudes.push(altitude);

        for (variable, value) in values {
            let column = self
                .columns
                .entry(*variable)
                .or_insert_with(|| vec![None; row]);
            let value = value.filter(|v| v.is_finite());
            // A variable given twice in one row keeps its last value
            if column.len() > row {
                column[row] = value;
            } else {
                column.push(value);
            }
        }
        for column in self.columns.values_mut() {
            if column.len() == row {
                column.push(None);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn has(&self, variable: Variable) -> bool {
        self.columns.contains_key(&variable)
    }

    /// Variables with a column in this table
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.columns.keys().copied()
    }

    #[must_use]
    pub fn column(&self, variable: Variable) -> Option<&[Option<f64>]> {
        self.columns.get(&variable).map(Vec::as_slice)
    }

    /// `(time, altitude, value)` for every row of one variable
    pub fn rows(&self, variable: Variable) -> impl Iterator<Item = (DateTime<Utc>, f64, Option<f64>)> + '_ {
        let column = self.columns.get(&variable);
        self.times
            .iter()
            .zip(&self.altitudes)
            .enumerate()
            .map(move |(i, (t, a))| (*t, *a, column.and_then(|c| c[i])))
    }

    fn retain_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(DateTime<Utc>, f64) -> bool,
    {
        let selected: Vec<usize> = (0..self.len())
            .filter(|&i| keep(self.times[i], self.altitudes[i]))
            .collect();

        Self {
            times: selected.iter().map(|&i| self.times[i]).collect(),
            altitudes: selected.iter().map(|&i| self.altitudes[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(v, c)| (*v, selected.iter().map(|&i| c[i]).collect()))
                .collect(),
        }
    }

    /// Keep rows with `lower <= altitude <= upper`; either bound may be open
    pub fn slice_altitude(&self, lower: Option<f64>, upper: Option<f64>) -> Result<Self, MeteoError> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo > hi {
                return Err(MeteoError::validation(format!(
                    "lower altitude {lo} m is above upper altitude {hi} m"
                )));
            }
        }
        let lo = lower.unwrap_or(f64::NEG_INFINITY);
        let hi = upper.unwrap_or(f64::INFINITY);
        Ok(self.retain_rows(|_, altitude| altitude >= lo && altitude <= hi))
    }

    /// Keep rows with `start <= time <= end`
    #[must_use]
    pub fn slice_time(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.retain_rows(|time, _| time >= start && time <= end)
    }

    /// Unique timestamps, sorted
    #[must_use]
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        let mut times = self.times.clone();
        times.sort_unstable();
        times.dedup();
        times
    }

    /// Unique altitudes, sorted
    #[must_use]
    pub fn altitudes(&self) -> Vec<f64> {
        let mut altitudes: Vec<f64> = self.altitudes.clone();
        altitudes.sort_by(f64::total_cmp);
        altitudes.dedup_by(|a, b| (*a - *b).abs() < LEVEL_TOLERANCE_M);
        altitudes
    }

    /// Timestamp in the table closest to `target`
    #[must_use]
    pub fn nearest_time(&self, target: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.times
            .iter()
            .copied()
            .min_by_key(|t| (*t - target).num_seconds().unsigned_abs())
    }

    /// Timestamp closest to `target` with at least one present `variable` value
    #[must_use]
    pub fn nearest_time_with_data(&self, target: DateTime<Utc>, variable: Variable) -> Option<DateTime<Utc>> {
        self.rows(variable)
            .filter(|(_, _, value)| value.is_some())
            .map(|(time, _, _)| time)
            .min_by_key(|t| (*t - target).num_seconds().unsigned_abs())
    }

    /// Vertical profile at one timestamp as `(altitude, value)` sorted by altitude
    #[must_use]
    pub fn profile_at(&self, time: DateTime<Utc>, variable: Variable) -> Vec<(f64, f64)> {
        let mut profile: Vec<(f64, f64)> = self
            .rows(variable)
            .filter(|(t, _, _)| *t == time)
            .filter_map(|(_, a, v)| v.map(|v| (a, v)))
            .collect();
        profile.sort_by(|a, b| a.0.total_cmp(&b.0));
        profile
    }

    /// For each timestamp, the value on the level nearest to `altitude`
    #[must_use]
    pub fn series_at_altitude(&self, altitude: f64, variable: Variable) -> Vec<(DateTime<Utc>, Option<f64>)> {
        let mut nearest: BTreeMap<DateTime<Utc>, (f64, Option<f64>)> = BTreeMap::new();
        for (time, level, value) in self.rows(variable) {
            let distance = (level - altitude).abs();
            match nearest.get(&time) {
                Some((best, _)) if *best <= distance => {}
                _ => {
                    nearest.insert(time, (distance, value));
                }
            }
        }
        nearest.into_iter().map(|(t, (_, v))| (t, v)).collect()
    }

    /// Pivot one variable into a time × altitude grid
    pub fn to_time_height(&self, variable: Variable) -> Result<TimeHeightGrid, MeteoError> {
        if !self.has(variable) {
            return Err(MeteoError::no_data(format!("no {} values", variable.label())));
        }
        let times = self.times();
        let altitudes = self.altitudes();
        let mut values = vec![vec![None; altitudes.len()]; times.len()];

        for (time, altitude, value) in self.rows(variable) {
            let Ok(ti) = times.binary_search(&time) else {
                continue;
            };
            let ai = match altitudes.binary_search_by(|a| a.total_cmp(&altitude)) {
                Ok(i) => i,
                Err(i) => nearest_index(&altitudes, i, altitude),
            };
            if value.is_some() {
                values[ti][ai] = value;
            }
        }

        Ok(TimeHeightGrid {
            variable,
            times,
            altitudes,
            values,
        })
    }

    /// Ensure `variable` has a column, deriving it from the columns present
    pub fn derive(&mut self, variable: Variable) -> Result<(), MeteoError> {
        if self.has(variable) {
            return Ok(());
        }

        let derived: Vec<Option<f64>> = match variable {
            Variable::WindSpeed => self.combine2(Variable::WindU, Variable::WindV, variable, |u, v| {
                Some(derivation::wind_speed(u, v))
            })?,
            Variable::WindDirection => self.combine2(Variable::WindU, Variable::WindV, variable, |u, v| {
                Some(derivation::wind_direction(u, v))
            })?,
            Variable::WindU => self.combine2(Variable::WindSpeed, Variable::WindDirection, variable, |s, d| {
                Some(derivation::wind_components(s, d).0)
            })?,
            Variable::WindV => self.combine2(Variable::WindSpeed, Variable::WindDirection, variable, |s, d| {
                Some(derivation::wind_components(s, d).1)
            })?,
            Variable::PotentialTemperature => {
                self.combine2(Variable::Temperature, Variable::Pressure, variable, derivation::potential_temperature)?
            }
            Variable::SpecificHumidity => {
                self.combine2(Variable::DewPoint, Variable::Pressure, variable, derivation::specific_humidity)?
            }
            Variable::RelativeHumidity if self.has(Variable::DewPoint) => {
                self.combine2(Variable::Temperature, Variable::DewPoint, variable, derivation::relative_humidity)?
            }
            Variable::RelativeHumidity => {
                let q = self.required(Variable::SpecificHumidity, variable)?;
                let t = self.required(Variable::Temperature, variable)?;
                let p = self.required(Variable::Pressure, variable)?;
                q.iter()
                    .zip(t)
                    .zip(p)
                    .map(|((q, t), p)| match (q, t, p) {
                        (Some(q), Some(t), Some(p)) => derivation::relative_humidity_from_specific(*q, *t, *p),
                        _ => None,
                    })
                    .collect()
            }
            Variable::DewPoint => {
                self.combine2(Variable::SpecificHumidity, Variable::Pressure, variable, derivation::dew_point_from_specific_humidity)?
            }
            Variable::Temperature | Variable::Pressure => {
                return Err(MeteoError::no_data(format!(
                    "{} is not available from this source",
                    variable.label()
                )));
            }
        };

        self.columns.insert(variable, derived);
        Ok(())
    }

    fn required(&self, input: Variable, target: Variable) -> Result<&[Option<f64>], MeteoError> {
        self.column(input).ok_or_else(|| {
            MeteoError::no_data(format!(
                "cannot derive {} without {}",
                target.label(),
                input.label()
            ))
        })
    }

    fn combine2<F>(&self, a: Variable, b: Variable, target: Variable, f: F) -> Result<Vec<Option<f64>>, MeteoError>
    where
        F: Fn(f64, f64) -> Option<f64>,
    {
        let a = self.required(a, target)?;
        let b = self.required(b, target)?;
        Ok(a.iter()
            .zip(b)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => f(*a, *b),
                _ => None,
            })
            .collect())
    }
}

fn nearest_index(sorted: &[f64], insertion: usize, value: f64) -> usize {
    if insertion == 0 {
        0
    } else if insertion >= sorted.len() {
        sorted.len() - 1
    } else if (value - sorted[insertion - 1]).abs() <= (sorted[insertion] - value).abs() {
        insertion - 1
    } else {
        insertion
    }
}

/// Time × altitude grid of one variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeHeightGrid {
    pub variable: Variable,
    /// Sorted unique timestamps
    pub times: Vec<DateTime<Utc>>,
    /// Sorted unique altitudes in m a.s.l.
    pub altitudes: Vec<f64>,
    /// `values[time][altitude]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl TimeHeightGrid {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().flatten().all(Option::is_none)
    }

    #[must_use]
    pub fn cell(&self, time_index: usize, altitude_index: usize) -> Option<f64> {
        self.values
            .get(time_index)
            .and_then(|row| row.get(altitude_index))
            .copied()
            .flatten()
    }

    /// Minimum and maximum over present cells
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        value_range(self.values.iter().flatten().filter_map(|v| *v))
    }
}

/// Values of one variable over time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Legend label, e.g. `PAY surface`
    pub label: String,
    pub variable: Variable,
    pub points: Vec<(DateTime<Utc>, Option<f64>)>,
}

impl TimeSeries {
    #[must_use]
    pub fn new(label: impl Into<String>, variable: Variable, points: Vec<(DateTime<Utc>, Option<f64>)>) -> Self {
        Self {
            label: label.into(),
            variable,
            points,
        }
    }

    /// Series of a single-level table (e.g. surface data)
    #[must_use]
    pub fn from_table(label: impl Into<String>, table: &ProfileTable, variable: Variable) -> Self {
        let mut points: Vec<(DateTime<Utc>, Option<f64>)> =
            table.rows(variable).map(|(t, _, v)| (t, v)).collect();
        points.sort_by_key(|(t, _)| *t);
        Self::new(label, variable, points)
    }

    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        value_range(self.points.iter().filter_map(|(_, v)| *v))
    }

    #[must_use]
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.points.iter().map(|(t, _)| *t).min()?;
        let last = self.points.iter().map(|(t, _)| *t).max()?;
        Some((first, last))
    }
}

/// Minimum and maximum of an iterator of finite values
pub fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
