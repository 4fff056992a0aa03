//! The raw gridded payload a provider returns for a [`crate::ForecastRequest`].

use crate::provider::error::ProviderError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column names of the long-format frame produced by [`ForecastGrid::to_dataframe`].
pub const GRID_COLUMNS: [&str; 4] = ["time", "lat", "lon", "value"];

/// GFS accumulates precipitation in 6 hour buckets: the 3 h step holds 0-3 h,
/// the 6 h step 0-6 h, then 6-9 h, 6-12 h and so on.
pub const GFS_PRECIP_BUCKET_HOURS: f64 = 6.0;

/// Number of sampling steps that make up one accumulation bucket, at least one.
pub fn bucket_steps(bucket_hours: f64, sampling_interval_hours: f64) -> usize {
    (bucket_hours / sampling_interval_hours).round().max(1.0) as usize
}

/// A `[time][lat][lon]` block of forecast values together with its coordinate vectors.
///
/// Values are stored row-major with longitude varying fastest. Missing values
/// (the provider's fill value) are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastGrid {
    pub variable: String,
    pub time: Vec<f64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub values: Vec<f64>,
}

/// Summary statistics over the finite values of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid_count: usize,
}

impl ForecastGrid {
    /// Creates a grid, checking that `values` matches the coordinate lengths.
    pub fn new(
        variable: impl Into<String>,
        time: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, ProviderError> {
        let expected = time.len() * lat.len() * lon.len();
        if values.len() != expected {
            return Err(ProviderError::InconsistentGrid(format!(
                "grid holds {} values but its coordinates describe {} ({} x {} x {})",
                values.len(),
                expected,
                time.len(),
                lat.len(),
                lon.len()
            )));
        }
        Ok(Self {
            variable: variable.into(),
            time,
            lat,
            lon,
            values,
        })
    }

    /// `[time, lat, lon]` dimensions.
    pub fn shape(&self) -> [usize; 3] {
        [self.time.len(), self.lat.len(), self.lon.len()]
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, t: usize, y: usize, x: usize) -> Option<f64> {
        let [nt, ny, nx] = self.shape();
        if t >= nt || y >= ny || x >= nx {
            return None;
        }
        self.values.get((t * ny + y) * nx + x).copied()
    }

    /// Total accumulation per cell over the whole time axis.
    ///
    /// The first layer is the run's analysis time and carries no accumulation.
    /// Every later layer holds the amount since the start of its bucket of
    /// `bucket_steps` steps, so only the layers that close a bucket are summed,
    /// plus the last layer when it ends inside a bucket. With a `bucket_steps`
    /// of one every step after the analysis is summed. Missing values are
    /// skipped; a cell with nothing to sum stays `NaN`.
    ///
    /// The result has a single time step stamped with the last time coordinate.
    pub fn accumulated(&self, bucket_steps: usize) -> ForecastGrid {
        let bucket_steps = bucket_steps.max(1);
        let [nt, ny, nx] = self.shape();
        let mut totals = vec![f64::NAN; ny * nx];
        let closing = (1..nt).filter(|t| t % bucket_steps == 0 || *t == nt - 1);
        for t in closing {
            let layer = &self.values[t * ny * nx..(t + 1) * ny * nx];
            for (total, value) in totals.iter_mut().zip(layer) {
                if value.is_finite() {
                    *total = if total.is_nan() { *value } else { *total + value };
                }
            }
        }
        ForecastGrid {
            variable: self.variable.clone(),
            time: self.time.last().map(|t| vec![*t]).unwrap_or_default(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            values: if nt == 0 { Vec::new() } else { totals },
        }
    }

    /// Min, max and mean over the finite values, or `None` if there are none.
    pub fn stats(&self) -> Option<GridStats> {
        let finite = self.values.iter().copied().filter(|v| v.is_finite());
        let (count, sum, min, max) = finite.fold(
            (0usize, 0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(count, sum, min, max), v| (count + 1, sum + v, min.min(v), max.max(v)),
        );
        if count == 0 {
            return None;
        }
        Some(GridStats {
            min,
            max,
            mean: sum / count as f64,
            valid_count: count,
        })
    }

    /// Flattens the grid into a long-format frame with one row per cell
    /// (`time`, `lat`, `lon`, `value`), ordered time, then latitude, then longitude.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let [nt, ny, nx] = self.shape();
        let len = nt * ny * nx;
        let mut time = Vec::with_capacity(len);
        let mut lat = Vec::with_capacity(len);
        let mut lon = Vec::with_capacity(len);
        for t in &self.time {
            for y in &self.lat {
                for x in &self.lon {
                    time.push(*t);
                    lat.push(*y);
                    lon.push(*x);
                }
            }
        }

        df!(
            GRID_COLUMNS[0] => time,
            GRID_COLUMNS[1] => lat,
            GRID_COLUMNS[2] => lon,
            GRID_COLUMNS[3] => self.values.clone()
        )
    }

    /// Rebuilds a grid from a frame produced by [`ForecastGrid::to_dataframe`].
    pub fn from_dataframe(variable: impl Into<String>, df: &DataFrame) -> PolarsResult<Self> {
        let time = float_column(df, GRID_COLUMNS[0])?;
        let lat = float_column(df, GRID_COLUMNS[1])?;
        let lon = float_column(df, GRID_COLUMNS[2])?;
        let values = float_column(df, GRID_COLUMNS[3])?;

        let time_axis = distinct_in_order(&time);
        let lat_axis = distinct_in_order(&lat);
        let lon_axis = distinct_in_order(&lon);
        let (ny, nx) = (lat_axis.len(), lon_axis.len());

        let consistent = values.len() == time_axis.len() * ny * nx
            && (0..values.len()).all(|i| {
                same(time[i], time_axis[i / (ny * nx)])
                    && same(lat[i], lat_axis[(i / nx) % ny])
                    && same(lon[i], lon_axis[i % nx])
            });
        if !consistent {
            return Err(PolarsError::ShapeMismatch(
                "frame rows do not form a complete time x lat x lon grid".into(),
            ));
        }

        Ok(Self {
            variable: variable.into(),
            time: time_axis,
            lat: lat_axis,
            lon: lon_axis,
            values,
        })
    }
}

fn float_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn same(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

fn distinct_in_order(values: &[f64]) -> Vec<f64> {
    let mut distinct: Vec<f64> = Vec::new();
    for v in values {
        if !distinct.iter().any(|d| same(*d, *v)) {
            distinct.push(*v);
        }
    }
    distinct
}
