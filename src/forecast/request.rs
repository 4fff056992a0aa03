//! Composes grid indexing and horizon resolution into a single, immutable fetch description.

use crate::forecast::error::ForecastError;
use crate::forecast::horizon::{ForecastStep, Horizon, DEFAULT_SAMPLING_INTERVAL_HOURS};
use crate::grid::indexer::{nearest_grid_point, window_around};
use crate::grid::lattice::{IndexWindow, Lattice};
use crate::types::lat_lon::LatLon;
use bon::bon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of lattice cells on either side of the point of interest.
///
/// The default of 12 columns by 14 rows spans roughly 12° x 14° on the 0.5° lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHalfWidths {
    pub lon: u32,
    pub lat: u32,
}

impl WindowHalfWidths {
    pub fn new(lon: u32, lat: u32) -> Self {
        Self { lon, lat }
    }
}

impl Default for WindowHalfWidths {
    fn default() -> Self {
        Self { lon: 12, lat: 14 }
    }
}

/// Everything a provider needs to fetch one forecast subset.
///
/// Requests are plain values: building one performs no I/O, and two requests
/// built from the same inputs compare equal (and hash equally).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastRequest {
    model_id: String,
    model_run_id: String,
    variable: String,
    time_range: [ForecastStep; 2],
    lon_window: [i64; 2],
    lat_window: [i64; 2],
}

#[bon]
impl ForecastRequest {
    /// Resolves a point of interest and a horizon into a request.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.model_id(&str)`: **Required.** Model identifier, e.g. `"gfs_0p50"`.
    /// * `.model_run_id(&str)`: **Required.** Run identifier, e.g. `"gfs20240115/gfs_0p50_06z"`.
    /// * `.variable(&str)`: **Required.** Variable name, e.g. `"apcpsfc"`.
    /// * `.horizon(Horizon)`: **Required.** Hours ahead (`f64` converts) or the latest of a list of steps.
    /// * `.poi(LatLon)`: **Required.** Point of interest.
    /// * `.lattice(Lattice)`: Optional. Defaults to the 0.5° lattice.
    /// * `.half_widths(WindowHalfWidths)`: Optional. Defaults to 12 columns, 14 rows.
    /// * `.sampling_interval_hours(f64)`: Optional. Defaults to 3 hours.
    ///
    /// The time range always starts at the analysis step, so accumulated
    /// quantities cover the whole period up to the horizon.
    ///
    /// # Errors
    ///
    /// Checked in this order, nothing is resolved past the first failure:
    /// * [`ForecastError::InvalidRequest`] if an identifier or the variable is blank.
    /// * [`ForecastError::InvalidHorizon`] if the horizon is negative, not finite, or
    ///   refers to an empty list of steps.
    /// * [`ForecastError::OutOfDomain`] if the point of interest has an invalid latitude.
    ///
    /// # Examples
    ///
    /// ```
    /// use gfs_window::{ForecastRequest, ForecastStep, LatLon};
    ///
    /// let request = ForecastRequest::builder()
    ///     .model_id("gfs_0p50")
    ///     .model_run_id("gfs20240115/gfs_0p50_00z")
    ///     .variable("apcpsfc")
    ///     .horizon(348.0)
    ///     .poi(LatLon(-19.78753, -51.98899))
    ///     .build()?;
    ///
    /// assert_eq!(request.time_range(), [ForecastStep(0), ForecastStep(116)]);
    /// assert_eq!(request.lon_window(), [604, 628]);
    /// # Ok::<(), gfs_window::ForecastError>(())
    /// ```
    #[builder]
    pub fn new(
        model_id: &str,
        model_run_id: &str,
        variable: &str,
        #[builder(into)] horizon: Horizon,
        poi: LatLon,
        lattice: Option<Lattice>,
        half_widths: Option<WindowHalfWidths>,
        sampling_interval_hours: Option<f64>,
    ) -> Result<Self, ForecastError> {
        let lattice = lattice.unwrap_or_default();
        let half_widths = half_widths.unwrap_or_default();
        let sampling_interval_hours =
            sampling_interval_hours.unwrap_or(DEFAULT_SAMPLING_INTERVAL_HOURS);

        let model_id = required("model id", model_id)?;
        let model_run_id = required("model run id", model_run_id)?;
        let variable = required("variable", variable)?;

        let last_step = horizon.resolve(sampling_interval_hours)?;

        let center = nearest_grid_point(poi.lat(), poi.lon(), &lattice)?;
        let window = window_around(center, half_widths.lon, half_widths.lat);

        Ok(Self {
            model_id,
            model_run_id,
            variable,
            time_range: [ForecastStep::ANALYSIS, last_step],
            lon_window: window.lon_range,
            lat_window: window.lat_range,
        })
    }
}

impl ForecastRequest {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn model_run_id(&self) -> &str {
        &self.model_run_id
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Inclusive first and last forecast step.
    pub fn time_range(&self) -> [ForecastStep; 2] {
        self.time_range
    }

    /// Inclusive longitude index bounds, possibly outside the lattice.
    pub fn lon_window(&self) -> [i64; 2] {
        self.lon_window
    }

    /// Inclusive latitude index bounds, possibly outside the lattice.
    pub fn lat_window(&self) -> [i64; 2] {
        self.lat_window
    }

    pub fn index_window(&self) -> IndexWindow {
        IndexWindow {
            lon_range: self.lon_window,
            lat_range: self.lat_window,
        }
    }

    /// Number of forecast steps covered by the time range.
    pub fn step_count(&self) -> usize {
        (self.time_range[1].index() - self.time_range[0].index()) as usize + 1
    }

    /// Center of the spatial window, i.e. the grid point nearest to the point of interest.
    pub fn center_indices(&self) -> (i64, i64) {
        (
            (self.lon_window[0] + self.lon_window[1]) / 2,
            (self.lat_window[0] + self.lat_window[1]) / 2,
        )
    }
}

impl fmt::Display for ForecastRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {}[{}:{}][{}:{}][{}:{}]",
            self.model_id,
            self.model_run_id,
            self.variable,
            self.time_range[0],
            self.time_range[1],
            self.lat_window[0],
            self.lat_window[1],
            self.lon_window[0],
            self.lon_window[1]
        )
    }
}

fn required(what: &str, value: &str) -> Result<String, ForecastError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ForecastError::InvalidRequest(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}
