//! Defines the fixed global lattice forecast models sample on, together with the
//! index types ([`GridPoint`], [`IndexWindow`]) used to address it.

use crate::forecast::error::ForecastError;
use serde::{Deserialize, Serialize};

/// Full longitude span covered by the lattice, in degrees.
const LON_SPAN: f64 = 360.0;
/// Full latitude span covered by the lattice, in degrees.
const LAT_SPAN: f64 = 180.0;
/// Tolerance used when checking that a resolution divides a span exactly.
const SPAN_EPSILON: f64 = 1e-9;

/// A regular global latitude/longitude grid.
///
/// Longitudes run from `0` to `360 - resolution` (the 0.5° lattice ends at
/// 359.5°), latitudes from `-90` to `90` inclusive. Both axes ascend, so index
/// `0` is 0°E on the longitude axis and 90°S on the latitude axis.
///
/// A lattice serializes as its resolution and is validated again on the way in.
///
/// # Examples
///
/// ```
/// use gfs_window::Lattice;
///
/// let lattice = Lattice::new(0.5).unwrap();
/// assert_eq!(lattice.lon_count(), 720);
/// assert_eq!(lattice.lat_count(), 361);
/// assert_eq!(lattice.lon_max(), 359.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Lattice {
    resolution: f64,
    lon_count: usize,
    lat_count: usize,
}

impl Lattice {
    pub const LON_MIN: f64 = 0.0;
    pub const LAT_MIN: f64 = -90.0;
    pub const LAT_MAX: f64 = 90.0;

    /// Creates a lattice with the given resolution in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidLattice`] if the resolution is not a positive,
    /// finite number that divides both the 360° and 180° spans into whole cells.
    pub fn new(resolution: f64) -> Result<Self, ForecastError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(ForecastError::InvalidLattice {
                resolution,
                reason: "resolution must be a positive, finite number of degrees".to_string(),
            });
        }

        let lon_cells = whole_cells(LON_SPAN, resolution).ok_or_else(|| {
            ForecastError::InvalidLattice {
                resolution,
                reason: "resolution does not divide the 360 degree longitude span".to_string(),
            }
        })?;
        let lat_cells = whole_cells(LAT_SPAN, resolution).ok_or_else(|| {
            ForecastError::InvalidLattice {
                resolution,
                reason: "resolution does not divide the 180 degree latitude span".to_string(),
            }
        })?;

        Ok(Self {
            resolution,
            // Longitude wraps, so 360° is the same column as 0°.
            lon_count: lon_cells,
            lat_count: lat_cells + 1,
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of columns on the longitude axis.
    pub fn lon_count(&self) -> usize {
        self.lon_count
    }

    /// Number of rows on the latitude axis (both poles included).
    pub fn lat_count(&self) -> usize {
        self.lat_count
    }

    /// Longitude of the last column, `360 - resolution`.
    pub fn lon_max(&self) -> f64 {
        self.lon_at(self.lon_count - 1)
    }

    /// Longitude of column `index`.
    pub fn lon_at(&self, index: usize) -> f64 {
        Self::LON_MIN + index as f64 * self.resolution
    }

    /// Latitude of row `index`.
    pub fn lat_at(&self, index: usize) -> f64 {
        Self::LAT_MIN + index as f64 * self.resolution
    }

    /// Ascending longitude coordinates of every column.
    pub fn lons(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.lon_count).map(|i| self.lon_at(i))
    }

    /// Ascending latitude coordinates of every row.
    pub fn lats(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.lat_count).map(|j| self.lat_at(j))
    }

    pub fn contains_lon_index(&self, index: i64) -> bool {
        index >= 0 && (index as u64) < self.lon_count as u64
    }

    pub fn contains_lat_index(&self, index: i64) -> bool {
        index >= 0 && (index as u64) < self.lat_count as u64
    }
}

impl Default for Lattice {
    /// The 0.5° lattice used by the `gfs_0p50` model.
    fn default() -> Self {
        Self {
            resolution: 0.5,
            lon_count: 720,
            lat_count: 361,
        }
    }
}

impl TryFrom<f64> for Lattice {
    type Error = ForecastError;

    fn try_from(resolution: f64) -> Result<Self, Self::Error> {
        Self::new(resolution)
    }
}

impl From<Lattice> for f64 {
    fn from(lattice: Lattice) -> Self {
        lattice.resolution
    }
}

fn whole_cells(span: f64, resolution: f64) -> Option<usize> {
    let cells = span / resolution;
    let rounded = cells.round();
    if rounded < 1.0 || (cells - rounded).abs() > SPAN_EPSILON * cells.max(1.0) {
        return None;
    }
    Some(rounded as usize)
}

/// A zero-based cell address on a [`Lattice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub lon_index: usize,
    pub lat_index: usize,
}

/// Inclusive index ranges surrounding a [`GridPoint`].
///
/// Bounds are not clamped to the lattice and may be negative or exceed its
/// dimensions; whoever executes the request decides how to treat them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexWindow {
    pub lon_range: [i64; 2],
    pub lat_range: [i64; 2],
}

impl IndexWindow {
    pub fn lon_len(&self) -> usize {
        (self.lon_range[1] - self.lon_range[0] + 1) as usize
    }

    pub fn lat_len(&self) -> usize {
        (self.lat_range[1] - self.lat_range[0] + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_half_degree() {
        let lattice = Lattice::new(0.5).unwrap();
        assert_eq!(lattice, Lattice::default());
        assert_eq!(lattice.lon_at(616), 308.0);
        assert_eq!(lattice.lat_at(0), -90.0);
        assert_eq!(lattice.lat_at(360), 90.0);
    }

    #[test]
    fn test_quarter_degree() {
        let lattice = Lattice::new(0.25).unwrap();
        assert_eq!(lattice.lon_count(), 1440);
        assert_eq!(lattice.lat_count(), 721);
        assert_eq!(lattice.lon_max(), 359.75);
    }

    #[test]
    fn test_rejects_bad_resolutions() {
        for resolution in [0.0, -0.5, f64::NAN, f64::INFINITY, 0.7, 400.0] {
            assert!(
                matches!(
                    Lattice::new(resolution),
                    Err(ForecastError::InvalidLattice { .. })
                ),
                "resolution {} should be rejected",
                resolution
            );
        }
    }

    #[test]
    fn test_serde_goes_through_validation() {
        let lattice: Lattice = serde_json::from_str("0.25").unwrap();
        assert_eq!(lattice.lon_count(), 1440);
        assert_eq!(serde_json::to_string(&Lattice::default()).unwrap(), "0.5");

        for bad in ["0.7", "0", "-0.5"] {
            assert!(serde_json::from_str::<Lattice>(bad).is_err(), "{} accepted", bad);
        }
        // field-by-field input never bypasses the checks
        let raw = r#"{"resolution":0.5,"lon_count":0,"lat_count":361}"#;
        assert!(serde_json::from_str::<Lattice>(raw).is_err());
    }

    #[test]
    fn test_index_containment() {
        let lattice = Lattice::default();
        assert!(lattice.contains_lon_index(0));
        assert!(lattice.contains_lon_index(719));
        assert!(!lattice.contains_lon_index(720));
        assert!(!lattice.contains_lat_index(-1));
        assert!(lattice.contains_lat_index(360));
    }
}
