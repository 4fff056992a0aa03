use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Both values are decimal degrees; longitudes may use either the `[-180, 180)`
/// or the `[0, 360)` convention.
///
/// # Examples
///
/// ```
/// use gfs_window::LatLon;
///
/// let rio_verde = LatLon(-19.78753, -51.98899);
/// assert_eq!(rio_verde.0, -19.78753); // Latitude
/// assert_eq!(rio_verde.1, -51.98899); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}
