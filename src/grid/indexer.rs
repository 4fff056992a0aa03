//! Maps real-world coordinates onto a [`Lattice`] and builds index windows around them.

use crate::forecast::error::ForecastError;
use crate::grid::lattice::{GridPoint, IndexWindow, Lattice};
use ordered_float::OrderedFloat;

/// Rotates a longitude into the lattice's `[0, 360)` convention.
///
/// Negative longitudes are shifted by +360, values of 360 and above wrap around.
///
/// ```
/// use gfs_window::normalize_longitude;
///
/// assert_eq!(normalize_longitude(-51.5), 308.5);
/// assert_eq!(normalize_longitude(360.0), 0.0);
/// assert_eq!(normalize_longitude(normalize_longitude(-720.25)), normalize_longitude(-720.25));
/// ```
pub fn normalize_longitude(lon: f64) -> f64 {
    let normalized = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Finds the lattice cell nearest to `(lat, lon)`.
///
/// Each axis is searched independently: the difference between the query and
/// every lattice coordinate on that axis is computed and the index with the
/// smallest difference wins. Ties go to the lowest index. Longitude differences
/// are measured around the circle, so 359.9° lands on the 0° column.
///
/// # Errors
///
/// Returns [`ForecastError::OutOfDomain`] if `lat` is outside `[-90, 90]` or either
/// coordinate is not finite. Longitudes never fail otherwise, they wrap.
pub fn nearest_grid_point(lat: f64, lon: f64, lattice: &Lattice) -> Result<GridPoint, ForecastError> {
    if !lat.is_finite()
        || !lon.is_finite()
        || !(Lattice::LAT_MIN..=Lattice::LAT_MAX).contains(&lat)
    {
        return Err(ForecastError::OutOfDomain { lat, lon });
    }

    let lon = normalize_longitude(lon);
    let lon_index = nearest_index(lattice.lons(), |candidate| {
        let d = (candidate - lon).abs();
        d.min(360.0 - d)
    });
    let lat_index = nearest_index(lattice.lats(), |candidate| (candidate - lat).abs());

    // Both axes hold at least one coordinate for any valid lattice.
    match (lon_index, lat_index) {
        (Some(lon_index), Some(lat_index)) => Ok(GridPoint {
            lon_index,
            lat_index,
        }),
        _ => Err(ForecastError::OutOfDomain { lat, lon }),
    }
}

fn nearest_index(
    coords: impl Iterator<Item = f64>,
    distance: impl Fn(f64) -> f64,
) -> Option<usize> {
    // min_by_key keeps the first of several equal minima
    coords
        .enumerate()
        .min_by_key(|(_, coord)| OrderedFloat(distance(*coord)))
        .map(|(index, _)| index)
}

/// Builds the inclusive window of `half_width_lon` columns and `half_width_lat`
/// rows on either side of `point`. No clamping is applied.
pub fn window_around(point: GridPoint, half_width_lon: u32, half_width_lat: u32) -> IndexWindow {
    let lon = point.lon_index as i64;
    let lat = point.lat_index as i64;
    let hw_lon = half_width_lon as i64;
    let hw_lat = half_width_lat as i64;
    IndexWindow {
        lon_range: [lon - hw_lon, lon + hw_lon],
        lat_range: [lat - hw_lat, lat + hw_lat],
    }
}
