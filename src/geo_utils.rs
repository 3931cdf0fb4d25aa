//! # Geographic Utilities
//!
//! Core geographic computation utilities for location trace analysis.
//!
//! All distances are great-circle (haversine) distances in meters over WGS84
//! latitude/longitude coordinates, which is the standard for GPS receivers
//! and the OwnTracks-style feeds this library consumes.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`polyline_length`] | Total length of a trace in meters |
//! | [`compute_center`] | Centroid of a set of coordinates |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//! | [`slope_angle`] | Slope angle from horizontal run and altitude delta |

use geo::{Distance, Haversine, Point};

use crate::Coordinates;

/// Calculate the great-circle distance between two coordinates using the
/// Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use activity_detector::{geo_utils, Coordinates};
///
/// let london = Coordinates::new(51.5074, -0.1278);
/// let paris = Coordinates::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(a: &Coordinates, b: &Coordinates) -> f64 {
    let p1 = Point::new(a.longitude, a.latitude);
    let p2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(p1, p2)
}

/// Calculate the total length of a trace in meters.
///
/// Sums the haversine distance between consecutive coordinates. Empty or
/// single-point traces return 0.0.
pub fn polyline_length(coords: &[Coordinates]) -> f64 {
    if coords.len() < 2 {
        return 0.0;
    }

    coords
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Compute the geographic center (centroid) of a set of coordinates.
///
/// Arithmetic mean of latitudes and longitudes, suitable for the small
/// areas a single activity session covers. Returns (0, 0) for empty input.
pub fn compute_center(coords: &[Coordinates]) -> Coordinates {
    if coords.is_empty() {
        return Coordinates::new(0.0, 0.0);
    }

    let sum_lat: f64 = coords.iter().map(|c| c.latitude).sum();
    let sum_lng: f64 = coords.iter().map(|c| c.longitude).sum();
    let n = coords.len() as f64;

    Coordinates::new(sum_lat / n, sum_lng / n)
}

/// Convert meters to approximate degrees at a given latitude.
///
/// At the equator, 1 degree is about 111,320 meters; the longitude scale
/// shrinks with cos(latitude). Returns a single value suitable for square
/// R-tree envelope queries.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

/// Slope angle in degrees from a horizontal run and an altitude delta.
///
/// Positive values mean ascending, negative descending. A zero horizontal
/// run with a non-zero delta saturates at ±90 degrees.
#[inline]
pub fn slope_angle(horizontal_m: f64, altitude_delta_m: f64) -> f64 {
    altitude_delta_m.atan2(horizontal_m.max(0.0)).to_degrees()
}
