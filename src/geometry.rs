//! Distance, zoom and heading computations between coordinates.

use crate::types::Coordinate;

/// Equatorial radius of the Earth in meters (WGS 84).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Great-circle distance between two coordinates in meters (haversine).
///
/// Zoom selection is threshold based, so this keeps the exact
/// `2 * R * asin(sqrt(...))` form rather than an `atan2` variant.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let rlat1 = a.lat.to_radians();
    let rlat2 = b.lat.to_radians();
    let diff_lat = rlat2 - rlat1;
    let diff_lng = (a.lng - b.lng).to_radians();

    let h = (diff_lat / 2.0).sin().powi(2)
        + rlat1.cos() * rlat2.cos() * (diff_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Pick a zoom level from the distance between panorama and target.
///
/// The further the target, the more we zoom in:
/// - `< 50 m`: 0
/// - `< 75 m`: 1
/// - `< 100 m`: 1.5
/// - otherwise: 2
pub fn zoom_level(distance_meters: f64) -> f64 {
    if distance_meters < 50.0 {
        0.0
    } else if distance_meters < 75.0 {
        1.0
    } else if distance_meters < 100.0 {
        1.5
    } else {
        2.0
    }
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Computes the compass heading from one coordinate toward another.
///
/// Implementations return degrees clockwise from north in `[0, 360)`.
pub trait HeadingProvider: Send + Sync {
    fn compute_heading(&self, from: Coordinate, to: Coordinate) -> f64;
}

/// Initial bearing along the great circle, as spherical geometry libraries
/// compute it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalHeading;

impl HeadingProvider for SphericalHeading {
    fn compute_heading(&self, from: Coordinate, to: Coordinate) -> f64 {
        let lat1 = from.lat.to_radians();
        let lat2 = to.lat.to_radians();
        let diff_lng = (to.lng - from.lng).to_radians();

        let y = diff_lng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * diff_lng.cos();

        normalize_heading(y.atan2(x).to_degrees())
    }
}

impl<F> HeadingProvider for F
where
    F: Fn(Coordinate, Coordinate) -> f64 + Send + Sync,
{
    fn compute_heading(&self, from: Coordinate, to: Coordinate) -> f64 {
        normalize_heading(self(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: Coordinate = Coordinate { lat: 48.85, lng: 2.35 };
    const MONTREAL: Coordinate = Coordinate {
        lat: 45.531776760335504,
        lng: -73.55924595184348,
    };

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance(PARIS, PARIS), 0.0);
        assert_eq!(distance(MONTREAL, MONTREAL), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = distance(PARIS, MONTREAL);
        let ba = distance(MONTREAL, PARIS);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_distance_one_degree_of_latitude() {
        // One degree along a meridian is R * pi / 180
        let d = distance(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_distance_short_hop() {
        // ~40 m north of the target
        let offset = 40.0 / (EARTH_RADIUS_M * std::f64::consts::PI / 180.0);
        let d = distance(PARIS, Coordinate::new(PARIS.lat + offset, PARIS.lng));
        assert!((d - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_level_boundaries() {
        assert_eq!(zoom_level(0.0), 0.0);
        assert_eq!(zoom_level(49.999), 0.0);
        assert_eq!(zoom_level(50.0), 1.0);
        assert_eq!(zoom_level(74.999), 1.0);
        assert_eq!(zoom_level(75.0), 1.5);
        assert_eq!(zoom_level(99.999), 1.5);
        assert_eq!(zoom_level(100.0), 2.0);
        assert_eq!(zoom_level(10_000.0), 2.0);
    }

    #[test]
    fn test_zoom_level_is_monotonic() {
        let mut previous = zoom_level(0.0);
        for step in 0..2_000 {
            let zoom = zoom_level(step as f64 * 0.1);
            assert!(zoom >= previous, "zoom decreased at {}", step as f64 * 0.1);
            previous = zoom;
        }
    }

    #[test]
    fn test_spherical_heading_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        let h = SphericalHeading;
        assert!((h.compute_heading(origin, Coordinate::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((h.compute_heading(origin, Coordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((h.compute_heading(origin, Coordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((h.compute_heading(origin, Coordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_closure_heading_is_normalized() {
        let provider = |_: Coordinate, _: Coordinate| -90.0_f64;
        assert_eq!(provider.compute_heading(PARIS, MONTREAL), 270.0);
    }

    #[test]
    fn test_normalize_heading() {
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(-10.0), 350.0);
        assert_eq!(normalize_heading(725.0), 5.0);
    }
}
