//! WGS84 ellipsoid constants and the geodetic-to-ECEF forward
//! transform.

use crate::C;
use nalgebra::Point3;

/// WGS84 semi-major axis in meters.
pub const WGS84_A: C = 6_378_137.0;

/// WGS84 flattening.
pub const WGS84_F: C = 1.0 / 298.257_223_563;

/// WGS84 semi-minor axis in meters.
pub const WGS84_B: C = WGS84_A * (1.0 - WGS84_F);

/// WGS84 first eccentricity squared.
pub const WGS84_E2: C = WGS84_F * (2.0 - WGS84_F);

/// Converts geodetic coordinates (degrees, meters above the
/// ellipsoid) to Earth-Centered Earth-Fixed meters.
pub fn geodetic_to_ecef(lat_deg: C, lon_deg: C, height: C) -> Point3<C> {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    // Prime vertical radius of curvature.
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    Point3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height) * sin_lat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let p = geodetic_to_ecef(0.0, 0.0, 0.0);
        assert_relative_eq!(p.x, WGS84_A, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_poles_sit_on_semi_minor_axis() {
        let north = geodetic_to_ecef(90.0, 0.0, 0.0);
        assert_relative_eq!(north.z, WGS84_B, epsilon = 1e-6);
        assert_relative_eq!(north.x, 0.0, epsilon = 1e-6);
        let south = geodetic_to_ecef(-90.0, 45.0, 0.0);
        assert_relative_eq!(south.z, -WGS84_B, epsilon = 1e-6);
    }

    #[test]
    fn test_height_adds_along_the_normal() {
        let surface = geodetic_to_ecef(0.0, 90.0, 0.0);
        let raised = geodetic_to_ecef(0.0, 90.0, 1000.0);
        assert_relative_eq!(raised.y - surface.y, 1000.0, epsilon = 1e-6);
        assert_relative_eq!(raised.x, surface.x, epsilon = 1e-6);
    }
}
