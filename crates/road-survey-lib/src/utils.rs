//! Projection math for the supported coordinate reference systems
//!
//! All functions work on raw `f64` pairs in (x, y) order: longitude/latitude
//! degrees for WGS84, easting/northing metres for the projected systems.

use geo::Point;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Precomputed constant: 180.0 / EARTH_MERCATOR_MAX
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;

/// Precomputed constant: PI / EARTH_MERCATOR_MAX
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

// WGS84 ellipsoid
const WGS84_A: f64 = 6378137.0;
const WGS84_F: f64 = 1.0 / 298.257223563;

/// UTM scale factor on the central meridian
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Convert WGS84 (lon, lat) to Web Mercator (x, y) in meters
///
/// Latitude is clamped to the representable Web Mercator range.
#[inline(always)]
pub fn wgs84_to_mercator(lon: f64, lat: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;

    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters to WGS84 (lon, lat)
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> Point<f64> {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    Point::new(lon, lat)
}

/// Longitude of the central meridian of a UTM zone, in degrees
#[inline]
pub fn utm_central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

/// UTM zone (1..=60) containing the given longitude
#[inline]
pub fn utm_zone_for_lon(lon: f64) -> u8 {
    let lon = ((lon + 180.0).rem_euclid(360.0)) - 180.0;
    (((lon + 180.0) / 6.0).floor() as i64).clamp(0, 59) as u8 + 1
}

struct Ellipsoid {
    e2: f64,
    ep2: f64,
}

#[inline(always)]
fn ellipsoid() -> Ellipsoid {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    Ellipsoid {
        e2,
        ep2: e2 / (1.0 - e2),
    }
}

/// Meridional arc length from the equator to latitude `phi` (radians)
fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Convert WGS84 (lon, lat) to UTM easting/northing in meters for a given zone
///
/// Uses the Snyder series expansion of the transverse Mercator projection,
/// accurate to well under a millimetre inside the zone.
pub fn wgs84_to_utm(lon: f64, lat: f64, zone: u8, north: bool) -> Point<f64> {
    let Ellipsoid { e2, ep2 } = ellipsoid();

    let phi = lat.to_radians();
    let lambda0 = utm_central_meridian(zone).to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * (lon.to_radians() - lambda0);
    let m = meridian_arc(phi, e2);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + UTM_FALSE_EASTING;

    let mut northing = UTM_K0
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));
    if !north {
        northing += UTM_FALSE_NORTHING_SOUTH;
    }

    Point::new(easting, northing)
}

/// Convert UTM easting/northing in meters back to WGS84 (lon, lat)
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: u8, north: bool) -> Point<f64> {
    let Ellipsoid { e2, ep2 } = ellipsoid();
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    let x = easting - UTM_FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - UTM_FALSE_NORTHING_SOUTH
    };

    let m = y / UTM_K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1_e2 = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = phi1.tan();
    let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
    let n1 = WGS84_A / denom.sqrt();
    let r1 = WGS84_A * (1.0 - e2) / denom.powf(1.5);
    let t1 = tan_phi1 * tan_phi1;
    let c1 = ep2 * cos_phi1 * cos_phi1;
    let d = x / (n1 * UTM_K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lambda = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5 / 120.0)
        / cos_phi1;

    Point::new(
        utm_central_meridian(zone) + lambda.to_degrees(),
        phi.to_degrees(),
    )
}

/// Check if a point is within Web Mercator bounds
#[inline(always)]
pub fn is_valid_mercator(point: &Point<f64>) -> bool {
    let x = point.x();
    let y = point.y();
    (EARTH_MERCATOR_MIN..=EARTH_MERCATOR_MAX).contains(&x)
        && (EARTH_MERCATOR_MIN..=EARTH_MERCATOR_MAX).contains(&y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!((point.x() - 0.0).abs() < 0.01);
        assert!((point.y() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_wgs84_to_mercator_bounds() {
        let west = wgs84_to_mercator(-180.0, 0.0);
        assert!((west.x() - EARTH_MERCATOR_MIN).abs() < 1.0);

        let east = wgs84_to_mercator(180.0, 0.0);
        assert!((east.x() - EARTH_MERCATOR_MAX).abs() < 1.0);
    }

    #[test]
    fn test_mercator_to_wgs84_roundtrip() {
        // Jakarta
        let lon = 106.8456;
        let lat = -6.2088;

        let mercator = wgs84_to_mercator(lon, lat);
        let back = mercator_to_wgs84(mercator.x(), mercator.y());

        assert!((lon - back.x()).abs() < 1e-6);
        assert!((lat - back.y()).abs() < 1e-6);
    }

    #[test]
    fn test_utm_central_meridian_on_equator() {
        // Zone 48 is centered on 105E
        let p = wgs84_to_utm(105.0, 0.0, 48, true);
        assert!((p.x() - 500_000.0).abs() < 1e-6);
        assert!(p.y().abs() < 1e-6);

        let south = wgs84_to_utm(105.0, 0.0, 48, false);
        assert!((south.y() - 10_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_utm_roundtrip() {
        let lon = 106.8456;
        let lat = -6.2088;
        let zone = utm_zone_for_lon(lon);
        assert_eq!(zone, 48);

        let utm = wgs84_to_utm(lon, lat, zone, false);
        let back = utm_to_wgs84(utm.x(), utm.y(), zone, false);

        assert!((lon - back.x()).abs() < 1e-7);
        assert!((lat - back.y()).abs() < 1e-7);
    }

    #[test]
    fn test_utm_distance_close_to_true_scale() {
        // One arc-second of latitude near the equator is about 30.7 m
        let a = wgs84_to_utm(105.0, 0.0, 48, true);
        let b = wgs84_to_utm(105.0, 1.0 / 3600.0, 48, true);
        let d = ((a.x() - b.x()).powi(2) + (a.y() - b.y()).powi(2)).sqrt();
        assert!(d > 30.0 && d < 31.5);
    }

    #[test]
    fn test_utm_zone_for_lon() {
        assert_eq!(utm_zone_for_lon(-180.0), 1);
        assert_eq!(utm_zone_for_lon(0.0), 31);
        assert_eq!(utm_zone_for_lon(179.9), 60);
        assert_eq!(utm_zone_for_lon(180.0), 1);
    }

    #[test]
    fn test_is_valid_mercator() {
        assert!(is_valid_mercator(&Point::new(0.0, 0.0)));
        assert!(is_valid_mercator(&Point::new(
            EARTH_MERCATOR_MAX,
            EARTH_MERCATOR_MAX
        )));
        assert!(!is_valid_mercator(&Point::new(
            EARTH_MERCATOR_MAX + 1.0,
            0.0
        )));
    }
}
