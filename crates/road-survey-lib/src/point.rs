//! Coordinate primitives
//!
//! A [`Point`] is an immutable 2D coordinate tagged with its coordinate reference
//! system. [`Points`] is the row-wise batch form, optionally carrying one key per row
//! so results can be joined back to the table the coordinates came from.

use crate::{Error, Result, utils};
use geo::{Coord, LineString, Polygon};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of vertices used to approximate a circular buffer
const BUFFER_SEGMENTS: usize = 64;

/// Supported coordinate reference systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum Crs {
    /// EPSG:4326, longitude/latitude in degrees
    Wgs84,
    /// EPSG:3857, meters
    WebMercator,
    /// EPSG:326zz (north) / EPSG:327zz (south), meters
    Utm { zone: u8, north: bool },
    /// A local planar frame with no known relation to the Earth
    Local,
}

impl Crs {
    /// The UTM zone containing a WGS84 location
    pub fn utm_zone_for(lon: f64, lat: f64) -> Crs {
        Crs::Utm {
            zone: utils::utm_zone_for_lon(lon),
            north: lat >= 0.0,
        }
    }

    /// Resolve an EPSG code
    pub fn from_epsg(code: u32) -> Result<Crs> {
        match code {
            4326 => Ok(Crs::Wgs84),
            3857 => Ok(Crs::WebMercator),
            32601..=32660 => Ok(Crs::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(Error::UnsupportedProjection(format!("EPSG:{code}"))),
        }
    }

    /// EPSG code, if the system has one
    pub fn epsg(&self) -> Option<u32> {
        match *self {
            Crs::Wgs84 => Some(4326),
            Crs::WebMercator => Some(3857),
            Crs::Utm { zone, north: true } => Some(32600 + u32::from(zone)),
            Crs::Utm { zone, north: false } => Some(32700 + u32::from(zone)),
            Crs::Local => None,
        }
    }

    /// Whether coordinates are planar (distances are meaningful)
    pub fn is_planar(&self) -> bool {
        !matches!(self, Crs::Wgs84)
    }

    fn to_wgs84(self, x: f64, y: f64) -> Result<(f64, f64)> {
        let p = match self {
            Crs::Wgs84 => return Ok((x, y)),
            Crs::WebMercator => {
                let p = geo::Point::new(x, y);
                if !utils::is_valid_mercator(&p) {
                    return Err(Error::InvalidCoordinate { x, y });
                }
                utils::mercator_to_wgs84(x, y)
            }
            Crs::Utm { zone, north } => utils::utm_to_wgs84(x, y, zone, north),
            Crs::Local => return Err(Error::UnsupportedProjection(self.to_string())),
        };
        Ok((p.x(), p.y()))
    }

    fn from_wgs84(self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let p = match self {
            Crs::Wgs84 => return Ok((lon, lat)),
            Crs::WebMercator => utils::wgs84_to_mercator(lon, lat),
            Crs::Utm { zone, north } => utils::wgs84_to_utm(lon, lat, zone, north),
            Crs::Local => return Err(Error::UnsupportedProjection(self.to_string())),
        };
        Ok((p.x(), p.y()))
    }

    /// Reproject a raw coordinate pair from `self` into `target`
    pub(crate) fn convert(self, target: Crs, x: f64, y: f64) -> Result<(f64, f64)> {
        if self == target {
            return Ok((x, y));
        }
        let (lon, lat) = self.to_wgs84(x, y)?;
        target.from_wgs84(lon, lat)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "LOCAL"),
        }
    }
}

impl FromStr for Crs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Crs::Local);
        }
        let digits = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        let code: u32 = digits
            .parse()
            .map_err(|_| Error::UnsupportedProjection(trimmed.to_string()))?;
        Crs::from_epsg(code)
    }
}

impl TryFrom<String> for Crs {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

#[inline]
fn check_finite(x: f64, y: f64) -> Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidCoordinate { x, y })
    }
}

/// Euclidean distance between two raw coordinates
#[inline(always)]
pub(crate) fn planar_distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (bx - ax).hypot(by - ay)
}

fn circle(cx: f64, cy: f64, radius: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..=BUFFER_SEGMENTS)
        .map(|i| {
            // Close the ring on the exact first coordinate
            let angle = std::f64::consts::TAU * (i % BUFFER_SEGMENTS) as f64
                / BUFFER_SEGMENTS as f64;
            Coord {
                x: cx + radius * angle.cos(),
                y: cy + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::new(ring), Vec::new())
}

/// A single 2D coordinate tagged with its reference system
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "PointRecord")
)]
pub struct Point {
    x: f64,
    y: f64,
    crs: Crs,
}

impl Point {
    /// Create a point, rejecting NaN and infinite values
    pub fn new(x: f64, y: f64, crs: Crs) -> Result<Self> {
        check_finite(x, y)?;
        Ok(Self { x, y, crs })
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Return a new point reprojected into `target`
    pub fn transform(&self, target: Crs) -> Result<Point> {
        let (x, y) = self.crs.convert(target, self.x, self.y)?;
        Point::new(x, y, target)
    }

    /// Euclidean distance in the units of the shared planar CRS
    ///
    /// Both points must already be in the same CRS; mixing systems is an error
    /// rather than an implicit reprojection.
    pub fn distance(&self, other: &Point) -> Result<f64> {
        if self.crs != other.crs {
            return Err(Error::UnsupportedProjection(format!(
                "distance between {} and {}",
                self.crs, other.crs
            )));
        }
        Ok(planar_distance(self.x, self.y, other.x, other.y))
    }

    /// Circular polygon of `radius` (CRS units) centered on this point
    pub fn buffer(&self, radius: f64) -> Polygon<f64> {
        circle(self.x, self.y, radius.abs())
    }

    /// The point as a `geo` coordinate, dropping the CRS tag
    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// Unchecked wire form of [`Point`]
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct PointRecord {
    x: f64,
    y: f64,
    crs: Crs,
}

#[cfg(feature = "serde")]
impl TryFrom<PointRecord> for Point {
    type Error = Error;

    fn try_from(record: PointRecord) -> Result<Self> {
        Point::new(record.x, record.y, record.crs)
    }
}

/// A batch of coordinates in one CRS, with an optional key per row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "PointsRecord<K>")
)]
pub struct Points<K = ()> {
    coords: Vec<Coord<f64>>,
    keys: Option<Vec<K>>,
    crs: Crs,
}

/// Unchecked wire form of [`Points`]
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct PointsRecord<K> {
    coords: Vec<Coord<f64>>,
    keys: Option<Vec<K>>,
    crs: Crs,
}

#[cfg(feature = "serde")]
impl<K> TryFrom<PointsRecord<K>> for Points<K> {
    type Error = Error;

    fn try_from(record: PointsRecord<K>) -> Result<Self> {
        for c in &record.coords {
            check_finite(c.x, c.y)?;
        }
        match record.keys.as_ref().map(Vec::len) {
            Some(keys) if keys != record.coords.len() => {
                return Err(Error::KeyCountMismatch {
                    keys,
                    coords: record.coords.len(),
                });
            }
            _ => {}
        }
        Ok(Self {
            coords: record.coords,
            keys: record.keys,
            crs: record.crs,
        })
    }
}

impl<K> Points<K> {
    /// Create an unkeyed batch
    pub fn new(coords: Vec<(f64, f64)>, crs: Crs) -> Result<Self> {
        let coords = coords
            .into_iter()
            .map(|(x, y)| {
                check_finite(x, y)?;
                Ok(Coord { x, y })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            coords,
            keys: None,
            crs,
        })
    }

    /// Create a batch where each row carries a key
    pub fn with_keys(rows: Vec<(K, (f64, f64))>, crs: Crs) -> Result<Self> {
        let mut coords = Vec::with_capacity(rows.len());
        let mut keys = Vec::with_capacity(rows.len());
        for (key, (x, y)) in rows {
            check_finite(x, y)?;
            coords.push(Coord { x, y });
            keys.push(key);
        }
        Ok(Self {
            coords,
            keys: Some(keys),
            crs,
        })
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn coords(&self) -> &[Coord<f64>] {
        &self.coords
    }

    /// Key of a row, if the batch is keyed
    #[inline]
    pub fn key(&self, row: usize) -> Option<&K> {
        self.keys.as_ref()?.get(row)
    }

    #[inline]
    pub fn keys(&self) -> Option<&[K]> {
        self.keys.as_deref()
    }

    /// Row as a tagged [`Point`]
    pub fn get(&self, row: usize) -> Option<Point> {
        self.coords.get(row).map(|c| Point {
            x: c.x,
            y: c.y,
            crs: self.crs,
        })
    }

    /// Reproject every row into `target`, keeping keys and row order
    pub fn transform(&self, target: Crs) -> Result<Points<K>>
    where
        K: Clone,
    {
        let coords = self
            .coords
            .iter()
            .map(|c| {
                let (x, y) = self.crs.convert(target, c.x, c.y)?;
                check_finite(x, y)?;
                Ok(Coord { x, y })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Points {
            coords,
            keys: self.keys.clone(),
            crs: target,
        })
    }

    /// Distance from every row to `reference`
    pub fn distances_to(&self, reference: &Point) -> Result<Vec<f64>> {
        if reference.crs != self.crs {
            return Err(Error::UnsupportedProjection(format!(
                "distance between {} and {}",
                self.crs, reference.crs
            )));
        }
        Ok(self
            .coords
            .iter()
            .map(|c| planar_distance(c.x, c.y, reference.x, reference.y))
            .collect())
    }

    /// Row index closest to `reference`; ties resolve to the lowest row
    pub fn nearest(&self, reference: &Point) -> Result<Option<usize>> {
        let distances = self.distances_to(reference)?;
        Ok(distances
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (row, &d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((row, d)),
            })
            .map(|(row, _)| row))
    }

    /// Circular buffer around every row
    pub fn buffer(&self, radius: f64) -> Vec<Polygon<f64>> {
        self.coords
            .iter()
            .map(|c| circle(c.x, c.y, radius.abs()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains};

    #[test]
    fn test_point_rejects_non_finite() {
        assert!(matches!(
            Point::new(f64::NAN, 0.0, Crs::Local),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(Point::new(0.0, f64::INFINITY, Crs::Local).is_err());
        assert!(Point::new(1.0, 2.0, Crs::Local).is_ok());
    }

    #[test]
    fn test_crs_parsing() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("3857".parse::<Crs>().unwrap(), Crs::WebMercator);
        assert_eq!(
            "EPSG:32748".parse::<Crs>().unwrap(),
            Crs::Utm {
                zone: 48,
                north: false
            }
        );
        assert_eq!("local".parse::<Crs>().unwrap(), Crs::Local);
        assert!(matches!(
            "EPSG:2154".parse::<Crs>(),
            Err(Error::UnsupportedProjection(_))
        ));
        assert!("not-a-crs".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_display_roundtrip() {
        for crs in [
            Crs::Wgs84,
            Crs::WebMercator,
            Crs::Utm {
                zone: 50,
                north: true,
            },
            Crs::Local,
        ] {
            assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        }
    }

    #[test]
    fn test_transform_to_same_crs_is_identity() {
        let p = Point::new(3.0, 4.0, Crs::Local).unwrap();
        assert_eq!(p.transform(Crs::Local).unwrap(), p);
    }

    #[test]
    fn test_transform_local_is_unsupported() {
        let p = Point::new(3.0, 4.0, Crs::Local).unwrap();
        assert!(matches!(
            p.transform(Crs::Wgs84),
            Err(Error::UnsupportedProjection(_))
        ));
    }

    #[test]
    fn test_transform_wgs84_to_utm_and_back() {
        let p = Point::new(110.3695, -7.7956, Crs::Wgs84).unwrap();
        let utm = p.transform(Crs::utm_zone_for(p.x(), p.y())).unwrap();
        assert_eq!(
            utm.crs(),
            Crs::Utm {
                zone: 49,
                north: false
            }
        );
        let back = utm.transform(Crs::Wgs84).unwrap();
        assert!((back.x() - p.x()).abs() < 1e-7);
        assert!((back.y() - p.y()).abs() < 1e-7);
    }

    #[test]
    fn test_utm_to_mercator_goes_through_wgs84() {
        let p = Point::new(106.8, -6.2, Crs::Wgs84).unwrap();
        let merc_direct = p.transform(Crs::WebMercator).unwrap();
        let merc_via_utm = p
            .transform(Crs::from_epsg(32748).unwrap())
            .unwrap()
            .transform(Crs::WebMercator)
            .unwrap();
        assert!((merc_direct.x() - merc_via_utm.x()).abs() < 1e-3);
        assert!((merc_direct.y() - merc_via_utm.y()).abs() < 1e-3);
    }

    #[test]
    fn test_distance_requires_shared_crs() {
        let a = Point::new(0.0, 0.0, Crs::Local).unwrap();
        let b = Point::new(3.0, 4.0, Crs::Local).unwrap();
        assert_eq!(a.distance(&b).unwrap(), 5.0);

        let c = Point::new(3.0, 4.0, Crs::WebMercator).unwrap();
        assert!(a.distance(&c).is_err());
    }

    #[test]
    fn test_buffer_is_closed_circle() {
        let p = Point::new(10.0, 10.0, Crs::Local).unwrap();
        let poly = p.buffer(5.0);
        let ring = &poly.exterior().0;
        assert_eq!(ring.first(), ring.last());
        assert!(poly.contains(&geo::Point::new(12.0, 12.0)));
        assert!(!poly.contains(&geo::Point::new(16.0, 10.0)));
        // A 64-gon is slightly smaller than the true circle
        let area = poly.unsigned_area();
        let expected = std::f64::consts::PI * 25.0;
        assert!(area < expected && area > expected * 0.99);
    }

    #[test]
    fn test_points_nearest_breaks_ties_low() {
        let points: Points = Points::new(vec![(5.0, 0.0), (0.0, 5.0), (1.0, 1.0)], Crs::Local)
            .unwrap();
        let origin = Point::new(0.0, 0.0, Crs::Local).unwrap();
        assert_eq!(points.nearest(&origin).unwrap(), Some(2));

        let far = Point::new(10.0, 10.0, Crs::Local).unwrap();
        let tie: Points = Points::new(vec![(5.0, 0.0), (0.0, 5.0)], Crs::Local).unwrap();
        assert_eq!(tie.nearest(&far).unwrap(), Some(0));

        let empty: Points = Points::new(vec![], Crs::Local).unwrap();
        assert_eq!(empty.nearest(&origin).unwrap(), None);
    }

    #[test]
    fn test_points_transform_keeps_keys() {
        let points = Points::with_keys(
            vec![("a", (106.8, -6.2)), ("b", (106.9, -6.3))],
            Crs::Wgs84,
        )
        .unwrap();
        let utm = points.transform(Crs::from_epsg(32748).unwrap()).unwrap();
        assert_eq!(utm.len(), 2);
        assert_eq!(utm.key(0), Some(&"a"));
        assert_eq!(utm.key(1), Some(&"b"));
        assert!(utm.coords()[0].x > 100_000.0);
    }

    #[test]
    fn test_points_distances_row_wise() {
        let points: Points =
            Points::new(vec![(3.0, 4.0), (6.0, 8.0)], Crs::Local).unwrap();
        let origin = Point::new(0.0, 0.0, Crs::Local).unwrap();
        assert_eq!(points.distances_to(&origin).unwrap(), vec![5.0, 10.0]);
        assert_eq!(points.buffer(1.0).len(), 2);
        assert_eq!(points.get(1).unwrap().x(), 6.0);
    }

    #[test]
    fn test_points_reject_non_finite_rows() {
        let result: Result<Points> = Points::new(vec![(0.0, 0.0), (f64::NAN, 1.0)], Crs::Local);
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_point_deserialize_validates() {
        let point: Point = serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "crs": "LOCAL"}"#).unwrap();
        assert_eq!(point, Point::new(1.0, 2.0, Crs::Local).unwrap());

        // JSON has no NaN, so go through the wire form directly
        let record = PointRecord {
            x: f64::NAN,
            y: 0.0,
            crs: Crs::Local,
        };
        assert!(matches!(Point::try_from(record), Err(Error::InvalidCoordinate { .. })));
        assert!(serde_json::from_str::<Point>(r#"{"x": null, "y": 2.0, "crs": "LOCAL"}"#).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_points_deserialize_validates() {
        let json = r#"{"coords": [{"x": 0.0, "y": 0.0}, {"x": 3.0, "y": 4.0}], "keys": [7, 8], "crs": "LOCAL"}"#;
        let points: Points<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.key(1), Some(&8));

        let unkeyed: Points = serde_json::from_str(r#"{"coords": [{"x": 1.0, "y": 1.0}], "crs": "LOCAL"}"#).unwrap();
        assert_eq!(unkeyed.key(0), None);

        let short_keys = r#"{"coords": [{"x": 0.0, "y": 0.0}, {"x": 3.0, "y": 4.0}], "keys": [7], "crs": "LOCAL"}"#;
        let err = serde_json::from_str::<Points<u32>>(short_keys).unwrap_err();
        assert!(err.to_string().contains("Key count 1 does not match coordinate count 2"), "{err}");

        let record = PointsRecord::<()> {
            coords: vec![Coord { x: f64::INFINITY, y: 0.0 }],
            keys: None,
            crs: Crs::Local,
        };
        assert!(matches!(Points::try_from(record), Err(Error::InvalidCoordinate { .. })));
    }
}
