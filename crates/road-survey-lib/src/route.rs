//! Route storage and linear referencing queries
//!
//! A [`Route`] is a road centerline: an ordered polyline whose vertices carry a
//! measure (distance-along-route) value. It is built once per validation run and is
//! read-only afterwards, so it can be shared across threads behind an `Arc`.

use crate::config::IndexConfig;
use crate::point::{Crs, Point, Points, planar_distance};
use crate::quadtree::SegmentIndex;
use crate::query::{Column, RouteQuery};
use crate::segment::{RouteSegment, SegmentProjection};
use crate::{Error, Result};
use geo::{Coord, Rect};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One vertex of a route polyline
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub measure: f64,
    pub sequence: u32,
}

impl Vertex {
    pub fn new(x: f64, y: f64, measure: f64, sequence: u32) -> Self {
        Self {
            x,
            y,
            measure,
            sequence,
        }
    }
}

/// Descriptive attributes carried over from the route source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RouteMetadata {
    /// Road status (e.g. national, provincial)
    pub status: Option<String>,
    /// Road function (e.g. arterial, collector)
    pub function: Option<String>,
}

/// Nearest-segment result for a query point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Index of the closest segment (segment `i` joins vertex `i` and `i + 1`)
    pub segment_index: usize,
    /// Distance from the query point to the route
    pub distance: f64,
    /// Interpolated measure at the projected point
    pub measure: f64,
    /// Closest point on the route
    pub projected: (f64, f64),
    /// Position of the projected point along its segment (0.0 to 1.0)
    pub fraction: f64,
}

/// A road centerline with measure values, ready for linear referencing
#[derive(Clone, Debug)]
pub struct Route {
    route_id: String,
    crs: Crs,
    /// Vertices ordered by sequence index
    vertices: Vec<Vertex>,
    /// Consecutive vertex pairs; a single-vertex route has one degenerate segment
    segments: Vec<RouteSegment>,
    index: SegmentIndex,
    metadata: RouteMetadata,
    /// Precomputed bounding box in CRS units
    bounding_box: Rect<f64>,
    /// Cached planar length (computed once during construction)
    cached_length: f64,
    cached_min_measure: f64,
    cached_max_measure: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Build a route from its vertices
    ///
    /// Vertices are ordered by sequence index. Measures are not required to be
    /// monotonic: a malformed route still constructs so its defects can be reported.
    ///
    /// # Errors
    /// [`Error::EmptyRoute`] with no vertices, [`Error::InvalidCoordinate`] or
    /// [`Error::InvalidMeasure`] on non-finite values.
    pub fn new(
        route_id: impl Into<String>,
        crs: Crs,
        mut vertices: Vec<Vertex>,
        metadata: RouteMetadata,
        index_config: &IndexConfig,
    ) -> Result<Arc<Self>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("route::new");

        let route_id = route_id.into();
        if vertices.is_empty() {
            return Err(Error::EmptyRoute);
        }

        for vertex in &vertices {
            if !(vertex.x.is_finite() && vertex.y.is_finite()) {
                return Err(Error::InvalidCoordinate {
                    x: vertex.x,
                    y: vertex.y,
                });
            }
            if !vertex.measure.is_finite() {
                return Err(Error::InvalidMeasure {
                    sequence: vertex.sequence,
                    measure: vertex.measure,
                });
            }
        }

        // Stable, so duplicated sequence indices keep their input order
        vertices.sort_by_key(|v| v.sequence);

        let segments = Self::build_segments(&vertices);
        let index = SegmentIndex::build(&segments, index_config);

        let (bounding_box, cached_length, cached_min_measure, cached_max_measure) =
            Self::compute_metadata(&vertices, &segments);

        let route = Route {
            route_id,
            crs,
            vertices,
            segments,
            index,
            metadata,
            bounding_box,
            cached_length,
            cached_min_measure,
            cached_max_measure,
        };

        tracing::debug!(
            route = %route.route_id,
            vertices = route.vertices.len(),
            length = route.cached_length,
            "route constructed"
        );
        if !route.is_monotonic() {
            tracing::warn!(
                route = %route.route_id,
                "route measures decrease at {} vertices",
                route.non_monotonic_vertices().len()
            );
        }

        Ok(Arc::new(route))
    }

    /// Build a route from (x, y, measure) triples in sequence order
    pub fn from_coords(
        route_id: impl Into<String>,
        crs: Crs,
        coords: &[(f64, f64, f64)],
        metadata: RouteMetadata,
    ) -> Result<Arc<Self>> {
        let vertices = coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y, m))| Vertex::new(x, y, m, i as u32))
            .collect();
        Self::new(route_id, crs, vertices, metadata, &IndexConfig::default())
    }

    fn build_segments(vertices: &[Vertex]) -> Vec<RouteSegment> {
        let coord = |v: &Vertex| Coord { x: v.x, y: v.y };
        if let [only] = vertices {
            return vec![RouteSegment::new(
                0,
                coord(only),
                coord(only),
                only.measure,
                only.measure,
            )];
        }
        vertices
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                RouteSegment::new(
                    i,
                    coord(&pair[0]),
                    coord(&pair[1]),
                    pair[0].measure,
                    pair[1].measure,
                )
            })
            .collect()
    }

    /// Compute all metadata in a single pass
    ///
    /// Returns (bounding_box, length, min_measure, max_measure)
    fn compute_metadata(vertices: &[Vertex], segments: &[RouteSegment]) -> (Rect<f64>, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut min_m = f64::INFINITY;
        let mut max_m = f64::NEG_INFINITY;

        for v in vertices {
            min_x = min_x.min(v.x);
            min_y = min_y.min(v.y);
            max_x = max_x.max(v.x);
            max_y = max_y.max(v.y);
            min_m = min_m.min(v.measure);
            max_m = max_m.max(v.measure);
        }

        let length = segments.iter().map(RouteSegment::length).sum();
        let bounding_box = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });

        (bounding_box, length, min_m, max_m)
    }

    #[inline]
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    #[inline]
    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }

    /// Road status from the route source
    #[inline]
    pub fn status(&self) -> Option<&str> {
        self.metadata.status.as_deref()
    }

    /// Road function from the route source
    #[inline]
    pub fn function(&self) -> Option<&str> {
        self.metadata.function.as_deref()
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// Planar length of the polyline in CRS units
    #[inline]
    pub fn length(&self) -> f64 {
        self.cached_length
    }

    /// Maximum measure over all vertices
    #[inline]
    pub fn max_measure(&self) -> f64 {
        self.cached_max_measure
    }

    /// Minimum measure over all vertices
    #[inline]
    pub fn min_measure(&self) -> f64 {
        self.cached_min_measure
    }

    /// True when every segment has zero length, so no measure can be interpolated
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.cached_length == 0.0
    }

    /// Vertex positions (in sequence order) whose measure is lower than the previous vertex's
    pub fn non_monotonic_vertices(&self) -> Vec<usize> {
        self.vertices
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1].measure < pair[0].measure)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Vertex positions (in sequence order) repeating the previous vertex's sequence index
    pub fn duplicate_sequences(&self) -> Vec<usize> {
        self.vertices
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1].sequence == pair[0].sequence)
            .map(|(i, _)| i + 1)
            .collect()
    }

    #[inline]
    pub fn is_monotonic(&self) -> bool {
        self.vertices.windows(2).all(|p| p[1].measure >= p[0].measure)
    }

    /// Nearest segment via the spatial index
    #[inline]
    pub(crate) fn locate(&self, x: f64, y: f64) -> (usize, SegmentProjection) {
        self.index
            .nearest(&self.segments, x, y)
            .unwrap_or_else(|| (0, self.segments[0].project(x, y)))
    }

    /// Nearest segment via a full scan of all segments
    pub fn project_linear(&self, x: f64, y: f64) -> Result<Projection> {
        let mut best: Option<(usize, SegmentProjection)> = None;
        for segment in &self.segments {
            let p = segment.project(x, y);
            match best {
                Some((_, b)) if b.distance <= p.distance => {}
                _ => best = Some((segment.index, p)),
            }
        }
        let (idx, p) = best.unwrap_or_else(|| (0, self.segments[0].project(x, y)));
        self.to_projection(idx, p)
    }

    pub(crate) fn to_projection(&self, idx: usize, p: SegmentProjection) -> Result<Projection> {
        if self.is_degenerate() {
            return Err(Error::PointNotProjectable {
                route: self.route_id.clone(),
            });
        }
        Ok(Projection {
            segment_index: idx,
            distance: p.distance,
            measure: self.segments[idx].interpolate_measure(p.projected),
            projected: (p.projected.x, p.projected.y),
            fraction: p.fraction,
        })
    }

    /// Full nearest-segment projection of (x, y)
    pub fn project(&self, x: f64, y: f64) -> Result<Projection> {
        let (idx, p) = self.locate(x, y);
        self.to_projection(idx, p)
    }

    /// Minimum distance from (x, y) to the polyline
    pub fn distance_to_point(&self, x: f64, y: f64) -> f64 {
        self.locate(x, y).1.distance
    }

    /// Measure interpolated at the projection of (x, y)
    ///
    /// # Errors
    /// [`Error::PointNotProjectable`] when the route has no length.
    pub fn measure_at_point(&self, x: f64, y: f64) -> Result<f64> {
        self.project(x, y).map(|p| p.measure)
    }

    /// [`Route::distance_to_point`] for a tagged point in the route's CRS
    pub fn distance_to(&self, point: &Point) -> Result<f64> {
        self.check_crs(point.crs())?;
        Ok(self.distance_to_point(point.x(), point.y()))
    }

    /// [`Route::measure_at_point`] for a tagged point in the route's CRS
    pub fn measure_at(&self, point: &Point) -> Result<f64> {
        self.check_crs(point.crs())?;
        self.measure_at_point(point.x(), point.y())
    }

    /// Batched [`Route::measure_at_point`]; row `i` equals the single-point call on row `i`
    pub fn measure_at_points<K>(&self, points: &Points<K>) -> Result<Vec<f64>> {
        let table = RouteQuery::new(self).with(Column::Measure).execute(points)?;
        Ok(table.into_measures().unwrap_or_default())
    }

    /// Batched [`Route::distance_to_point`]
    pub fn distance_to_points<K>(&self, points: &Points<K>) -> Result<Vec<f64>> {
        let table = RouteQuery::new(self).with(Column::Distance).execute(points)?;
        Ok(table.into_distances().unwrap_or_default())
    }

    /// Segments whose bounds come within `radius` of (x, y)
    pub fn segments_near(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        self.index.within(&self.segments, x, y, radius)
    }

    /// Distance from the start of the polyline to the projection of (x, y),
    /// independent of the stored measures
    pub fn chainage_at_point(&self, x: f64, y: f64) -> f64 {
        let (idx, p) = self.locate(x, y);
        let before: f64 = self.segments[..idx].iter().map(RouteSegment::length).sum();
        let start = self.segments[idx].start;
        before + planar_distance(start.x, start.y, p.projected.x, p.projected.y)
    }

    /// A copy of the route reprojected into `target`
    pub fn transform(&self, target: Crs, index_config: &IndexConfig) -> Result<Arc<Route>> {
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let (x, y) = self.crs.convert(target, v.x, v.y)?;
                Ok(Vertex { x, y, ..*v })
            })
            .collect::<Result<Vec<_>>>()?;
        Route::new(
            self.route_id.clone(),
            target,
            vertices,
            self.metadata.clone(),
            index_config,
        )
    }

    pub(crate) fn check_crs(&self, crs: Crs) -> Result<()> {
        if crs == self.crs {
            Ok(())
        } else {
            Err(Error::UnsupportedProjection(format!(
                "query in {crs} against route {} in {}",
                self.route_id, self.crs
            )))
        }
    }
}
