//! Line segments between consecutive route vertices

use crate::point::planar_distance;
use geo::{Coord, Rect};

/// One line segment of a route polyline, with the measures at both ends
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteSegment {
    /// Position of the segment in the route (segment `i` joins vertex `i` and `i + 1`)
    pub index: usize,
    pub start: Coord<f64>,
    pub end: Coord<f64>,
    pub start_measure: f64,
    pub end_measure: f64,
}

/// Where a point lands when projected onto a single segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentProjection {
    /// Closest point on the segment
    pub projected: Coord<f64>,
    /// Distance from the query point to `projected`
    pub distance: f64,
    /// Position of `projected` along the segment, 0.0 at `start`, 1.0 at `end`
    pub fraction: f64,
}

impl RouteSegment {
    pub fn new(
        index: usize,
        start: Coord<f64>,
        end: Coord<f64>,
        start_measure: f64,
        end_measure: f64,
    ) -> Self {
        Self {
            index,
            start,
            end,
            start_measure,
            end_measure,
        }
    }

    /// Planar length of the segment
    #[inline]
    pub fn length(&self) -> f64 {
        planar_distance(self.start.x, self.start.y, self.end.x, self.end.y)
    }

    /// True when both ends coincide
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Axis-aligned bounds of the segment
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        Rect::new(self.start, self.end)
    }

    /// Perpendicular projection of (x, y), clamped to the segment's endpoints
    #[inline]
    pub fn project(&self, x: f64, y: f64) -> SegmentProjection {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let len2 = dx * dx + dy * dy;

        if len2 == 0.0 {
            return SegmentProjection {
                projected: self.start,
                distance: planar_distance(x, y, self.start.x, self.start.y),
                fraction: 0.0,
            };
        }

        let t = (((x - self.start.x) * dx + (y - self.start.y) * dy) / len2).clamp(0.0, 1.0);
        // Snap the clamped ends exactly so vertex hits reproduce vertex coordinates
        let projected = if t == 0.0 {
            self.start
        } else if t == 1.0 {
            self.end
        } else {
            Coord {
                x: self.start.x + t * dx,
                y: self.start.y + t * dy,
            }
        };

        SegmentProjection {
            projected,
            distance: planar_distance(x, y, projected.x, projected.y),
            fraction: t,
        }
    }

    /// Measure at a projected point on this segment
    ///
    /// `m = m0 + (m1 - m0) * dist(start, projected) / dist(start, end)`; a
    /// degenerate segment yields its start measure.
    #[inline]
    pub fn interpolate_measure(&self, projected: Coord<f64>) -> f64 {
        let length = self.length();
        if length == 0.0 {
            return self.start_measure;
        }
        if projected == self.end {
            return self.end_measure;
        }
        let along = planar_distance(self.start.x, self.start.y, projected.x, projected.y);
        self.start_measure + (self.end_measure - self.start_measure) * (along / length)
    }
}
