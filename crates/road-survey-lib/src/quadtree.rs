//! Quadtree spatial index over route segments
//!
//! The tree is rooted at the route's bounding box. Each segment is stored at the
//! deepest node whose bounds fully contain it; segments straddling a node's
//! midlines stay at that node. Nearest-segment search walks the tree closest node
//! first and only prunes nodes that are strictly farther than the current best, so
//! the answer (including the lowest-index tie-break) is the same as a full scan.

use crate::config::IndexConfig;
use crate::segment::{RouteSegment, SegmentProjection};
use geo::{Coord, Rect};

/// Relative slack added to pruning distances so rounding never discards a node
/// holding an equally-near segment
const PRUNE_EPSILON: f64 = 1e-9;

/// Spatial index of a route's segments, referenced by segment index
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    root: Option<IndexNode>,
    len: usize,
}

/// A single node in the segment quadtree
#[derive(Debug, Clone)]
struct IndexNode {
    bounding_box: Rect<f64>,
    /// Depth level in the tree (0 = root)
    level: u32,
    /// Segments stored at this node (indices into the route's segment list)
    segments: Vec<usize>,
    /// Child nodes (NW, NE, SW, SE) if subdivided
    children: Option<Box<[IndexNode; 4]>>,
}

/// Best candidate found so far during a nearest search
#[derive(Clone, Copy, Debug)]
struct Candidate {
    index: usize,
    projection: SegmentProjection,
}

impl Candidate {
    #[inline]
    fn beats(&self, other: &Candidate) -> bool {
        self.projection.distance < other.projection.distance
            || (self.projection.distance == other.projection.distance
                && self.index < other.index)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SegmentIndex {
    /// Build an index over `segments`
    pub fn build(segments: &[RouteSegment], config: &IndexConfig) -> Self {
        if segments.is_empty() {
            return Self { root: None, len: 0 };
        }

        let bounds = segments
            .iter()
            .map(RouteSegment::bounding_box)
            .reduce(|acc, bbox| union(acc, bbox))
            .unwrap_or_else(|| segments[0].bounding_box());

        let mut root = IndexNode::new(bounds, 0);
        for segment in segments {
            root.insert(segment.index, segment.bounding_box(), segments, config);
        }

        tracing::trace!(
            segments = segments.len(),
            depth = root.depth(),
            "built segment index"
        );

        Self {
            root: Some(root),
            len: segments.len(),
        }
    }

    /// Number of indexed segments
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest segment to (x, y); ties resolve to the lowest segment index
    pub fn nearest(
        &self,
        segments: &[RouteSegment],
        x: f64,
        y: f64,
    ) -> Option<(usize, SegmentProjection)> {
        let root = self.root.as_ref()?;
        let mut best: Option<Candidate> = None;
        root.nearest(segments, x, y, &mut best);
        best.map(|c| (c.index, c.projection))
    }

    /// Indices of segments whose bounds touch the square of half-width `radius`
    /// around (x, y), ascending
    pub fn within(&self, segments: &[RouteSegment], x: f64, y: f64, radius: f64) -> Vec<usize> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            let query = Rect::new(
                Coord {
                    x: x - radius,
                    y: y - radius,
                },
                Coord {
                    x: x + radius,
                    y: y + radius,
                },
            );
            root.query(segments, query, &mut results);
        }
        results.sort_unstable();
        results
    }
}

impl IndexNode {
    fn new(bounding_box: Rect<f64>, level: u32) -> Self {
        Self {
            bounding_box,
            level,
            segments: Vec::new(),
            children: None,
        }
    }

    fn depth(&self) -> u32 {
        match &self.children {
            Some(children) => children.iter().map(IndexNode::depth).max().unwrap_or(self.level),
            None => self.level,
        }
    }

    /// Subdivide this node into 4 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return; // Already subdivided
        }

        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        let mid_x = (min.x + max.x) / 2.0;
        let mid_y = (min.y + max.y) / 2.0;
        let level = self.level + 1;

        let nw = IndexNode::new(
            Rect::new(Coord { x: min.x, y: mid_y }, Coord { x: mid_x, y: max.y }),
            level,
        );
        let ne = IndexNode::new(
            Rect::new(Coord { x: mid_x, y: mid_y }, Coord { x: max.x, y: max.y }),
            level,
        );
        let sw = IndexNode::new(
            Rect::new(Coord { x: min.x, y: min.y }, Coord { x: mid_x, y: mid_y }),
            level,
        );
        let se = IndexNode::new(
            Rect::new(Coord { x: mid_x, y: min.y }, Coord { x: max.x, y: mid_y }),
            level,
        );

        self.children = Some(Box::new([nw, ne, sw, se]));
    }

    /// The single child quadrant fully containing `bbox`, if any
    fn child_for(&self, bbox: Rect<f64>) -> Option<usize> {
        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        let mid_x = (min.x + max.x) / 2.0;
        let mid_y = (min.y + max.y) / 2.0;

        // Child bounds are closed, so a box lying on a midline fits the west/north side
        let west = bbox.max().x <= mid_x;
        let east = !west && bbox.min().x >= mid_x;
        let north = bbox.min().y >= mid_y;
        let south = !north && bbox.max().y <= mid_y;

        match (west, east, north, south) {
            (true, _, true, _) => Some(0), // NW
            (_, true, true, _) => Some(1), // NE
            (true, _, _, true) => Some(2), // SW
            (_, true, _, true) => Some(3), // SE
            _ => None,                     // Spans a midline
        }
    }

    fn insert(
        &mut self,
        index: usize,
        bbox: Rect<f64>,
        segments: &[RouteSegment],
        config: &IndexConfig,
    ) {
        if self.children.is_some() {
            match (self.child_for(bbox), &mut self.children) {
                (Some(quadrant), Some(children)) => {
                    children[quadrant].insert(index, bbox, segments, config)
                }
                _ => self.segments.push(index),
            }
            return;
        }

        self.segments.push(index);

        if self.segments.len() > config.max_segments_per_node && self.level < config.max_depth {
            self.subdivide();
            // Push down everything that fits a single child
            let stored = std::mem::take(&mut self.segments);
            for idx in stored {
                let seg_bbox = segments[idx].bounding_box();
                match self.child_for(seg_bbox) {
                    Some(quadrant) => {
                        if let Some(children) = &mut self.children {
                            children[quadrant].insert(idx, seg_bbox, segments, config);
                        }
                    }
                    None => self.segments.push(idx),
                }
            }
        }
    }

    fn nearest(
        &self,
        segments: &[RouteSegment],
        x: f64,
        y: f64,
        best: &mut Option<Candidate>,
    ) {
        for &idx in &self.segments {
            let candidate = Candidate {
                index: idx,
                projection: segments[idx].project(x, y),
            };
            if best.as_ref().is_none_or(|current| candidate.beats(current)) {
                *best = Some(candidate);
            }
        }

        if let Some(children) = &self.children {
            let mut order: [(f64, usize); 4] = [(0.0, 0); 4];
            for (slot, (i, child)) in order.iter_mut().zip(children.iter().enumerate()) {
                *slot = (rect_distance(child.bounding_box, x, y), i);
            }
            order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for (distance, i) in order {
                if let Some(current) = best.as_ref() {
                    let limit = current.projection.distance * (1.0 + PRUNE_EPSILON) + PRUNE_EPSILON;
                    if distance > limit {
                        continue;
                    }
                }
                children[i].nearest(segments, x, y, best);
            }
        }
    }

    fn query(&self, segments: &[RouteSegment], query: Rect<f64>, results: &mut Vec<usize>) {
        if !intersects(self.bounding_box, query) {
            return;
        }
        results.extend(
            self.segments
                .iter()
                .copied()
                .filter(|&idx| intersects(segments[idx].bounding_box(), query)),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(segments, query, results);
            }
        }
    }
}

/// Smallest rectangle containing both inputs
#[inline]
fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Distance from (x, y) to the closest point of `rect` (0 inside)
#[inline]
fn rect_distance(rect: Rect<f64>, x: f64, y: f64) -> f64 {
    let dx = (rect.min().x - x).max(0.0).max(x - rect.max().x);
    let dy = (rect.min().y - y).max(0.0).max(y - rect.max().y);
    dx.hypot(dy)
}

#[inline]
fn intersects(a: Rect<f64>, b: Rect<f64>) -> bool {
    !(a.max().x < b.min().x || a.min().x > b.max().x || a.max().y < b.min().y || a.min().y > b.max().y)
}
