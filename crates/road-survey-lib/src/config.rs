//! Configuration for route indexing and consistency checks
//!
//! Nothing here is global: callers build these structs (or deserialize them with
//! the `serde` feature) and pass them into [`Route`](crate::Route) construction
//! and into each validation run.

use crate::survey::LaneSide;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the per-route segment quadtree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct IndexConfig {
    /// A node holding more segments than this is subdivided. Default: 16
    pub max_segments_per_node: usize,
    /// Maximum depth of the tree. Default: 16
    pub max_depth: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_segments_per_node: 16,
            max_depth: 16,
        }
    }
}

/// Direction in which a lane's stations run relative to the route's measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Measures grow as stations grow
    Forward,
    /// Measures shrink as stations grow
    Reverse,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        })
    }
}

/// Expected survey direction for each side of the road
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ExpectedDirection {
    pub left: Direction,
    pub right: Direction,
}

impl ExpectedDirection {
    pub fn for_side(&self, side: LaneSide) -> Direction {
        match side {
            LaneSide::Left => self.left,
            LaneSide::Right => self.right,
        }
    }
}

impl Default for ExpectedDirection {
    fn default() -> Self {
        Self {
            left: Direction::Forward,
            right: Direction::Forward,
        }
    }
}

/// Thresholds used by the consistency checks
///
/// Distances are in the route's CRS units; stations are converted to measure
/// units with `station_to_measure_factor` before comparison.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CheckConfig {
    /// Maximum distance between a survey coordinate and the route. Default: 30.0
    pub distance_tolerance: f64,
    /// Maximum disagreement between a station and the projected measure. Default: 50.0
    pub station_tolerance: f64,
    /// Multiplier turning a station into route measure units. Default: 1.0
    pub station_to_measure_factor: f64,
    /// Expected from→to length of segment events, in station units. Default: 100.0
    pub segment_length: f64,
    /// Allowed deviation from `segment_length`. Default: 1.0
    pub segment_length_tolerance: f64,
    /// Allowed gap or overlap between consecutive segment events. Default: 0.5
    pub gap_tolerance: f64,
    /// Allowed difference between the last station and the route's end measure. Default: 100.0
    pub coverage_tolerance: f64,
    /// Measure decrease tolerated before a lane is reported as non-monotonic. Default: 0.0
    pub monotonic_tolerance: f64,
    /// Expected direction of each road side. Default: both forward
    pub expected_direction: ExpectedDirection,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: 30.0,
            station_tolerance: 50.0,
            station_to_measure_factor: 1.0,
            segment_length: 100.0,
            segment_length_tolerance: 1.0,
            gap_tolerance: 0.5,
            coverage_tolerance: 100.0,
            monotonic_tolerance: 0.0,
            expected_direction: ExpectedDirection::default(),
        }
    }
}

impl CheckConfig {
    /// Station converted into route measure units
    #[inline]
    pub fn station_to_measure(&self, sta: f64) -> f64 {
        sta * self.station_to_measure_factor
    }
}
