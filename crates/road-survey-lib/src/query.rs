//! Batched route queries
//!
//! Queries run in two phases: a [`RouteQuery`] first declares which derived columns
//! are needed, then [`RouteQuery::execute`] projects every row of a [`Points`] batch
//! once (in parallel) and materializes only those columns. Row `i` of every column
//! is exactly what the single-point [`Route`] call returns for row `i`.

use crate::point::Points;
use crate::route::Route;
use crate::{Error, Result};
use rayon::prelude::*;
use smallvec::SmallVec;

/// A derived column a query can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Interpolated measure at the projected point
    Measure,
    /// Distance from the row to the route
    Distance,
    /// Coordinates of the projected point
    Projected,
    /// Index of the nearest segment
    SegmentIndex,
}

/// Query builder for one route
#[derive(Debug, Clone)]
pub struct RouteQuery<'r> {
    route: &'r Route,
    columns: SmallVec<[Column; 4]>,
}

/// Column-oriented result of a [`RouteQuery`], row-aligned with its input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionTable {
    rows: usize,
    measures: Option<Vec<f64>>,
    distances: Option<Vec<f64>>,
    projected: Option<Vec<(f64, f64)>>,
    segment_indices: Option<Vec<usize>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'r> RouteQuery<'r> {
    pub fn new(route: &'r Route) -> Self {
        Self {
            route,
            columns: SmallVec::new(),
        }
    }

    /// Request a column; requesting it twice has no further effect
    pub fn with(mut self, column: Column) -> Self {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        self
    }

    /// Request every column
    pub fn all(self) -> Self {
        self.with(Column::Measure)
            .with(Column::Distance)
            .with(Column::Projected)
            .with(Column::SegmentIndex)
    }

    #[inline]
    pub fn wants(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Run the query over a batch in the route's CRS
    ///
    /// # Errors
    /// [`Error::UnsupportedProjection`] if the batch is in another CRS and
    /// [`Error::PointNotProjectable`] if measures are requested on a route with no length.
    pub fn execute<K>(&self, points: &Points<K>) -> Result<ProjectionTable> {
        #[cfg(feature = "profiling")]
        profiling::scope!("route_query::execute");

        self.route.check_crs(points.crs())?;
        if self.wants(Column::Measure) && self.route.is_degenerate() {
            return Err(Error::PointNotProjectable {
                route: self.route.route_id().to_string(),
            });
        }

        let located: Vec<_> = points
            .coords()
            .par_iter()
            .map(|c| self.route.locate(c.x, c.y))
            .collect();

        let mut table = ProjectionTable {
            rows: located.len(),
            ..ProjectionTable::default()
        };

        for column in &self.columns {
            match column {
                Column::Measure => {
                    table.measures = Some(
                        located
                            .par_iter()
                            .map(|(idx, p)| self.route.segments()[*idx].interpolate_measure(p.projected))
                            .collect(),
                    );
                }
                Column::Distance => {
                    table.distances = Some(located.iter().map(|(_, p)| p.distance).collect());
                }
                Column::Projected => {
                    table.projected = Some(
                        located
                            .iter()
                            .map(|(_, p)| (p.projected.x, p.projected.y))
                            .collect(),
                    );
                }
                Column::SegmentIndex => {
                    table.segment_indices = Some(located.iter().map(|(idx, _)| *idx).collect());
                }
            }
        }

        tracing::trace!(
            route = self.route.route_id(),
            rows = table.rows,
            columns = self.columns.len(),
            "route query executed"
        );

        Ok(table)
    }
}

impl ProjectionTable {
    /// Number of rows
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    #[inline]
    pub fn measures(&self) -> Option<&[f64]> {
        self.measures.as_deref()
    }

    #[inline]
    pub fn distances(&self) -> Option<&[f64]> {
        self.distances.as_deref()
    }

    #[inline]
    pub fn projected(&self) -> Option<&[(f64, f64)]> {
        self.projected.as_deref()
    }

    #[inline]
    pub fn segment_indices(&self) -> Option<&[usize]> {
        self.segment_indices.as_deref()
    }

    pub fn into_measures(self) -> Option<Vec<f64>> {
        self.measures
    }

    pub fn into_distances(self) -> Option<Vec<f64>> {
        self.distances
    }
}
