//! Consistency checks run against one road's survey submission
//!
//! Each [`Check`] reads the shared [`CheckContext`] and appends findings to the run's
//! [`ValidationResult`]. A check that detects a problem records it and keeps going, so a
//! single bad row never hides the rest. Errors returned from [`Check::run`] are
//! operational failures (bad geometry, unsupported CRS), not survey problems.
//!
//! Survey coordinates are projected onto the route once, when the context is built,
//! and every geometric check reads the same per-row projections.

mod direction;
mod geometry;
mod identity;
mod stations;

pub use direction::{DirectionCheck, MonotonicSurveyCheck};
pub use geometry::{DistanceToRouteCheck, RouteMonotonicCheck, StationMeasureCheck};
pub use identity::{DuplicateKeyCheck, RoadIdCheck};
pub use stations::{CoverageCheck, GapOverlapCheck, StationRangeCheck};

use crate::config::{CheckConfig, Direction};
use crate::message::IgnoreSet;
use crate::query::{Column, RouteQuery};
use crate::result::ValidationResult;
use crate::route::Route;
use crate::survey::{LaneCode, SurveyTable};
use crate::Result;
use std::fmt;

/// A named consistency rule
pub trait Check: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Append this check's findings for `ctx` to `result`
    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()>;
}

/// Where a survey row landed on the route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowProjection {
    pub distance: f64,
    /// `None` when the route has no length to interpolate along
    pub measure: Option<f64>,
}

/// Everything a check may read during one run
#[derive(Debug)]
pub struct CheckContext<'a> {
    route: &'a Route,
    table: &'a SurveyTable,
    config: &'a CheckConfig,
    projections: Vec<Option<RowProjection>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> CheckContext<'a> {
    /// Build the context, projecting every survey coordinate onto the route
    ///
    /// Coordinates are transformed into the route's CRS first.
    ///
    /// # Errors
    /// [`Error::InvalidCoordinate`](crate::Error::InvalidCoordinate) for non-finite survey
    /// coordinates and [`Error::UnsupportedProjection`](crate::Error::UnsupportedProjection)
    /// when the table's CRS cannot be transformed into the route's.
    pub fn new(route: &'a Route, table: &'a SurveyTable, config: &'a CheckConfig) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("check_context::new");

        let mut points = table.points()?;
        if points.crs() != route.crs() {
            points = points.transform(route.crs())?;
        }

        let mut query = RouteQuery::new(route).with(Column::Distance);
        if route.is_degenerate() {
            tracing::warn!(
                route = route.route_id(),
                "route has no length, measure checks will be skipped"
            );
        } else {
            query = query.with(Column::Measure);
        }
        let table_out = query.execute(&points)?;

        let mut projections = vec![None; table.len()];
        if let (Some(rows), Some(distances)) = (points.keys(), table_out.distances()) {
            let measures = table_out.measures();
            for (i, &row) in rows.iter().enumerate() {
                projections[row] = Some(RowProjection {
                    distance: distances[i],
                    measure: measures.map(|m| m[i]),
                });
            }
        }

        Ok(Self {
            route,
            table,
            config,
            projections,
        })
    }

    #[inline]
    pub fn route(&self) -> &Route {
        self.route
    }

    #[inline]
    pub fn table(&self) -> &SurveyTable {
        self.table
    }

    #[inline]
    pub fn config(&self) -> &CheckConfig {
        self.config
    }

    /// Projection of survey row `row`, `None` if the row has no coordinate
    #[inline]
    pub fn projection(&self, row: usize) -> Option<&RowProjection> {
        self.projections.get(row).and_then(Option::as_ref)
    }

    /// Measured rows of one lane in station order, as `(row, measure)`
    pub(crate) fn lane_measures(&self, rows: &[usize]) -> Vec<(usize, f64)> {
        rows.iter()
            .filter_map(|&row| {
                self.projection(row)
                    .and_then(|p| p.measure)
                    .map(|m| (row, m))
            })
            .collect()
    }
}

/// Majority direction of a measure sequence, `None` when rises and falls tie
pub(crate) fn trend(measures: &[(usize, f64)]) -> Option<Direction> {
    let (mut up, mut down) = (0usize, 0usize);
    for pair in measures.windows(2) {
        if pair[1].1 > pair[0].1 {
            up += 1;
        } else if pair[1].1 < pair[0].1 {
            down += 1;
        }
    }
    match up.cmp(&down) {
        std::cmp::Ordering::Greater => Some(Direction::Forward),
        std::cmp::Ordering::Less => Some(Direction::Reverse),
        std::cmp::Ordering::Equal => None,
    }
}

pub(crate) fn lane_name(lane: Option<LaneCode>) -> String {
    match lane {
        Some(code) => code.to_string(),
        None => "(no lane)".to_string(),
    }
}

/// Ordered list of checks run against one road
pub struct SurveyValidator {
    checks: Vec<Box<dyn Check>>,
}

impl fmt::Debug for SurveyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveyValidator")
            .field("checks", &self.names())
            .finish()
    }
}

/// Road id, duplicates, station range, route monotonic, distance, station/measure,
/// monotonic survey, direction, gap/overlap and coverage
impl Default for SurveyValidator {
    fn default() -> Self {
        Self::new()
            .with_check(RoadIdCheck)
            .with_check(DuplicateKeyCheck)
            .with_check(StationRangeCheck)
            .with_check(RouteMonotonicCheck)
            .with_check(DistanceToRouteCheck)
            .with_check(StationMeasureCheck)
            .with_check(MonotonicSurveyCheck)
            .with_check(DirectionCheck)
            .with_check(GapOverlapCheck)
            .with_check(CoverageCheck)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SurveyValidator {
    /// A validator with no checks
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn with_check<C: Check + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check in order against `result`
    pub fn run(
        &self,
        route: &Route,
        table: &SurveyTable,
        config: &CheckConfig,
        result: &mut ValidationResult,
    ) -> Result<()> {
        let ctx = CheckContext::new(route, table, config)?;
        for check in &self.checks {
            #[cfg(feature = "profiling")]
            profiling::scope!("check", check.name());

            let before = result.len();
            check.run(&ctx, result)?;
            tracing::debug!(
                owner = result.owner(),
                check = check.name(),
                findings = result.len() - before,
                "check finished"
            );
        }
        Ok(())
    }

    /// Fresh result owned by the route's id, filled by [`SurveyValidator::run`]
    pub fn validate(
        &self,
        route: &Route,
        table: &SurveyTable,
        config: &CheckConfig,
        ignore: IgnoreSet,
    ) -> Result<ValidationResult> {
        let mut result = ValidationResult::new(route.route_id(), ignore);
        self.run(route, table, config, &mut result)?;
        Ok(result)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::message::Severity;
    use crate::point::Crs;
    use crate::result::Status;
    use crate::route::RouteMetadata;
    use crate::survey::{Position, SurveyEvent};

    #[test]
    fn test_trend() {
        assert_eq!(trend(&[(0, 0.0), (1, 10.0), (2, 5.0), (3, 20.0)]), Some(Direction::Forward));
        assert_eq!(trend(&[(0, 30.0), (1, 10.0)]), Some(Direction::Reverse));
        assert_eq!(trend(&[(0, 30.0), (1, 30.0)]), None);
        assert_eq!(trend(&[]), None);
    }

    #[test]
    fn test_context_projects_rows() {
        let route = north_route();
        let table = SurveyTable::new(
            Crs::Local,
            vec![
                point(0.0, 5.0, 50.0),
                SurveyEvent::new("R1", Position::Point { sta: 10.0 }),
            ],
        );
        let config = CheckConfig::default();
        let ctx = CheckContext::new(&route, &table, &config).unwrap();
        let p = ctx.projection(0).unwrap();
        assert!((p.distance - 5.0).abs() < 1e-9);
        assert!((p.measure.unwrap() - 50.0).abs() < 1e-9);
        assert!(ctx.projection(1).is_none());
        assert!(ctx.projection(7).is_none());
    }

    #[test]
    fn test_context_without_measures_on_zero_length_route() {
        let route = Route::from_coords("R1", Crs::Local, &[(0.0, 0.0, 0.0)], RouteMetadata::default()).unwrap();
        let table = SurveyTable::new(Crs::Local, vec![point(0.0, 3.0, 4.0)]);
        let config = CheckConfig::default();
        let ctx = CheckContext::new(&route, &table, &config).unwrap();
        let p = ctx.projection(0).unwrap();
        assert_eq!(p.distance, 5.0);
        assert_eq!(p.measure, None);
    }

    #[test]
    fn test_context_rejects_untransformable_table() {
        let route = north_route();
        let table = SurveyTable::new(Crs::Wgs84, vec![point(0.0, 106.8, -6.2)]);
        let config = CheckConfig::default();
        assert!(CheckContext::new(&route, &table, &config).is_err());
    }

    #[test]
    fn test_default_order() {
        assert_eq!(
            SurveyValidator::default().names(),
            vec![
                "road_id",
                "duplicate_key",
                "station_range",
                "route_monotonic",
                "distance_to_route",
                "station_measure",
                "monotonic_survey",
                "direction",
                "gap_overlap",
                "coverage",
            ]
        );
    }

    #[test]
    fn test_clean_submission_is_verified() {
        let route = north_route();
        let events = (0..10)
            .flat_map(|i| {
                let from = i as f64 * 100.0;
                [segment(from, from + 100.0, "L1"), segment(from, from + 100.0, "R1")]
            })
            .collect();
        let table = SurveyTable::new(Crs::Local, events);
        let result = SurveyValidator::default()
            .validate(&route, &table, &CheckConfig::default(), IgnoreSet::NONE)
            .unwrap();
        assert_eq!(result.status(), Status::Verified, "{:?}", result.all_messages());
        assert_eq!(result.owner(), "R1");
    }

    #[test]
    fn test_custom_validator_runs_only_its_checks() {
        let route = north_route();
        let table = SurveyTable::new(Crs::Local, vec![point(0.0, 500.0, 0.0)]);
        let validator = SurveyValidator::new().with_check(CoverageCheck);
        let result = validator
            .validate(&route, &table, &CheckConfig::default(), IgnoreSet::NONE)
            .unwrap();
        assert!(result.messages_with(Severity::Error).is_empty());
        assert_eq!(result.messages_with(Severity::Review).len(), 1);
    }
}
