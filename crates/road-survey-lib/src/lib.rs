//! Road Survey Library - Linear Referencing and Survey Validation
//!
//! This library checks road survey submissions against the road's reference centerline
//! before the data is accepted. It has two tightly coupled parts: a linear referencing
//! engine that projects survey coordinates onto a measured polyline, and a validation
//! engine that accumulates findings from many independent checks and resolves them into
//! one outcome per submission.
//!
//! # Architecture
//!
//! - **[`Point`] / [`Points`]**: CRS-tagged coordinates with transform, distance and buffer helpers
//! - **[`Route`]**: Immutable measured polyline with a segment quadtree for nearest-point search
//! - **[`RouteQuery`]**: Two-phase batched projection producing a [`ProjectionTable`]
//! - **[`ValidationResult`]**: Append-only findings log with derived [`Status`]
//! - **[`SurveyValidator`]**: Ordered list of [`Check`]s run against one road
//! - **[`validate_parallel`]**: Independent roads validated concurrently
//!
//! # Performance Characteristics
//!
//! - **Route Build**: O(N log N) per route for the segment index
//! - **Projection**: O(log N) expected per point, identical to a full scan including tie-breaks
//! - **Batched Queries**: rows projected in parallel, results row-aligned with the input

mod batch;
pub mod checks;
mod config;
mod message;
mod point;
mod quadtree;
mod query;
mod result;
mod route;
mod segment;
mod survey;
pub mod utils;

// Public API exports
pub use batch::{RoadSubmission, validate_parallel};
pub use checks::{Check, CheckContext, SurveyValidator};
pub use config::{CheckConfig, Direction, ExpectedDirection, IndexConfig};
pub use message::{Finding, IgnoreSet, IgnoreTag, Severity, ValidationMessages};
pub use point::{Crs, Point, Points};
pub use query::{Column, ProjectionTable, RouteQuery};
pub use result::{AuditRecord, Report, Status, ValidationResult};
pub use route::{Projection, Route, RouteMetadata, Vertex};
pub use segment::{RouteSegment, SegmentProjection};
pub use survey::{AttributeValue, LaneCode, LaneSide, Position, SurveyEvent, SurveyTable};

/// Error types for route construction, geometry and run configuration
///
/// Business-rule problems in survey data are never errors; checks record them as
/// [`Finding`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Empty route")]
    EmptyRoute,

    #[error("Invalid coordinate: ({x}, {y})")]
    InvalidCoordinate { x: f64, y: f64 },

    #[error("Invalid measure {measure} at vertex sequence {sequence}")]
    InvalidMeasure { sequence: u32, measure: f64 },

    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    #[error("Point not projectable onto zero-length route {route}")]
    PointNotProjectable { route: String },

    #[error("Unsupported severity: {0}")]
    UnsupportedSeverity(String),

    #[error("Unsupported ignore tag: {0}")]
    UnsupportedIgnoreTag(String),

    #[error("Invalid lane code: {0}")]
    InvalidLaneCode(String),

    #[error("Invalid station range: {from} to {to}")]
    InvalidStationRange { from: f64, to: f64 },

    #[error("Key count {keys} does not match coordinate count {coords}")]
    KeyCountMismatch { keys: usize, coords: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(String, IgnoreSet) -> ValidationResult = ValidationResult::new::<String>;
        let _: fn() -> CheckConfig = CheckConfig::default;
        let _: fn() -> SurveyValidator = SurveyValidator::default;
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidCoordinate { x: f64::NAN, y: 1.0 }.to_string(),
            "Invalid coordinate: (NaN, 1)"
        );
        assert_eq!(
            Error::UnsupportedSeverity("warning".into()).to_string(),
            "Unsupported severity: warning"
        );
    }
}
