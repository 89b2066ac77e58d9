//! Validation of many independent roads at once
//!
//! Roads share nothing mutable: each submission gets its own [`ValidationResult`],
//! while routes are read-only and may be shared behind an `Arc`.

use crate::checks::SurveyValidator;
use crate::config::CheckConfig;
use crate::message::IgnoreSet;
use crate::result::{Status, ValidationResult};
use crate::route::Route;
use crate::survey::SurveyTable;
use crate::Result;
use rayon::prelude::*;
use std::sync::Arc;

/// Survey data for one road together with the road's route
#[derive(Debug, Clone)]
pub struct RoadSubmission {
    pub route: Arc<Route>,
    pub table: SurveyTable,
}

impl RoadSubmission {
    pub fn new(route: Arc<Route>, table: SurveyTable) -> Self {
        Self { route, table }
    }

    #[inline]
    pub fn road_id(&self) -> &str {
        self.route.route_id()
    }
}

/// Validate every submission in parallel, returning `(road id, result)` in input order
///
/// # Errors
/// The first operational error (e.g. a survey table in an untransformable CRS) aborts
/// the batch; survey problems are findings, never errors.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn validate_parallel(
    submissions: &[RoadSubmission],
    validator: &SurveyValidator,
    config: &CheckConfig,
    ignore: IgnoreSet,
) -> Result<Vec<(String, ValidationResult)>> {
    let results: Vec<(String, ValidationResult)> = submissions
        .par_iter()
        .map(|submission| {
            let result = validator.validate(&submission.route, &submission.table, config, ignore)?;
            Ok((submission.road_id().to_string(), result))
        })
        .collect::<Result<_>>()?;

    let rejected = results
        .iter()
        .filter(|(_, r)| r.status() == Status::Rejected)
        .count();
    let accepted = results.iter().filter(|(_, r)| r.status().is_accepted()).count();
    tracing::info!(
        roads = results.len(),
        accepted,
        rejected,
        "batch validation finished"
    );

    Ok(results)
}
