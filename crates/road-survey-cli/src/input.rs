//! Submission file format
//!
//! ```json
//! {
//!   "config": { "distance_tolerance": 25.0 },
//!   "roads": [
//!     {
//!       "route": { "route_id": "R1", "crs": "EPSG:32748", "vertices": [ ... ] },
//!       "survey": { "crs": "EPSG:4326", "events": [ ... ] }
//!     }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use rayon::prelude::*;
use road_survey_lib::{CheckConfig, Crs, IndexConfig, RoadSubmission, Route, RouteMetadata, SurveyTable, Vertex};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct SubmissionFile {
    #[serde(default)]
    pub config: CheckConfig,
    #[serde(default)]
    pub index: IndexConfig,
    pub roads: Vec<RoadInput>,
}

#[derive(Debug, Deserialize)]
pub struct RoadInput {
    pub route: RouteInput,
    pub survey: SurveyTable,
}

#[derive(Debug, Deserialize)]
pub struct RouteInput {
    pub route_id: String,
    pub crs: Crs,
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub metadata: RouteMetadata,
}

impl SubmissionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = std::io::BufReader::new(file);
        let parsed: SubmissionFile =
            serde_json::from_reader(reader).with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!(path = %path.display(), roads = parsed.roads.len(), "Loaded submission file");
        Ok(parsed)
    }

    /// Build every road's route in parallel
    pub fn into_submissions(self) -> Result<(CheckConfig, Vec<RoadSubmission>)> {
        let index = self.index;
        let submissions = self
            .roads
            .into_par_iter()
            .map(|road| {
                let RouteInput {
                    route_id,
                    crs,
                    vertices,
                    metadata,
                } = road.route;
                let route = Route::new(route_id.clone(), crs, vertices, metadata, &index)
                    .with_context(|| format!("Invalid route {route_id}"))?;
                Ok(RoadSubmission::new(route, road.survey))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((self.config, submissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "config": { "distance_tolerance": 10.0 },
        "roads": [{
            "route": {
                "route_id": "R1",
                "crs": "LOCAL",
                "vertices": [
                    { "x": 0.0, "y": 100.0, "measure": 100.0, "sequence": 2 },
                    { "x": 0.0, "y": 0.0, "measure": 0.0, "sequence": 1 }
                ],
                "metadata": { "status": "national" }
            },
            "survey": {
                "crs": "LOCAL",
                "events": [
                    { "road_id": "R1", "position": { "sta": 50.0 }, "lane": "L1", "coordinate": [5.0, 50.0] }
                ]
            }
        }]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let file: SubmissionFile = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(file.config.distance_tolerance, 10.0);
        assert_eq!(file.config.station_tolerance, 50.0);

        let (config, submissions) = file.into_submissions().unwrap();
        assert_eq!(config.distance_tolerance, 10.0);
        assert_eq!(submissions.len(), 1);
        let route = &submissions[0].route;
        assert_eq!(route.status(), Some("national"));
        assert_eq!(route.vertices()[0].sequence, 1);
        assert_eq!(route.measure_at_point(5.0, 50.0).unwrap(), 50.0);
    }

    #[test]
    fn test_demo_submission() {
        use road_survey_lib::{IgnoreSet, Status, SurveyValidator, validate_parallel};

        let file: SubmissionFile = serde_json::from_str(include_str!("../demos/submission.json")).unwrap();
        let (config, submissions) = file.into_submissions().unwrap();
        let results = validate_parallel(&submissions, &SurveyValidator::default(), &config, IgnoreSet::NONE).unwrap();
        let report = results[0].1.report();
        assert_eq!(report.owner, "015");
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.error.len(), 1, "{report:?}");
    }

    #[test]
    fn test_empty_route_is_reported_with_its_id() {
        let json = r#"{ "roads": [{ "route": { "route_id": "R7", "crs": "LOCAL", "vertices": [] },
                        "survey": { "crs": "LOCAL", "events": [] } }] }"#;
        let file: SubmissionFile = serde_json::from_str(json).unwrap();
        let err = file.into_submissions().unwrap_err();
        assert!(format!("{err:#}").contains("R7"));
    }
}
