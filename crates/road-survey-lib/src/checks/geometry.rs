//! Checks comparing survey coordinates and stations with the route geometry

use super::{Check, CheckContext};
use crate::message::{IgnoreTag, Severity};
use crate::result::ValidationResult;
use crate::Result;

/// Route measures must not decrease along the vertex sequence, and no two
/// vertices may share a sequence index
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteMonotonicCheck;

impl Check for RouteMonotonicCheck {
    fn name(&self) -> &'static str {
        "route_monotonic"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let route = ctx.route();
        let vertices = route.vertices();
        let duplicates = route.duplicate_sequences().into_iter().map(|i| {
            format!(
                "Route {} repeats vertex sequence {}",
                route.route_id(),
                vertices[i].sequence
            )
        });
        let decreasing = route.non_monotonic_vertices().into_iter().map(|i| {
            format!(
                "Route {} measure decreases at vertex {} ({} to {})",
                route.route_id(),
                vertices[i].sequence,
                vertices[i - 1].measure,
                vertices[i].measure
            )
        });
        let messages: Vec<String> = duplicates.chain(decreasing).collect();
        result.add_messages(messages, Severity::Error, None);
        Ok(())
    }
}

/// Survey coordinates must lie within `distance_tolerance` of the route
#[derive(Debug, Default, Clone, Copy)]
pub struct DistanceToRouteCheck;

impl Check for DistanceToRouteCheck {
    fn name(&self) -> &'static str {
        "distance_to_route"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let tolerance = ctx.config().distance_tolerance;
        let messages: Vec<String> = ctx
            .table()
            .events
            .iter()
            .enumerate()
            .filter_map(|(row, event)| {
                let distance = ctx.projection(row)?.distance;
                (distance > tolerance).then(|| {
                    format!(
                        "Coordinate at {} is {distance:.1} from route {} (tolerance {tolerance})",
                        event.label(),
                        ctx.route().route_id()
                    )
                })
            })
            .collect();
        result.add_messages(messages, Severity::Error, Some(IgnoreTag::Force));
        Ok(())
    }
}

/// The measure a coordinate projects to must agree with its reported station
///
/// Segment events are compared at their start station.
#[derive(Debug, Default, Clone, Copy)]
pub struct StationMeasureCheck;

impl Check for StationMeasureCheck {
    fn name(&self) -> &'static str {
        "station_measure"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let config = ctx.config();
        let messages: Vec<String> = ctx
            .table()
            .events
            .iter()
            .enumerate()
            .filter_map(|(row, event)| {
                let measure = ctx.projection(row)?.measure?;
                let expected = config.station_to_measure(event.position.start());
                let difference = (measure - expected).abs();
                (difference > config.station_tolerance).then(|| {
                    format!(
                        "Station at {} is {difference:.1} away from route measure {measure:.1} (tolerance {})",
                        event.label(),
                        config.station_tolerance
                    )
                })
            })
            .collect();
        result.add_messages(messages, Severity::Error, Some(IgnoreTag::Force));
        Ok(())
    }
}
