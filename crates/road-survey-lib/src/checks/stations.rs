//! Checks on the submitted stations alone, plus coverage against the route's extent

use super::{Check, CheckContext, lane_name};
use crate::message::{IgnoreTag, Severity};
use crate::result::ValidationResult;
use crate::survey::Position;
use crate::Result;

/// Segment events must run forward and have the configured length
///
/// The last segment of each lane may be shorter than `segment_length`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StationRangeCheck;

impl Check for StationRangeCheck {
    fn name(&self) -> &'static str {
        "station_range"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let config = ctx.config();
        let events = &ctx.table().events;
        let mut rejected = Vec::new();
        let mut wrong_length = Vec::new();

        for rows in ctx.table().by_lane().values() {
            let segments: Vec<usize> = rows.iter().copied().filter(|&r| events[r].position.is_segment()).collect();
            for (i, &row) in segments.iter().enumerate() {
                let Position::Segment { from_sta, to_sta } = events[row].position else {
                    continue;
                };
                if to_sta <= from_sta {
                    rejected.push(format!(
                        "Invalid station range at {}: end station must be greater than start",
                        events[row].label()
                    ));
                    continue;
                }
                let length = to_sta - from_sta;
                let deviation = length - config.segment_length;
                let is_last = i + 1 == segments.len();
                if deviation.abs() > config.segment_length_tolerance && !(is_last && deviation < 0.0) {
                    wrong_length.push(format!(
                        "Segment length {length} at {} differs from expected {}",
                        events[row].label(),
                        config.segment_length
                    ));
                }
            }
        }

        result.add_messages(rejected, Severity::Rejected, None);
        result.add_messages(wrong_length, Severity::Error, None);
        Ok(())
    }
}

/// Consecutive segment events in a lane must meet without gaps or overlaps
#[derive(Debug, Default, Clone, Copy)]
pub struct GapOverlapCheck;

impl Check for GapOverlapCheck {
    fn name(&self) -> &'static str {
        "gap_overlap"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let tolerance = ctx.config().gap_tolerance;
        let events = &ctx.table().events;
        let mut messages = Vec::new();

        for (lane, rows) in ctx.table().by_lane() {
            let ranges: Vec<(f64, f64)> = rows
                .iter()
                .filter_map(|&r| match events[r].position {
                    Position::Segment { from_sta, to_sta } => Some((from_sta, to_sta)),
                    Position::Point { .. } => None,
                })
                .collect();
            for pair in ranges.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                let step = next.0 - prev.1;
                if step > tolerance {
                    messages.push(format!(
                        "Gap of {step} in lane {} between STA {} and STA {}",
                        lane_name(lane),
                        prev.1,
                        next.0
                    ));
                } else if step < -tolerance {
                    messages.push(format!(
                        "Overlap of {} in lane {} between STA {}-{} and STA {}-{}",
                        -step,
                        lane_name(lane),
                        prev.0,
                        prev.1,
                        next.0,
                        next.1
                    ));
                }
            }
        }

        result.add_messages(messages, Severity::Error, None);
        Ok(())
    }
}

/// The survey should reach the end of the route, and not run past it
#[derive(Debug, Default, Clone, Copy)]
pub struct CoverageCheck;

impl Check for CoverageCheck {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let config = ctx.config();
        let Some(last) = ctx
            .table()
            .events
            .iter()
            .map(|e| e.position.start().max(e.position.end()))
            .max_by(f64::total_cmp)
        else {
            return Ok(());
        };

        let end = config.station_to_measure(last);
        let route_end = ctx.route().max_measure();
        if (end - route_end).abs() > config.coverage_tolerance {
            let relation = if end < route_end { "short of" } else { "past" };
            result.add_message(
                format!(
                    "Survey ends at measure {end} which is {relation} the end of route {} at {route_end}",
                    ctx.route().route_id()
                ),
                Severity::Review,
                Some(IgnoreTag::Review),
            );
        }
        Ok(())
    }
}
