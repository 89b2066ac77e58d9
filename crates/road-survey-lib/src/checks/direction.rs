//! Lane direction checks over projected measures
//!
//! Both checks walk each lane in station order and look at the measures its
//! coordinates project to. A lane's direction is the majority of its measure steps.

use super::{Check, CheckContext, lane_name, trend};
use crate::config::Direction;
use crate::message::{IgnoreTag, Severity};
use crate::result::ValidationResult;
use crate::Result;

/// Projected measures must keep moving in the lane's own direction
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicSurveyCheck;

impl Check for MonotonicSurveyCheck {
    fn name(&self) -> &'static str {
        "monotonic_survey"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let config = ctx.config();
        let events = &ctx.table().events;
        let mut messages = Vec::new();

        for (lane, rows) in ctx.table().by_lane() {
            let measures = ctx.lane_measures(&rows);
            let direction = trend(&measures).unwrap_or_else(|| match lane {
                Some(code) => config.expected_direction.for_side(code.side),
                None => Direction::Forward,
            });
            for pair in measures.windows(2) {
                let ((row_a, m_a), (row_b, m_b)) = (pair[0], pair[1]);
                let backwards = match direction {
                    Direction::Forward => m_a - m_b,
                    Direction::Reverse => m_b - m_a,
                };
                if backwards > config.monotonic_tolerance {
                    messages.push(format!(
                        "Lane {} runs against its {direction} direction between {} and {} (measure {m_a:.1} to {m_b:.1})",
                        lane_name(lane),
                        events[row_a].position,
                        events[row_b].position
                    ));
                }
            }
        }

        result.add_messages(messages, Severity::Error, Some(IgnoreTag::Force));
        Ok(())
    }
}

/// Each lane must be surveyed in the direction configured for its side
///
/// Lanes without a lane code are not checked. When every checked lane is reversed,
/// one finding for the whole survey replaces the per-lane ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectionCheck;

impl Check for DirectionCheck {
    fn name(&self) -> &'static str {
        "direction"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let config = ctx.config();
        let mut checked = 0usize;
        let mut reversed = Vec::new();

        for (lane, rows) in ctx.table().by_lane() {
            let Some(code) = lane else {
                continue;
            };
            let Some(actual) = trend(&ctx.lane_measures(&rows)) else {
                tracing::debug!(lane = %code, "lane direction undetermined");
                continue;
            };
            checked += 1;
            let expected = config.expected_direction.for_side(code.side);
            if actual == expected.opposite() {
                reversed.push(format!(
                    "Lane {code} is surveyed in {actual} direction, expected {expected}"
                ));
            }
        }

        if checked > 0 && reversed.len() == checked {
            result.add_message(
                format!(
                    "Survey direction is opposite to route {} in every lane",
                    ctx.route().route_id()
                ),
                Severity::Error,
                Some(IgnoreTag::Force),
            );
        } else {
            result.add_messages(reversed, Severity::Error, Some(IgnoreTag::Force));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::{CheckConfig, ExpectedDirection};
    use crate::message::IgnoreSet;
    use crate::point::Crs;
    use crate::result::Status;
    use crate::survey::{Position, SurveyEvent, SurveyTable};

    /// Segment event whose coordinate sits at `y` on the route axis
    fn at(from: f64, code: &str, y: f64) -> SurveyEvent {
        SurveyEvent::new("R1", Position::Segment { from_sta: from, to_sta: from + 100.0 })
            .with_lane(lane(code))
            .with_coordinate(0.0, y)
    }

    fn run(check: impl Check, events: Vec<SurveyEvent>, config: CheckConfig) -> ValidationResult {
        let route = north_route();
        let table = SurveyTable::new(Crs::Local, events);
        let ctx = CheckContext::new(&route, &table, &config).unwrap();
        let mut result = ValidationResult::new("R1", IgnoreSet::NONE);
        check.run(&ctx, &mut result).unwrap();
        result
    }

    fn texts(result: &ValidationResult) -> Vec<&str> {
        result.all_messages().iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_backstep_in_forward_lane() {
        let events = vec![at(0.0, "L1", 0.0), at(100.0, "L1", 100.0), at(200.0, "L1", 50.0), at(300.0, "L1", 300.0)];
        let result = run(MonotonicSurveyCheck, events, CheckConfig::default());
        assert_eq!(
            texts(&result),
            vec!["Lane L1 runs against its forward direction between STA 100-200 and STA 200-300 (measure 100.0 to 50.0)"]
        );
        assert_eq!(result.all_messages()[0].ignore_tag, Some(IgnoreTag::Force));
    }

    #[test]
    fn test_reverse_lane_checked_against_its_own_direction() {
        let events = vec![at(0.0, "R1", 900.0), at(100.0, "R1", 800.0), at(200.0, "R1", 850.0), at(300.0, "R1", 600.0)];
        let result = run(MonotonicSurveyCheck, events, CheckConfig::default());
        assert_eq!(result.all_messages().len(), 1);
        assert!(texts(&result)[0].contains("reverse direction"));
    }

    #[test]
    fn test_monotonic_tolerance() {
        let events = vec![at(0.0, "L1", 100.0), at(100.0, "L1", 98.0), at(200.0, "L1", 300.0)];
        let config = CheckConfig {
            monotonic_tolerance: 5.0,
            ..CheckConfig::default()
        };
        assert!(run(MonotonicSurveyCheck, events, config).is_empty());
    }

    #[test]
    fn test_single_reversed_lane() {
        let events = vec![
            at(0.0, "L1", 0.0),
            at(100.0, "L1", 100.0),
            at(0.0, "R1", 500.0),
            at(100.0, "R1", 400.0),
        ];
        let result = run(DirectionCheck, events, CheckConfig::default());
        assert_eq!(texts(&result), vec!["Lane R1 is surveyed in reverse direction, expected forward"]);
        assert_eq!(result.status(), Status::Error);
    }

    #[test]
    fn test_every_lane_reversed_gives_one_finding() {
        let events = vec![
            at(0.0, "L1", 500.0),
            at(100.0, "L1", 400.0),
            at(0.0, "R1", 500.0),
            at(100.0, "R1", 400.0),
        ];
        let result = run(DirectionCheck, events, CheckConfig::default());
        assert_eq!(texts(&result), vec!["Survey direction is opposite to route R1 in every lane"]);
    }

    #[test]
    fn test_expected_direction_per_side() {
        let events = vec![
            at(0.0, "L1", 500.0),
            at(100.0, "L1", 400.0),
            at(0.0, "R1", 0.0),
            at(100.0, "R1", 100.0),
        ];
        let config = CheckConfig {
            expected_direction: ExpectedDirection {
                left: Direction::Reverse,
                right: Direction::Forward,
            },
            ..CheckConfig::default()
        };
        assert!(run(DirectionCheck, events, config).is_empty());
    }

    #[test]
    fn test_undetermined_lanes_are_skipped() {
        let events = vec![
            at(0.0, "L1", 0.0),
            SurveyEvent::new("R1", Position::Point { sta: 0.0 }).with_lane(lane("R1")),
        ];
        assert!(run(DirectionCheck, events, CheckConfig::default()).is_empty());
    }
}
