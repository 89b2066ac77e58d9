//! Checks on event identity: the road id each row names and duplicated lane/station keys

use super::{Check, CheckContext};
use crate::message::Severity;
use crate::result::ValidationResult;
use crate::Result;
use std::collections::HashMap;

/// Every event must belong to the road the submission is for
#[derive(Debug, Default, Clone, Copy)]
pub struct RoadIdCheck;

impl Check for RoadIdCheck {
    fn name(&self) -> &'static str {
        "road_id"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let owner = result.owner().to_string();
        let messages: Vec<String> = ctx
            .table()
            .events
            .iter()
            .filter(|event| event.road_id != owner)
            .map(|event| {
                format!(
                    "Road id {} at {} does not match submitted road {owner}",
                    event.road_id,
                    event.label()
                )
            })
            .collect();
        result.add_messages(messages, Severity::Rejected, None);
        Ok(())
    }
}

/// No two events may share road, station (or range) and lane
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateKeyCheck;

impl Check for DuplicateKeyCheck {
    fn name(&self) -> &'static str {
        "duplicate_key"
    }

    fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) -> Result<()> {
        let mut first_seen = HashMap::new();
        let mut messages = Vec::new();
        for (row, event) in ctx.table().events.iter().enumerate() {
            if let Some(&first) = first_seen.get(&event.key()) {
                messages.push(format!("Duplicate event at {} (rows {first} and {row})", event.label()));
            } else {
                first_seen.insert(event.key(), row);
            }
        }
        result.add_messages(messages, Severity::Rejected, None);
        Ok(())
    }
}
