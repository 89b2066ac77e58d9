//! Validation result: findings plus the derived outcome of a run
//!
//! A [`ValidationResult`] never stores its status. [`ValidationResult::status`] is
//! recomputed from the findings that still count under the run's [`IgnoreSet`], so one
//! result serves both a strict and a lenient reader without re-running any check.

use crate::message::{Finding, IgnoreSet, IgnoreTag, Severity, ValidationMessages};
use crate::Result;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a validation run, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Status {
    Rejected,
    Error,
    Review,
    Verified,
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Rejected => Status::Rejected,
            Severity::Error => Status::Error,
            Severity::Review => Status::Review,
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Rejected => "rejected",
            Status::Error => "error",
            Status::Review => "review",
            Status::Verified => "verified",
        }
    }

    /// Whether a submission with this status may be persisted
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Status::Verified | Status::Review)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Findings collected for one owner during one validation run
#[derive(Debug, Clone)]
pub struct ValidationResult {
    messages: ValidationMessages,
    ignore: IgnoreSet,
}

/// Flat audit log entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditRecord {
    pub owner: String,
    pub message: String,
    pub severity: Severity,
    pub ignore_tag: Option<IgnoreTag>,
}

/// Status plus the counting messages grouped by severity
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Report {
    pub owner: String,
    pub status: Status,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty", default))]
    pub rejected: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty", default))]
    pub error: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty", default))]
    pub review: Vec<String>,
}

impl Report {
    pub fn messages(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Rejected => &self.rejected,
            Severity::Error => &self.error,
            Severity::Review => &self.review,
        }
    }
}

impl ValidationResult {
    pub fn new<S: Into<String>>(owner: S, ignore: IgnoreSet) -> Self {
        Self {
            messages: ValidationMessages::new(owner),
            ignore,
        }
    }

    #[inline]
    pub fn owner(&self) -> &str {
        self.messages.owner()
    }

    #[inline]
    pub fn ignore(&self) -> IgnoreSet {
        self.ignore
    }

    /// Append one finding
    pub fn add_message(&mut self, text: impl Into<String>, severity: Severity, ignore_tag: Option<IgnoreTag>) {
        self.messages.push(text, severity, ignore_tag);
    }

    /// Append one finding per row, in row order
    pub fn add_messages<I, S>(&mut self, rows: I, severity: Severity, ignore_tag: Option<IgnoreTag>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages.extend(rows, severity, ignore_tag);
    }

    /// Append one finding whose severity and tag come from caller strings
    ///
    /// # Errors
    /// [`Error::UnsupportedSeverity`](crate::Error::UnsupportedSeverity) or
    /// [`Error::UnsupportedIgnoreTag`](crate::Error::UnsupportedIgnoreTag); nothing is
    /// appended on failure.
    pub fn add_message_str(&mut self, text: impl Into<String>, severity: &str, ignore_tag: Option<&str>) -> Result<()> {
        let severity: Severity = severity.parse()?;
        let ignore_tag = ignore_tag.map(str::parse::<IgnoreTag>).transpose()?;
        self.add_message(text, severity, ignore_tag);
        Ok(())
    }

    /// Most severe status among the findings that still count, `Verified` if none do
    pub fn status(&self) -> Status {
        self.counting()
            .map(|f| Status::from(f.severity))
            .min()
            .unwrap_or(Status::Verified)
    }

    /// Findings not suppressed by the run's ignore tags (rejected findings always stay)
    pub fn filtered_messages(&self) -> Vec<&Finding> {
        self.counting().collect()
    }

    /// Every finding in insertion order, regardless of ignore tags
    #[inline]
    pub fn all_messages(&self) -> &[Finding] {
        self.messages.as_slice()
    }

    /// Counting findings of one severity
    pub fn messages_with(&self, severity: Severity) -> Vec<&Finding> {
        self.counting().filter(|f| f.severity == severity).collect()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Flat list of every finding for audit logging
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.messages
            .iter()
            .map(|f| AuditRecord {
                owner: f.owner.clone(),
                message: f.message.clone(),
                severity: f.severity,
                ignore_tag: f.ignore_tag,
            })
            .collect()
    }

    /// Status and counting messages grouped by severity, for end users
    pub fn report(&self) -> Report {
        let mut report = Report {
            owner: self.owner().to_string(),
            status: self.status(),
            rejected: Vec::new(),
            error: Vec::new(),
            review: Vec::new(),
        };
        for finding in self.counting() {
            let bucket = match finding.severity {
                Severity::Rejected => &mut report.rejected,
                Severity::Error => &mut report.error,
                Severity::Review => &mut report.review,
            };
            bucket.push(finding.message.clone());
        }
        report
    }

    fn counting(&self) -> impl Iterator<Item = &Finding> + '_ {
        let ignore = self.ignore;
        self.messages.iter().filter(move |f| f.counts_under(&ignore))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use proptest::prelude::*;

    fn force() -> IgnoreSet {
        IgnoreSet::NONE.with(IgnoreTag::Force)
    }

    #[test]
    fn test_fresh_result_is_verified() {
        let result = ValidationResult::new("R1", IgnoreSet::NONE);
        assert_eq!(result.status(), Status::Verified);
        assert!(result.filtered_messages().is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_most_severe_wins() {
        let mut result = ValidationResult::new("R1", IgnoreSet::NONE);
        result.add_message("a", Severity::Review, None);
        assert_eq!(result.status(), Status::Review);
        result.add_message("b", Severity::Error, None);
        assert_eq!(result.status(), Status::Error);
        result.add_message("c", Severity::Review, None);
        assert_eq!(result.status(), Status::Error);
        result.add_message("d", Severity::Rejected, None);
        assert_eq!(result.status(), Status::Rejected);
    }

    #[test]
    fn test_force_suppression_keeps_log() {
        let mut strict = ValidationResult::new("R1", IgnoreSet::NONE);
        let mut lenient = ValidationResult::new("R1", force());
        for result in [&mut strict, &mut lenient] {
            result.add_message("too far from centerline", Severity::Error, Some(IgnoreTag::Force));
        }

        assert_eq!(strict.status(), Status::Error);
        assert_eq!(lenient.status(), Status::Verified);
        assert!(lenient.filtered_messages().is_empty());
        assert_eq!(lenient.all_messages().len(), 1);
    }

    #[test]
    fn test_rejected_never_suppressed() {
        let mut result = ValidationResult::new("R1", force().with(IgnoreTag::Review));
        result.add_message("wrong road", Severity::Rejected, Some(IgnoreTag::Force));
        assert_eq!(result.status(), Status::Rejected);
        assert_eq!(result.filtered_messages().len(), 1);
    }

    #[test]
    fn test_review_tag_only_suppressed_by_review() {
        let mut result = ValidationResult::new("R1", force());
        result.add_message("short coverage", Severity::Review, Some(IgnoreTag::Review));
        assert_eq!(result.status(), Status::Review);
    }

    #[test]
    fn test_add_messages_matches_repeated_add_message() {
        let rows = ["row 1", "row 2", "row 3"];
        let mut batched = ValidationResult::new("R1", IgnoreSet::NONE);
        batched.add_messages(rows, Severity::Error, Some(IgnoreTag::Force));
        let mut single = ValidationResult::new("R1", IgnoreSet::NONE);
        for row in rows {
            single.add_message(row, Severity::Error, Some(IgnoreTag::Force));
        }
        assert_eq!(batched.all_messages(), single.all_messages());
    }

    #[test]
    fn test_add_message_str() {
        let mut result = ValidationResult::new("R1", IgnoreSet::NONE);
        result.add_message_str("ok", "review", Some("review")).unwrap();
        assert!(matches!(
            result.add_message_str("x", "fatal", None),
            Err(Error::UnsupportedSeverity(_))
        ));
        assert!(matches!(
            result.add_message_str("x", "error", Some("always")),
            Err(Error::UnsupportedIgnoreTag(_))
        ));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_report_groups_filtered_messages() {
        let mut result = ValidationResult::new("R1", force());
        result.add_message("dup", Severity::Rejected, None);
        result.add_message("far", Severity::Error, Some(IgnoreTag::Force));
        result.add_message("gap", Severity::Error, None);
        result.add_message("short", Severity::Review, Some(IgnoreTag::Review));

        let report = result.report();
        assert_eq!(report.status, Status::Rejected);
        assert_eq!(report.rejected, vec!["dup"]);
        assert_eq!(report.error, vec!["gap"]);
        assert_eq!(report.messages(Severity::Review), &["short".to_string()]);

        let audit = result.audit_log();
        assert_eq!(audit.len(), 4);
        assert_eq!(audit[1].ignore_tag, Some(IgnoreTag::Force));
        assert!(audit.iter().all(|r| r.owner == "R1"));
    }

    #[test]
    fn test_messages_with() {
        let mut result = ValidationResult::new("R1", IgnoreSet::NONE);
        result.add_messages(["a", "b"], Severity::Error, None);
        result.add_message("c", Severity::Review, None);
        assert_eq!(result.messages_with(Severity::Error).len(), 2);
        assert!(result.messages_with(Severity::Rejected).is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_json_shape() {
        let mut result = ValidationResult::new("R1", IgnoreSet::NONE);
        result.add_message("gap", Severity::Error, None);
        let json = serde_json::to_value(result.report()).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"][0], "gap");
        assert!(json.get("review").is_none());
    }

    fn severity() -> impl Strategy<Value = Severity> {
        prop::sample::select(Severity::ALL.to_vec())
    }

    fn ignore_tag() -> impl Strategy<Value = Option<IgnoreTag>> {
        prop::option::of(prop::sample::select(vec![IgnoreTag::Review, IgnoreTag::Force]))
    }

    fn ignore_set() -> impl Strategy<Value = IgnoreSet> {
        (any::<bool>(), any::<bool>()).prop_map(|(review, force)| IgnoreSet { review, force })
    }

    proptest! {
        #[test]
        fn prop_status_never_relaxes(
            ignore in ignore_set(),
            findings in prop::collection::vec((severity(), ignore_tag()), 0..32),
        ) {
            let mut result = ValidationResult::new("R", ignore);
            for (severity, tag) in findings {
                let before = result.status();
                result.add_message("m", severity, tag);
                let after = result.status();
                prop_assert!(after <= before);
                let suppressed = severity != Severity::Rejected
                    && tag.is_some_and(|t| ignore.contains(t));
                if !suppressed {
                    prop_assert!(after <= Status::from(severity));
                }
            }
        }

        #[test]
        fn prop_rejected_always_rejects(
            ignore in ignore_set(),
            tag in ignore_tag(),
            others in prop::collection::vec((severity(), ignore_tag()), 0..16),
        ) {
            let mut result = ValidationResult::new("R", ignore);
            for (severity, t) in others {
                result.add_message("m", severity, t);
            }
            result.add_message("rejected", Severity::Rejected, tag);
            prop_assert_eq!(result.status(), Status::Rejected);
        }
    }
}
