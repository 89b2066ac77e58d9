//! Validation findings and the append-only log that collects them

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How bad a finding is, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Severity {
    Rejected,
    Error,
    Review,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Rejected, Severity::Error, Severity::Review];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Rejected => "rejected",
            Severity::Error => "error",
            Severity::Review => "review",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "rejected" => Ok(Severity::Rejected),
            "error" => Ok(Severity::Error),
            "review" => Ok(Severity::Review),
            other => Err(Error::UnsupportedSeverity(other.to_string())),
        }
    }
}

/// Category a finding can be bypassed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum IgnoreTag {
    Review,
    Force,
}

impl IgnoreTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreTag::Review => "review",
            IgnoreTag::Force => "force",
        }
    }
}

impl fmt::Display for IgnoreTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IgnoreTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "review" => Ok(IgnoreTag::Review),
            "force" => Ok(IgnoreTag::Force),
            other => Err(Error::UnsupportedIgnoreTag(other.to_string())),
        }
    }
}

/// The ignore tags a validation run has opted to suppress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct IgnoreSet {
    pub review: bool,
    pub force: bool,
}

impl IgnoreSet {
    /// Suppress nothing
    pub const NONE: IgnoreSet = IgnoreSet {
        review: false,
        force: false,
    };

    pub fn with(mut self, tag: IgnoreTag) -> Self {
        match tag {
            IgnoreTag::Review => self.review = true,
            IgnoreTag::Force => self.force = true,
        }
        self
    }

    #[inline]
    pub fn contains(&self, tag: IgnoreTag) -> bool {
        match tag {
            IgnoreTag::Review => self.review,
            IgnoreTag::Force => self.force,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.review && !self.force
    }
}

impl FromIterator<IgnoreTag> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = IgnoreTag>>(iter: I) -> Self {
        iter.into_iter().fold(IgnoreSet::NONE, IgnoreSet::with)
    }
}

/// Parses comma-separated tags, e.g. `"force,review"`; the empty string is the empty set
impl FromStr for IgnoreSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(IgnoreTag::from_str)
            .collect()
    }
}

/// One recorded validation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Finding {
    pub message: String,
    pub severity: Severity,
    pub ignore_tag: Option<IgnoreTag>,
    /// Owner of the run that produced the finding (usually a road id)
    pub owner: String,
}

impl Finding {
    /// Whether the finding still counts under `ignore`
    ///
    /// Rejected findings always count.
    #[inline]
    pub fn counts_under(&self, ignore: &IgnoreSet) -> bool {
        self.severity == Severity::Rejected
            || self.ignore_tag.is_none_or(|tag| !ignore.contains(tag))
    }
}

/// Append-only log of findings for one owner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationMessages {
    owner: String,
    findings: Vec<Finding>,
}

impl ValidationMessages {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            findings: Vec::new(),
        }
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity, ignore_tag: Option<IgnoreTag>) {
        self.findings.push(Finding {
            message: message.into(),
            severity,
            ignore_tag,
            owner: self.owner.clone(),
        });
    }

    pub fn extend<I, S>(&mut self, messages: I, severity: Severity, ignore_tag: Option<IgnoreTag>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.push(message, severity, ignore_tag);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[Finding] {
        &self.findings
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.findings.iter()
    }
}
