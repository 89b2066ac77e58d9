//! Survey events as supplied by the ingestion layer
//!
//! Events arrive already parsed and schema-checked. The table here only adds the
//! lane-aware views the consistency checks need.

use crate::point::{Crs, Points};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Side of the road a lane belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum LaneSide {
    Left,
    Right,
}

/// Lane code such as `L1` or `R2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct LaneCode {
    pub side: LaneSide,
    pub number: u8,
}

impl LaneCode {
    pub fn new(side: LaneSide, number: u8) -> Self {
        Self { side, number }
    }
}

impl fmt::Display for LaneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            LaneSide::Left => 'L',
            LaneSide::Right => 'R',
        };
        write!(f, "{side}{}", self.number)
    }
}

impl FromStr for LaneCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || Error::InvalidLaneCode(s.to_string());
        let mut chars = trimmed.chars();
        let side = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('L') => LaneSide::Left,
            Some('R') => LaneSide::Right,
            _ => return Err(invalid()),
        };
        let number: u8 = chars.as_str().parse().map_err(|_| invalid())?;
        if number == 0 {
            return Err(invalid());
        }
        Ok(Self { side, number })
    }
}

impl TryFrom<String> for LaneCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LaneCode> for String {
    fn from(code: LaneCode) -> Self {
        code.to_string()
    }
}

/// Where along the road an event was recorded
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Position {
    Point { sta: f64 },
    Segment { from_sta: f64, to_sta: f64 },
}

impl Position {
    /// A point event
    ///
    /// # Errors
    /// [`Error::InvalidStationRange`] when the station is not finite.
    pub fn point(sta: f64) -> Result<Self> {
        if !sta.is_finite() {
            return Err(Error::InvalidStationRange { from: sta, to: sta });
        }
        Ok(Position::Point { sta })
    }

    /// A segment event; a reversed or empty range is allowed so checks can report it
    ///
    /// # Errors
    /// [`Error::InvalidStationRange`] when either station is not finite.
    pub fn segment(from_sta: f64, to_sta: f64) -> Result<Self> {
        if !from_sta.is_finite() || !to_sta.is_finite() {
            return Err(Error::InvalidStationRange {
                from: from_sta,
                to: to_sta,
            });
        }
        Ok(Position::Segment { from_sta, to_sta })
    }

    /// Station the event starts at
    #[inline]
    pub fn start(&self) -> f64 {
        match *self {
            Position::Point { sta } => sta,
            Position::Segment { from_sta, .. } => from_sta,
        }
    }

    /// Station the event ends at (equal to `start` for point events)
    #[inline]
    pub fn end(&self) -> f64 {
        match *self {
            Position::Point { sta } => sta,
            Position::Segment { to_sta, .. } => to_sta,
        }
    }

    #[inline]
    pub fn is_segment(&self) -> bool {
        matches!(self, Position::Segment { .. })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Point { sta } => write!(f, "STA {sta}"),
            Position::Segment { from_sta, to_sta } => write!(f, "STA {from_sta}-{to_sta}"),
        }
    }
}

/// Free-form domain attribute (roughness value, defect class, count...)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum AttributeValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

/// One submitted survey row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurveyEvent {
    pub road_id: String,
    pub position: Position,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lane: Option<LaneCode>,
    /// Recorded coordinate in the table's CRS
    #[cfg_attr(feature = "serde", serde(default))]
    pub coordinate: Option<(f64, f64)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Identity of an event for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EventKey {
    road_id: String,
    start: u64,
    end: Option<u64>,
    lane: Option<LaneCode>,
}

impl SurveyEvent {
    pub fn new(road_id: impl Into<String>, position: Position) -> Self {
        Self {
            road_id: road_id.into(),
            position,
            lane: None,
            coordinate: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_lane(mut self, lane: LaneCode) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn with_coordinate(mut self, x: f64, y: f64) -> Self {
        self.coordinate = Some((x, y));
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Human-readable location used in finding texts
    pub fn label(&self) -> String {
        match self.lane {
            Some(lane) => format!("{} lane {lane}", self.position),
            None => self.position.to_string(),
        }
    }

    pub(crate) fn key(&self) -> EventKey {
        // +0.0 folds -0.0 into 0.0 so both hash alike
        let bits = |sta: f64| (sta + 0.0).to_bits();
        EventKey {
            road_id: self.road_id.clone(),
            start: bits(self.position.start()),
            end: match self.position {
                Position::Point { .. } => None,
                Position::Segment { to_sta, .. } => Some(bits(to_sta)),
            },
            lane: self.lane,
        }
    }
}

/// Ordered survey rows for one submission
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurveyTable {
    pub crs: Crs,
    pub events: Vec<SurveyEvent>,
}

impl SurveyTable {
    pub fn new(crs: Crs, events: Vec<SurveyEvent>) -> Self {
        Self { crs, events }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Row indices grouped per lane, each group ordered by start station
    ///
    /// Events without a lane code form the `None` group. Equal stations keep row order.
    pub fn by_lane(&self) -> BTreeMap<Option<LaneCode>, Vec<usize>> {
        let mut lanes: BTreeMap<Option<LaneCode>, Vec<usize>> = BTreeMap::new();
        for (row, event) in self.events.iter().enumerate() {
            lanes.entry(event.lane).or_default().push(row);
        }
        for rows in lanes.values_mut() {
            rows.sort_by(|&a, &b| {
                self.events[a]
                    .position
                    .start()
                    .total_cmp(&self.events[b].position.start())
            });
        }
        lanes
    }

    /// Coordinates of the rows that have one, keyed by row index
    ///
    /// # Errors
    /// [`Error::InvalidCoordinate`] on a non-finite coordinate.
    pub fn points(&self) -> Result<Points<usize>> {
        let rows: Vec<(usize, (f64, f64))> = self
            .events
            .iter()
            .enumerate()
            .filter_map(|(row, event)| event.coordinate.map(|c| (row, c)))
            .collect();
        let skipped = self.events.len() - rows.len();
        if skipped > 0 {
            tracing::warn!(skipped, "survey rows without coordinates skipped");
        }
        Points::with_keys(rows, self.crs)
    }
}
