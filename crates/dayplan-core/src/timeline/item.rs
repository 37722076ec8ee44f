//! Timeline interval types.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthetic interval covering midnight to the day start.
pub const DAY_STARTS: &str = "DAY STARTS";
/// Name of the synthetic interval covering the day end to 23:59.
pub const DAY_ENDS: &str = "DAY ENDS";

/// What put an interval on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Sentinel, // Day boundary marker
    Fixed,    // Pre-existing routine entry, end padded
    Placed,   // Event placed by the scheduler, both sides padded
}

impl IntervalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentinel => "sentinel",
            Self::Fixed => "fixed",
            Self::Placed => "placed",
        }
    }
}

/// A busy stretch of the day.
///
/// Stored bounds include any buffer padding, so `start`/`end` are the
/// extent the scheduler must keep clear, not necessarily the event's own
/// times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub kind: IntervalKind,
}

impl Interval {
    pub fn new(
        name: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        kind: IntervalKind,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            kind,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind == IntervalKind::Sentinel
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {} ({})",
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.name,
            self.kind.as_str()
        )
    }
}
