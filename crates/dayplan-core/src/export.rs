//! Conversion of placements into calendar event records.
//!
//! The record shape follows the common calendar API layout (`summary`,
//! `start.dateTime`, `start.timeZone`, `attendees[].email`) so a sink can
//! forward it with little or no mapping.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::scheduler::Placement;

/// Start or end of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// RFC 3339 timestamp with the run's fixed offset
    pub date_time: String,
    pub time_zone: String,
}

/// An invited participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

/// Neutral calendar event, ready for a [`CalendarSink`](crate::calendar::CalendarSink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventRecord {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// Shapes placements into [`CalendarEventRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct EventExporter {
    time_zone: String,
    attendee: Option<String>,
    color_id: Option<String>,
}

impl EventExporter {
    /// Exporter labelling every record with `time_zone`.
    pub fn new(time_zone: impl Into<String>) -> Self {
        Self {
            time_zone: time_zone.into(),
            attendee: None,
            color_id: None,
        }
    }

    /// Invite `email` to every exported event. Blank addresses are ignored.
    pub fn with_attendee(mut self, email: Option<String>) -> Self {
        self.attendee = email.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_color_id(mut self, color_id: Option<String>) -> Self {
        self.color_id = color_id;
        self
    }

    fn stamp(&self, ts: &DateTime<FixedOffset>) -> EventDateTime {
        EventDateTime {
            date_time: ts.to_rfc3339_opts(SecondsFormat::Secs, false),
            time_zone: self.time_zone.clone(),
        }
    }

    /// Convert one placement. Pure: the same placement always yields the same record.
    pub fn export(&self, placement: &Placement) -> CalendarEventRecord {
        CalendarEventRecord {
            summary: placement.name.clone(),
            color_id: self.color_id.clone(),
            start: self.stamp(&placement.start),
            end: self.stamp(&placement.end),
            attendees: self
                .attendee
                .iter()
                .map(|email| Attendee { email: email.clone() })
                .collect(),
        }
    }

    /// Convert placements in order.
    pub fn export_all(&self, placements: &[Placement]) -> Vec<CalendarEventRecord> {
        placements.iter().map(|p| self.export(p)).collect()
    }
}
