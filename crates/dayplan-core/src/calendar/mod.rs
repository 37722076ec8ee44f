//! Calendar source and sink ports.
//!
//! A source supplies the fixed routine of a day; a sink accepts the
//! exported events. Both are stateless from the scheduler's point of view.
//! File-backed implementations cover the JSON hand-off used by the CLI.

mod file;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

use crate::error::CalendarError;
use crate::export::CalendarEventRecord;
use crate::input::RoutineEntry;

pub use file::{JsonFileSink, JsonFileSource, MemorySink};

/// Supplies the fixed routine of a day.
pub trait CalendarSource {
    /// Routine entries starting on `date`.
    fn fixed_events(&self, date: NaiveDate) -> Result<Vec<RoutineEntry>, CalendarError>;
}

/// Accepts scheduled events.
pub trait CalendarSink {
    /// Publish `records`, returning how many were written.
    fn publish(&mut self, records: &[CalendarEventRecord]) -> Result<usize, CalendarError>;
}

/// The day to plan for at `now`.
///
/// Late in the evening (at or after `cutoff`) there is little of today left
/// to plan, so planning moves to the next day.
pub fn planning_date<Tz: TimeZone>(now: &DateTime<Tz>, cutoff: NaiveTime) -> NaiveDate {
    let local = now.naive_local();
    if local.time() >= cutoff {
        (local + Duration::days(1)).date()
    } else {
        local.date()
    }
}
