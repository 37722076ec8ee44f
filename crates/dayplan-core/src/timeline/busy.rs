//! The busy timeline a scheduling run fills in.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use serde::Serialize;

use super::day::{DayContext, DayWindow};
use super::gap::{find_gaps, Gap};
use super::item::{Interval, IntervalKind, DAY_ENDS, DAY_STARTS};
use crate::error::InputError;

/// Sorted busy intervals for one day, bounded by two sentinels.
///
/// The sentinels cover `00:00..day_start` and `day_end..23:59`, so the gaps
/// of an otherwise empty timeline are exactly the working day.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    day: DayContext,
    window: DayWindow,
    #[serde(skip)]
    buffer: Duration,
    intervals: Vec<Interval>,
}

impl Timeline {
    /// Create a timeline holding only the two sentinels.
    pub fn new(day: DayContext, window: DayWindow, buffer_minutes: i64) -> Self {
        let midnight = NaiveTime::MIN;
        let last_minute = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);

        let intervals = vec![
            Interval::new(DAY_STARTS, day.at(midnight), day.at(window.start), IntervalKind::Sentinel),
            Interval::new(DAY_ENDS, day.at(window.end), day.at(last_minute), IntervalKind::Sentinel),
        ];

        Self {
            day,
            window,
            buffer: Duration::minutes(buffer_minutes.max(0)),
            intervals,
        }
    }

    pub fn day(&self) -> &DayContext {
        &self.day
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    /// All intervals, sentinels included, ascending by start.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Intervals other than the two sentinels.
    pub fn busy(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter().filter(|i| !i.is_sentinel())
    }

    /// Add a pre-existing routine entry, padding its end by the buffer.
    pub fn add_fixed(
        &mut self,
        name: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<(), InputError> {
        if end < start {
            return Err(InputError::InvertedEntry {
                name: name.to_string(),
                start,
                end,
            });
        }
        let start = start.with_timezone(&self.day.offset);
        let end = end.with_timezone(&self.day.offset) + self.buffer;
        self.insert(Interval::new(name, start, end, IntervalKind::Fixed));
        Ok(())
    }

    /// Reserve `[start - buffer, end + buffer]` for a newly placed event.
    pub fn add_placed(&mut self, name: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) {
        let start = start.with_timezone(&self.day.offset) - self.buffer;
        let end = end.with_timezone(&self.day.offset) + self.buffer;
        self.insert(Interval::new(name, start, end, IntervalKind::Placed));
    }

    fn insert(&mut self, interval: Interval) {
        let key = (interval.start, interval.end);
        let idx = self
            .intervals
            .partition_point(|i| (i.start, i.end) <= key);
        self.intervals.insert(idx, interval);
    }

    /// Free gaps between the current intervals.
    pub fn gaps(&self) -> Vec<Gap> {
        find_gaps(&self.intervals)
    }
}
