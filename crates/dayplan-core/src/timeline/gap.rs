//! Free-time detection between timeline intervals.
//!
//! Gaps are derived on demand from the current timeline and never stored.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::Interval;

/// A free stretch between two busy intervals, as times of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Gap {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Check if this gap can hold something of the given length
    pub fn can_fit(&self, duration: Duration) -> bool {
        self.end - self.start >= duration
    }

    /// Whether `[start, end]` lies entirely inside this gap
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start <= start && end <= self.end
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Find the gaps of a timeline sorted ascending by start.
///
/// Walks neighbours left to right, remembering the furthest end seen so
/// far, and emits a gap whenever the next interval starts strictly after
/// it. Touching or overlapping intervals produce no gap.
pub fn find_gaps(intervals: &[Interval]) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut iter = intervals.iter();

    let Some(first) = iter.next() else {
        return gaps;
    };
    let mut reach = first.end;

    for next in iter {
        if reach < next.start {
            gaps.push(Gap::new(reach.time(), next.start.time()));
        }
        if next.end > reach {
            reach = next.end;
        }
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{DayContext, IntervalKind};
    use chrono::{FixedOffset, NaiveDate};
    use proptest::prelude::*;

    fn day() -> DayContext {
        DayContext::new(
            NaiveDate::from_ymd_opt(2024, 4, 22).unwrap(),
            FixedOffset::west_opt(4 * 3600).unwrap(),
            "EDT",
        )
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn interval(day: &DayContext, start: NaiveTime, end: NaiveTime) -> Interval {
        Interval::new("x", day.at(start), day.at(end), IntervalKind::Fixed)
    }

    #[test]
    fn test_gap_between_neighbours() {
        let d = day();
        let intervals = vec![
            interval(&d, hm(0, 0), hm(8, 30)),
            interval(&d, hm(9, 30), hm(11, 10)),
            interval(&d, hm(23, 0), hm(23, 59)),
        ];

        let gaps = find_gaps(&intervals);
        assert_eq!(
            gaps,
            vec![Gap::new(hm(8, 30), hm(9, 30)), Gap::new(hm(11, 10), hm(23, 0))]
        );
    }

    #[test]
    fn test_touching_and_overlapping_intervals_leave_no_gap() {
        let d = day();
        let intervals = vec![
            interval(&d, hm(9, 0), hm(10, 0)),
            interval(&d, hm(10, 0), hm(11, 0)),
            interval(&d, hm(10, 30), hm(12, 0)),
            interval(&d, hm(11, 0), hm(11, 30)),
        ];

        assert!(find_gaps(&intervals).is_empty());
    }

    #[test]
    fn test_contained_interval_does_not_shrink_reach() {
        let d = day();
        let intervals = vec![
            interval(&d, hm(9, 0), hm(12, 0)),
            interval(&d, hm(10, 0), hm(10, 30)),
            interval(&d, hm(13, 0), hm(14, 0)),
        ];

        assert_eq!(find_gaps(&intervals), vec![Gap::new(hm(12, 0), hm(13, 0))]);
    }

    #[test]
    fn test_empty_and_single() {
        let d = day();
        assert!(find_gaps(&[]).is_empty());
        assert!(find_gaps(&[interval(&d, hm(9, 0), hm(10, 0))]).is_empty());
    }

    #[test]
    fn test_gap_fit_and_containment() {
        let gap = Gap::new(hm(8, 30), hm(9, 30));
        assert_eq!(gap.duration_minutes(), 60);
        assert!(gap.can_fit(Duration::minutes(60)));
        assert!(!gap.can_fit(Duration::minutes(61)));
        assert!(gap.contains(hm(8, 30), hm(9, 30)));
        assert!(gap.contains(hm(8, 45), hm(9, 0)));
        assert!(!gap.contains(hm(8, 0), hm(9, 0)));
        assert_eq!(gap.to_string(), "08:30, 09:30");
    }

    proptest! {
        /// Gaps cover exactly the minutes no interval covers, between the
        /// first interval's start and the furthest end.
        #[test]
        fn gaps_cover_exactly_the_free_minutes(
            spans in proptest::collection::vec((0u32..1380, 1u32..120), 1..12)
        ) {
            let d = day();
            let mut intervals: Vec<Interval> = spans
                .iter()
                .map(|&(start, len)| {
                    let end = (start + len).min(1439);
                    interval(&d, hm(start / 60, start % 60), hm(end / 60, end % 60))
                })
                .collect();
            intervals.sort_by_key(|i| (i.start, i.end));

            let gaps = find_gaps(&intervals);
            let to_min = |t: NaiveTime| (t - NaiveTime::MIN).num_minutes();
            let lo = to_min(intervals[0].start.time());
            let hi = intervals.iter().map(|i| to_min(i.end.time())).max().unwrap();

            for pair in gaps.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start);
            }
            for m in lo..hi {
                let busy = intervals
                    .iter()
                    .any(|i| to_min(i.start.time()) <= m && m < to_min(i.end.time()));
                let free = gaps
                    .iter()
                    .any(|g| to_min(g.start) <= m && m < to_min(g.end));
                prop_assert_eq!(busy, !free, "minute {}", m);
            }
        }
    }
}
