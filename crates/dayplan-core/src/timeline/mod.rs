//! Timeline and gap detection.
//!
//! This module provides:
//! - The day a run plans for (date, offset, working-day window)
//! - The sorted busy timeline with its day-boundary sentinels
//! - Gap detection between busy intervals

mod busy;
mod day;
mod gap;
mod item;

pub use busy::Timeline;
pub use day::{parse_time_of_day, DayContext, DayWindow};
pub use gap::{find_gaps, Gap};
pub use item::{Interval, IntervalKind, DAY_ENDS, DAY_STARTS};
