pub mod config;
pub mod gaps;
pub mod plan;

use std::path::Path;

use chrono::{FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone};
use dayplan_core::timeline::parse_time_of_day;
use dayplan_core::{planning_date, CalendarSource, Config, DayContext, JsonFileSource, RoutineEntry};

/// The day to plan: `--date` if given, otherwise today (or tomorrow once the
/// configured cutoff has passed) in the local timezone.
pub(crate) fn resolve_day(config: &Config, date: Option<NaiveDate>) -> Result<DayContext, Box<dyn std::error::Error>> {
    let date = match date {
        Some(date) => date,
        None => planning_date(&Local::now(), parse_time_of_day(&config.day.next_day_cutoff)?),
    };
    let offset = offset_on(&Local, date, config.window()?.start);
    Ok(DayContext::new(date, offset, config.day.timezone_label.clone()))
}

/// UTC offset `tz` uses at `time` on `date`, not the offset in effect today.
fn offset_on<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> FixedOffset {
    let local = date.and_time(time);
    match tz.from_local_datetime(&local).earliest() {
        Some(ts) => ts.offset().fix(),
        // Skipped by a DST jump; the offset after the jump applies.
        None => tz.offset_from_utc_datetime(&local).fix(),
    }
}

/// Routine entries for `date`; no file means an empty routine.
pub(crate) fn load_routine(path: Option<&Path>, date: NaiveDate) -> Result<Vec<RoutineEntry>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(JsonFileSource::new(path).fixed_events(date)?),
        None => Ok(Vec::new()),
    }
}
