//! Turns raw inputs into what a scheduling run starts from.
//!
//! Two sources feed a run:
//! - free text naming the events to place, read through the oracle
//! - the fixed routine of the day, as `(name, start, end)` entries from a
//!   calendar source
//!
//! No scheduling happens here; malformed input fails before the run starts.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{InputError, OracleError, Result};
use crate::oracle::validate::check_extracted;
use crate::oracle::Oracle;
use crate::scheduler::{PendingEvent, ScheduleInput, SchedulerConfig};
use crate::timeline::{DayContext, Timeline};

/// A fixed routine entry as delivered by a calendar source.
///
/// Deserializes from either `["name", "start", "end"]` or
/// `{"name": ..., "start": ..., "end": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRoutineEntry")]
pub struct RoutineEntry {
    pub name: String,
    /// RFC 3339 timestamp, or a bare date for all-day entries
    pub start: String,
    pub end: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoutineEntry {
    Triple(String, String, String),
    Object { name: String, start: String, end: String },
}

impl From<RawRoutineEntry> for RoutineEntry {
    fn from(raw: RawRoutineEntry) -> Self {
        match raw {
            RawRoutineEntry::Triple(name, start, end) | RawRoutineEntry::Object { name, start, end } => {
                Self { name, start, end }
            }
        }
    }
}

impl RoutineEntry {
    pub fn new(name: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Entries given as bare dates occupy no particular time of day.
    pub fn is_all_day(&self) -> bool {
        is_bare_date(&self.start) || is_bare_date(&self.end)
    }

    /// Calendar date the entry starts on, as written.
    pub fn start_date(&self) -> Option<NaiveDate> {
        if is_bare_date(&self.start) {
            return NaiveDate::parse_from_str(self.start.trim(), "%Y-%m-%d").ok();
        }
        DateTime::parse_from_rfc3339(self.start.trim())
            .ok()
            .map(|ts| ts.date_naive())
    }

    fn parse(&self) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), InputError> {
        let stamp = |value: &str| {
            DateTime::parse_from_rfc3339(value.trim()).map_err(|_| InputError::BadTimestamp {
                name: self.name.clone(),
                value: value.to_string(),
            })
        };
        Ok((stamp(&self.start)?, stamp(&self.end)?))
    }
}

fn is_bare_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok()
}

/// Builds [`ScheduleInput`] from free text and routine entries.
pub struct InputAdapter<'a> {
    oracle: &'a dyn Oracle,
    config: &'a SchedulerConfig,
}

impl<'a> InputAdapter<'a> {
    pub fn new(oracle: &'a dyn Oracle, config: &'a SchedulerConfig) -> Self {
        Self { oracle, config }
    }

    /// Ask the oracle for the events named in `text`.
    ///
    /// # Errors
    /// Any malformed extraction (empty or repeated names, negative
    /// durations) is a contract violation; transport failures and timeouts
    /// are returned as-is.
    pub async fn pending_from_text(&self, text: &str) -> Result<Vec<PendingEvent>, OracleError> {
        let extraction = self.oracle.extract_events(text);
        let events = match self.config.oracle_timeout {
            Some(limit) => tokio::time::timeout(limit, extraction)
                .await
                .map_err(|_| OracleError::Timeout {
                    timeout_ms: limit.as_millis(),
                })??,
            None => extraction.await?,
        };
        check_extracted(&events)?;
        debug!(count = events.len(), "events extracted");
        Ok(events.into_iter().map(PendingEvent::from).collect())
    }

    /// Seed a timeline with the routine, each entry's end padded by the buffer.
    ///
    /// The day is taken from the first timed entry; `fallback` supplies it
    /// when there is none, and always supplies the timezone label.
    ///
    /// # Errors
    /// Unparseable timestamps, entries ending before they start and entries
    /// on another date are rejected.
    pub fn seed_timeline(&self, routine: &[RoutineEntry], fallback: &DayContext) -> Result<Timeline, InputError> {
        let mut timed = Vec::with_capacity(routine.len());
        for entry in routine {
            if entry.is_all_day() {
                warn!(entry = %entry.name, "skipping all-day entry");
                continue;
            }
            let (start, end) = entry.parse()?;
            timed.push((entry.name.as_str(), start, end));
        }

        let day = match timed.first() {
            Some((_, start, _)) => DayContext::new(
                start.date_naive(),
                *start.offset(),
                fallback.timezone_label.clone(),
            ),
            None => fallback.clone(),
        };

        let mut timeline = Timeline::new(day.clone(), self.config.window, self.config.buffer_minutes);
        for (name, start, end) in timed {
            let found = day.local_date(&start);
            if found != day.date {
                return Err(InputError::WrongDate {
                    name: name.to_string(),
                    expected: day.date,
                    found,
                });
            }
            timeline.add_fixed(name, start, end)?;
        }
        Ok(timeline)
    }

    /// Both steps: seed the timeline, then extract the events.
    pub async fn prepare(
        &self,
        text: &str,
        routine: &[RoutineEntry],
        fallback: &DayContext,
    ) -> Result<ScheduleInput> {
        let timeline = self.seed_timeline(routine, fallback)?;
        let pending = self.pending_from_text(text).await?;
        Ok(ScheduleInput { timeline, pending })
    }
}
