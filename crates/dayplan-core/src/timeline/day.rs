//! The calendar day a run plans for.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Date, UTC offset and timezone label shared by every interval of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayContext {
    pub date: NaiveDate,
    #[serde(with = "offset_seconds")]
    pub offset: FixedOffset,
    /// Free-form label carried into exported records (e.g. "America/New_York").
    pub timezone_label: String,
}

impl DayContext {
    pub fn new(date: NaiveDate, offset: FixedOffset, timezone_label: impl Into<String>) -> Self {
        Self {
            date,
            offset,
            timezone_label: timezone_label.into(),
        }
    }

    /// Timestamp for a time of day on this date, in this offset.
    pub fn at(&self, time: NaiveTime) -> DateTime<FixedOffset> {
        let local = self.date.and_time(time);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.offset)
    }

    /// Calendar date of `ts` as seen from this run's offset.
    pub fn local_date(&self, ts: &DateTime<FixedOffset>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }
}

/// FixedOffset as seconds east of UTC.
mod offset_seconds {
    use chrono::FixedOffset;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i32(offset.local_minus_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FixedOffset, D::Error> {
        let secs = i32::deserialize(d)?;
        FixedOffset::east_opt(secs).ok_or_else(|| D::Error::custom(format!("offset out of range: {secs}")))
    }
}

/// Working-day boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DayWindow {
    /// Build a window, rejecting `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, InputError> {
        if start >= end {
            return Err(InputError::InvalidDayWindow {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse `HH:MM` boundaries.
    pub fn parse(start: &str, end: &str) -> Result<Self, InputError> {
        Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Parse a strict `HH:MM` time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, InputError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| InputError::BadTimeOfDay(value.to_string()))
}
