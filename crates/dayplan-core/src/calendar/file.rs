//! JSON file and in-memory calendar ports.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use super::{CalendarSink, CalendarSource};
use crate::error::CalendarError;
use crate::export::CalendarEventRecord;
use crate::input::RoutineEntry;

/// Reads routine entries from a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Every entry in the file, regardless of date.
    pub fn all_entries(&self) -> Result<Vec<RoutineEntry>, CalendarError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CalendarError::ReadFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl CalendarSource for JsonFileSource {
    /// Entries whose start falls on `date`. Entries whose start cannot be
    /// read are kept so the input adapter can report them.
    fn fixed_events(&self, date: NaiveDate) -> Result<Vec<RoutineEntry>, CalendarError> {
        let entries = self.all_entries()?;
        let total = entries.len();
        let kept: Vec<RoutineEntry> = entries
            .into_iter()
            .filter(|e| e.start_date().map_or(true, |d| d == date))
            .collect();
        debug!(path = %self.path.display(), total, kept = kept.len(), %date, "routine loaded");
        Ok(kept)
    }
}

/// Writes records as a pretty-printed JSON array, replacing the file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalendarSink for JsonFileSink {
    fn publish(&mut self, records: &[CalendarEventRecord]) -> Result<usize, CalendarError> {
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, content).map_err(|source| CalendarError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(records.len())
    }
}

/// Keeps published records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<CalendarEventRecord>,
}

impl CalendarSink for MemorySink {
    fn publish(&mut self, records: &[CalendarEventRecord]) -> Result<usize, CalendarError> {
        self.records.extend_from_slice(records);
        Ok(records.len())
    }
}
