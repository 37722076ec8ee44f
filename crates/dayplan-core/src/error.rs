//! Core error types for dayplan-core.
//!
//! Each concern gets its own thiserror enum; [`CoreError`] wraps the ones
//! that can stop a run before it starts.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;

use crate::scheduler::Placement;

/// Errors raised while preparing a run, before scheduling starts.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Calendar input that cannot seed a run
    #[error("Malformed input: {0}")]
    Input(#[from] InputError),

    /// Oracle failures outside a scheduling run (e.g. text extraction)
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to locate or create the configuration directory
    #[error("Cannot resolve configuration directory: {0}")]
    NoDataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Malformed calendar input or day boundaries. Fatal before a run starts.
#[derive(Error, Debug)]
pub enum InputError {
    /// A routine timestamp that is not RFC 3339
    #[error("Unparseable timestamp '{value}' for '{name}'")]
    BadTimestamp { name: String, value: String },

    /// A routine entry that ends before it starts
    #[error("Entry '{name}' ends ({end}) before it starts ({start})")]
    InvertedEntry {
        name: String,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    /// A routine entry on a different date than the rest of the run
    #[error("Entry '{name}' falls on {found}, expected {expected}")]
    WrongDate {
        name: String,
        expected: NaiveDate,
        found: NaiveDate,
    },

    /// Day start is not before day end
    #[error("Day start ({start}) must be before day end ({end})")]
    InvalidDayWindow { start: String, end: String },

    /// A time-of-day string that is not HH:MM
    #[error("Invalid time of day '{0}', expected HH:MM")]
    BadTimeOfDay(String),

    /// Two pending events with the same name
    #[error("Event '{0}' is listed more than once")]
    DuplicateEvent(String),
}

/// A response from the oracle that fails shape validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// Ranking is not a permutation of the requested names
    #[error("ranking is not a permutation of the input (missing: {missing:?}, unexpected: {unexpected:?}, repeated: {repeated:?})")]
    NotAPermutation {
        missing: Vec<String>,
        unexpected: Vec<String>,
        repeated: Vec<String>,
    },

    /// Duration estimate of zero or less
    #[error("duration estimate for '{event}' is not positive ({minutes} min)")]
    NonPositiveDuration { event: String, minutes: i64 },

    /// Response does not match the expected shape
    #[error("unparseable {what} response: {raw:?}")]
    Unparseable { what: &'static str, raw: String },

    /// Chosen slot ends at or before its start
    #[error("slot for '{event}' is empty or inverted ({start} -> {end})")]
    InvertedSlot {
        event: String,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    /// Chosen slot is not on the day being planned
    #[error("slot for '{event}' is on {found}, expected {expected}")]
    SlotWrongDay {
        event: String,
        expected: NaiveDate,
        found: NaiveDate,
    },

    /// Chosen slot is not inside any candidate gap
    #[error("slot for '{event}' ({start} -> {end}) lies outside every candidate gap")]
    SlotOutsideGaps {
        event: String,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    /// Extracted event without a name
    #[error("extracted event has an empty name")]
    EmptyEventName,

    /// The same event name extracted twice
    #[error("event '{0}' was extracted more than once")]
    DuplicateEvent(String),

    /// Extracted event with a negative duration
    #[error("event '{event}' has a negative duration ({minutes} min)")]
    NegativeDuration { event: String, minutes: i64 },
}

/// Failure talking to, or trusting, the oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle answered, but the answer is malformed
    #[error("oracle contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// Connection or protocol failure
    #[error("oracle transport failure: {0}")]
    Transport(String),

    /// No answer within the configured timeout
    #[error("oracle did not answer within {timeout_ms} ms")]
    Timeout { timeout_ms: u128 },
}

impl OracleError {
    /// Contract violations are fatal to a run; everything else is per-event.
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Transport(err.to_string())
    }
}

/// A scheduling run that could not complete.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The run's input is unusable; nothing was asked or placed.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] InputError),

    /// The oracle broke its contract; the run stopped at `event`.
    ///
    /// `placed` holds the placements accepted before the violation; they
    /// remain valid and may still be exported.
    #[error("oracle contract violated{}: {violation}", during(.event))]
    OracleContract {
        event: Option<String>,
        violation: ContractViolation,
        placed: Vec<Placement>,
    },

    /// Transport failure that cannot be tolerated
    #[error("oracle unavailable{}: {message}", during(.event))]
    OracleUnavailable {
        event: Option<String>,
        message: String,
        placed: Vec<Placement>,
    },
}

impl ScheduleError {
    /// Placements accepted before the run aborted.
    pub fn placed(&self) -> &[Placement] {
        match self {
            Self::MalformedInput(_) => &[],
            Self::OracleContract { placed, .. } | Self::OracleUnavailable { placed, .. } => placed,
        }
    }
}

fn during(event: &Option<String>) -> String {
    event
        .as_deref()
        .map(|e| format!(" while scheduling '{e}'"))
        .unwrap_or_default()
}

/// Calendar source/sink errors.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Failed to read a source file
    #[error("Failed to read calendar source {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a sink file
    #[error("Failed to write calendar sink {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source content is not the expected JSON shape
    #[error("Invalid calendar data: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
