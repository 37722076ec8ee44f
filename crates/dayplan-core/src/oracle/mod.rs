//! Oracle: the decision-making collaborator behind a scheduling run.
//!
//! The scheduler never decides durations, priorities or exact times on its
//! own; it asks an [`Oracle`] and validates every answer with the checks in
//! [`validate`] before trusting it.
//!
//! Implementations:
//! - [`CompletionOracle`]: an OpenAI-compatible chat completion endpoint
//! - [`LocalOracle`]: deterministic and offline
//! - [`ScriptedOracle`]: canned answers per question, for tests

mod completion;
mod local;
mod scripted;
pub mod validate;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::timeline::{DayContext, Gap};

pub use completion::{CompletionOracle, CompletionSettings};
pub use local::{LocalOracle, SlotPolicy};
pub use scripted::ScriptedOracle;

/// An event named in free text, with its requested duration.
///
/// A zero duration means the text gave none and it must be estimated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEvent {
    pub name: String,
    pub duration: Duration,
}

impl ExtractedEvent {
    pub fn new(name: impl Into<String>, minutes: i64) -> Self {
        Self {
            name: name.into(),
            duration: Duration::minutes(minutes),
        }
    }
}

/// Everything the oracle is told when asked for a slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest<'a> {
    pub event: &'a str,
    pub duration: Duration,
    pub gaps: &'a [Gap],
    pub day: &'a DayContext,
}

/// A concrete window chosen by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Slot {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// The questions a scheduling run needs answered.
///
/// Implementations are stateless from the scheduler's point of view and
/// are only ever borrowed by a run.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Name the events in `text`, each with a duration (zero when unstated).
    async fn extract_events(&self, text: &str) -> Result<Vec<ExtractedEvent>, OracleError>;

    /// Estimate how long `event` takes. Must be strictly positive.
    async fn estimate_duration(&self, event: &str) -> Result<Duration, OracleError>;

    /// Order `events` most urgent first. Must be a permutation of the input.
    async fn rank_priority(&self, events: &[String]) -> Result<Vec<String>, OracleError>;

    /// Pick a window inside one of `request.gaps`, or `None` if nothing is acceptable.
    async fn choose_slot(&self, request: &SlotRequest<'_>) -> Result<Option<Slot>, OracleError>;
}
