//! Oracle with canned answers, for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;

use super::local::SlotPolicy;
use super::{ExtractedEvent, Oracle, Slot, SlotRequest};
use crate::error::OracleError;

/// Answers fixed up front, question by question.
///
/// Anything not scripted falls back to simple rules: identity ranking,
/// a 30-minute estimate, and a slot chosen by the configured
/// [`SlotPolicy`]. Every question asked is recorded in [`calls`](Self::calls).
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    events: Option<Result<Vec<ExtractedEvent>, OracleError>>,
    ranking: Option<Result<Vec<String>, OracleError>>,
    estimates: HashMap<String, Result<Duration, OracleError>>,
    slots: Mutex<HashMap<String, VecDeque<Result<Option<Slot>, OracleError>>>>,
    slot_delay: Option<StdDuration>,
    policy: SlotPolicy,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer for `extract_events`.
    pub fn with_events(mut self, events: Vec<ExtractedEvent>) -> Self {
        self.events = Some(Ok(events));
        self
    }

    /// Answer for `rank_priority`, taken verbatim.
    pub fn with_ranking(mut self, ranking: &[&str]) -> Self {
        self.ranking = Some(Ok(ranking.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// Make `rank_priority` fail.
    pub fn with_ranking_error(mut self, err: OracleError) -> Self {
        self.ranking = Some(Err(err));
        self
    }

    /// Estimate returned for `event`.
    pub fn with_estimate(mut self, event: &str, minutes: i64) -> Self {
        self.estimates.insert(event.to_string(), Ok(Duration::minutes(minutes)));
        self
    }

    /// Make `estimate_duration` fail for `event`.
    pub fn with_estimate_error(mut self, event: &str, err: OracleError) -> Self {
        self.estimates.insert(event.to_string(), Err(err));
        self
    }

    /// Queue an answer for the next `choose_slot` about `event`.
    pub fn with_slot(self, event: &str, answer: Result<Option<Slot>, OracleError>) -> Self {
        if let Ok(mut slots) = self.slots.lock() {
            slots.entry(event.to_string()).or_default().push_back(answer);
        }
        self
    }

    /// Rule used for slots that were not queued.
    pub fn with_policy(mut self, policy: SlotPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sleep this long before every `choose_slot` answer.
    pub fn with_slot_delay(mut self, delay: StdDuration) -> Self {
        self.slot_delay = Some(delay);
        self
    }

    /// Questions asked so far, as `"question:subject"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn extract_events(&self, text: &str) -> Result<Vec<ExtractedEvent>, OracleError> {
        self.record(format!("extract:{text}"));
        match &self.events {
            Some(answer) => answer.clone(),
            None => Ok(Vec::new()),
        }
    }

    async fn estimate_duration(&self, event: &str) -> Result<Duration, OracleError> {
        self.record(format!("estimate:{event}"));
        self.estimates
            .get(event)
            .cloned()
            .unwrap_or(Ok(Duration::minutes(30)))
    }

    async fn rank_priority(&self, events: &[String]) -> Result<Vec<String>, OracleError> {
        self.record(format!("rank:{}", events.join(", ")));
        match &self.ranking {
            Some(answer) => answer.clone(),
            None => Ok(events.to_vec()),
        }
    }

    async fn choose_slot(&self, request: &SlotRequest<'_>) -> Result<Option<Slot>, OracleError> {
        self.record(format!("slot:{}", request.event));
        if let Some(delay) = self.slot_delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .slots
            .lock()
            .ok()
            .and_then(|mut slots| slots.get_mut(request.event).and_then(VecDeque::pop_front));
        if let Some(answer) = queued {
            return answer;
        }

        Ok(self.policy.pick(request.gaps, request.duration).map(|gap| {
            let start = request.day.at(gap.start);
            Slot::new(start, start + request.duration)
        }))
    }
}
