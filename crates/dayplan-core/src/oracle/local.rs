//! Deterministic offline oracle.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::validate::parse_event_list;
use super::{ExtractedEvent, Oracle, Slot, SlotRequest};
use crate::error::OracleError;
use crate::timeline::Gap;

/// How [`LocalOracle`] picks among the gaps that can hold an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Earliest gap long enough for the event
    #[default]
    EarliestFit,
    /// Longest gap long enough for the event (earliest on ties)
    RoomiestGap,
}

impl SlotPolicy {
    /// Pick a gap for `duration`, if any fits.
    pub fn pick(&self, gaps: &[Gap], duration: Duration) -> Option<Gap> {
        let mut fitting = gaps.iter().filter(|g| g.can_fit(duration));
        match self {
            Self::EarliestFit => fitting.next().copied(),
            Self::RoomiestGap => fitting
                .fold(None::<&Gap>, |best, g| match best {
                    Some(b) if b.duration_minutes() >= g.duration_minutes() => Some(b),
                    _ => Some(g),
                })
                .copied(),
        }
    }
}

/// Offline oracle with fixed rules.
///
/// - events are read from the `Name, minutes; Name, minutes` syntax
/// - every unknown duration is estimated as `default_estimate`
/// - priority is the order the events were given in
/// - slots start at the beginning of the gap chosen by the [`SlotPolicy`]
#[derive(Debug, Clone)]
pub struct LocalOracle {
    default_estimate: Duration,
    policy: SlotPolicy,
}

impl LocalOracle {
    pub fn new(default_estimate: Duration, policy: SlotPolicy) -> Self {
        Self {
            default_estimate,
            policy,
        }
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new(Duration::minutes(30), SlotPolicy::default())
    }
}

#[async_trait]
impl Oracle for LocalOracle {
    async fn extract_events(&self, text: &str) -> Result<Vec<ExtractedEvent>, OracleError> {
        Ok(parse_event_list(text)?)
    }

    async fn estimate_duration(&self, _event: &str) -> Result<Duration, OracleError> {
        Ok(self.default_estimate)
    }

    async fn rank_priority(&self, events: &[String]) -> Result<Vec<String>, OracleError> {
        Ok(events.to_vec())
    }

    async fn choose_slot(&self, request: &SlotRequest<'_>) -> Result<Option<Slot>, OracleError> {
        Ok(self.policy.pick(request.gaps, request.duration).map(|gap| {
            let start = request.day.at(gap.start);
            Slot::new(start, start + request.duration)
        }))
    }
}
