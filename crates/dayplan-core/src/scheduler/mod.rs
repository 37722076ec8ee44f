//! Greedy, oracle-driven scheduler.
//!
//! Places each pending event into a free gap of the day:
//! - Asks the oracle once, up front, for a priority order over all events
//! - Visits events in that order exactly once; there is no retry pass
//! - Recomputes gaps from the timeline before every placement
//! - Reserves every placement plus a buffer on both sides, so later gap
//!   computations keep their distance

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{InputError, OracleError, ScheduleError};
use crate::oracle::validate::{check_estimate, check_permutation, check_slot};
use crate::oracle::{ExtractedEvent, Oracle, SlotRequest};
use crate::timeline::{DayWindow, Timeline};

/// An event waiting to be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    pub name: String,
    /// Zero means unknown; the oracle estimates it.
    pub requested: Duration,
}

impl PendingEvent {
    pub fn new(name: impl Into<String>, minutes: i64) -> Self {
        Self {
            name: name.into(),
            requested: Duration::minutes(minutes),
        }
    }
}

impl From<ExtractedEvent> for PendingEvent {
    fn from(event: ExtractedEvent) -> Self {
        Self {
            name: event.name,
            requested: event.duration,
        }
    }
}

/// Final accepted slot for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Placement {
    /// Get total duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.name
        )
    }
}

/// Why an event was left out of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// The oracle found no acceptable window
    NoSlotAvailable,
    /// The oracle could not be reached or timed out
    Transport(String),
}

/// An event the run could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unscheduled {
    pub name: String,
    #[serde(flatten)]
    pub reason: UnscheduledReason,
}

impl fmt::Display for Unscheduled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            UnscheduledReason::NoSlotAvailable => write!(f, "{}: no slot available", self.name),
            UnscheduledReason::Transport(msg) => write!(f, "{}: oracle unavailable ({msg})", self.name),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Working-day boundaries
    pub window: DayWindow,
    /// Padding kept around routine entries and placements (minutes)
    pub buffer_minutes: i64,
    /// Upper bound applied to oracle estimates (minutes)
    pub max_estimate_minutes: i64,
    /// Per-call limit for oracle answers
    pub oracle_timeout: Option<StdDuration>,
    /// Abort the run on transport failures instead of skipping the event
    pub transport_failures_fatal: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window: DayWindow::default(),
            buffer_minutes: 10,
            max_estimate_minutes: 180,
            oracle_timeout: Some(StdDuration::from_secs(60)),
            transport_failures_fatal: false,
        }
    }
}

/// What a run starts from.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    /// Seeded timeline: sentinels plus padded routine entries
    pub timeline: Timeline,
    /// Distinct events to place
    pub pending: Vec<PendingEvent>,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    /// Accepted placements, ascending by start
    pub placements: Vec<Placement>,
    /// Events that could not be placed, in the order they were visited
    pub unscheduled: Vec<Unscheduled>,
    /// Final timeline, including padded placements
    pub timeline: Timeline,
}

/// Greedy scheduler over a borrowed oracle.
pub struct Scheduler<'a> {
    oracle: &'a dyn Oracle,
    config: SchedulerConfig,
}

/// Mutable state of one run.
struct Run {
    timeline: Timeline,
    placed: HashSet<String>,
    placements: Vec<Placement>,
    unscheduled: Vec<Unscheduled>,
}

impl Run {
    fn placed_sorted(&self) -> Vec<Placement> {
        let mut placed = self.placements.clone();
        placed.sort_by_key(|p| p.start);
        placed
    }
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler with default config
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self::with_config(oracle, SchedulerConfig::default())
    }

    /// Create with custom config
    pub fn with_config(oracle: &'a dyn Oracle, config: SchedulerConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Place every pending event the oracle can find room for.
    ///
    /// # Errors
    /// Returns [`ScheduleError::OracleContract`] as soon as any oracle answer
    /// fails validation, and [`ScheduleError::OracleUnavailable`] when the
    /// priority order cannot be obtained or transport failures are
    /// configured as fatal. Both carry the placements made so far.
    /// Pending events sharing a name are rejected as
    /// [`ScheduleError::MalformedInput`] before the oracle is asked anything.
    pub async fn run(&self, input: ScheduleInput) -> Result<ScheduleOutcome, ScheduleError> {
        let ScheduleInput { timeline, pending } = input;
        let mut seen = HashSet::new();
        if let Some(dup) = pending.iter().find(|p| !seen.insert(p.name.as_str())) {
            return Err(InputError::DuplicateEvent(dup.name.clone()).into());
        }
        let mut run = Run {
            timeline,
            placed: HashSet::new(),
            placements: Vec::new(),
            unscheduled: Vec::new(),
        };

        if pending.is_empty() {
            return Ok(self.finish(run));
        }

        let names: Vec<String> = pending.iter().map(|p| p.name.clone()).collect();
        let requested: HashMap<&str, Duration> = pending
            .iter()
            .map(|p| (p.name.as_str(), p.requested))
            .collect();

        let order = match self.ask(self.oracle.rank_priority(&names)).await {
            Ok(order) => order,
            Err(OracleError::Contract(violation)) => {
                return Err(ScheduleError::OracleContract {
                    event: None,
                    violation,
                    placed: Vec::new(),
                })
            }
            Err(err) => {
                return Err(ScheduleError::OracleUnavailable {
                    event: None,
                    message: err.to_string(),
                    placed: Vec::new(),
                })
            }
        };
        check_permutation(&names, &order).map_err(|violation| ScheduleError::OracleContract {
            event: None,
            violation,
            placed: Vec::new(),
        })?;
        info!(order = ?order, "priority order");

        for name in &order {
            if run.placed.contains(name) {
                continue;
            }
            let wanted = requested.get(name.as_str()).copied().unwrap_or_else(Duration::zero);
            if let Err(err) = self.place(&mut run, name, wanted).await {
                self.absorb(&mut run, name, err)?;
            }
        }

        Ok(self.finish(run))
    }

    /// One iteration: gaps, duration, slot, insert.
    async fn place(&self, run: &mut Run, name: &str, requested: Duration) -> Result<(), OracleError> {
        let gaps = run.timeline.gaps();
        let listed: Vec<String> = gaps.iter().map(ToString::to_string).collect();
        debug!(event = name, gaps = ?listed, "candidate gaps");

        let duration = self.working_duration(name, requested).await?;

        let request = SlotRequest {
            event: name,
            duration,
            gaps: &gaps,
            day: run.timeline.day(),
        };
        let Some(slot) = self.ask(self.oracle.choose_slot(&request)).await? else {
            warn!(event = name, "could not find a suitable slot");
            run.unscheduled.push(Unscheduled {
                name: name.to_string(),
                reason: UnscheduledReason::NoSlotAvailable,
            });
            return Ok(());
        };

        check_slot(name, &slot, &gaps, run.timeline.day())?;
        if slot.duration() < duration {
            warn!(
                event = name,
                requested = duration.num_minutes(),
                granted = slot.duration().num_minutes(),
                "slot shorter than requested duration"
            );
        }

        run.timeline.add_placed(name, slot.start, slot.end);
        let placement = Placement {
            name: name.to_string(),
            start: slot.start.with_timezone(&run.timeline.day().offset),
            end: slot.end.with_timezone(&run.timeline.day().offset),
        };
        info!(event = name, slot = %placement, "placed");
        run.placements.push(placement);
        run.placed.insert(name.to_string());
        Ok(())
    }

    /// Requested duration, or the oracle's estimate clamped to the cap.
    async fn working_duration(&self, name: &str, requested: Duration) -> Result<Duration, OracleError> {
        if requested > Duration::zero() {
            return Ok(requested);
        }
        let estimate = self.ask(self.oracle.estimate_duration(name)).await?;
        let estimate = check_estimate(name, estimate)?;
        let cap = Duration::minutes(self.config.max_estimate_minutes);
        if estimate > cap {
            debug!(event = name, estimate = estimate.num_minutes(), "estimate clamped");
        }
        Ok(estimate.min(cap))
    }

    /// Turn a per-event oracle failure into either an unscheduled entry or an abort.
    fn absorb(&self, run: &mut Run, name: &str, err: OracleError) -> Result<(), ScheduleError> {
        match err {
            OracleError::Contract(violation) => Err(ScheduleError::OracleContract {
                event: Some(name.to_string()),
                violation,
                placed: run.placed_sorted(),
            }),
            err if self.config.transport_failures_fatal => Err(ScheduleError::OracleUnavailable {
                event: Some(name.to_string()),
                message: err.to_string(),
                placed: run.placed_sorted(),
            }),
            err => {
                warn!(event = name, error = %err, "oracle unavailable, event left unscheduled");
                run.unscheduled.push(Unscheduled {
                    name: name.to_string(),
                    reason: UnscheduledReason::Transport(err.to_string()),
                });
                Ok(())
            }
        }
    }

    /// Await an oracle answer under the configured timeout.
    async fn ask<T, F>(&self, answer: F) -> Result<T, OracleError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        match self.config.oracle_timeout {
            Some(limit) => tokio::time::timeout(limit, answer)
                .await
                .map_err(|_| OracleError::Timeout {
                    timeout_ms: limit.as_millis(),
                })?,
            None => answer.await,
        }
    }

    fn finish(&self, run: Run) -> ScheduleOutcome {
        ScheduleOutcome {
            placements: run.placed_sorted(),
            unscheduled: run.unscheduled,
            timeline: run.timeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractViolation;
    use crate::oracle::{ScriptedOracle, Slot, SlotPolicy};
    use crate::timeline::{DayContext, Gap};
    use chrono::{NaiveDate, NaiveTime};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> DayContext {
        DayContext::new(
            NaiveDate::from_ymd_opt(2024, 4, 22).unwrap(),
            FixedOffset::west_opt(4 * 3600).unwrap(),
            "EDT",
        )
    }

    fn input(pending: Vec<PendingEvent>) -> ScheduleInput {
        let d = day();
        let mut timeline = Timeline::new(d.clone(), DayWindow::default(), 10);
        timeline.add_fixed("Course", d.at(hm(9, 30)), d.at(hm(10, 50))).unwrap();
        ScheduleInput { timeline, pending }
    }

    #[tokio::test]
    async fn test_empty_input_asks_nothing() {
        let oracle = ScriptedOracle::new();
        let outcome = Scheduler::new(&oracle).run(input(vec![])).await.unwrap();
        assert!(outcome.placements.is_empty());
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_priority_order_is_followed() {
        let oracle = ScriptedOracle::new()
            .with_ranking(&["B", "A"])
            .with_policy(SlotPolicy::EarliestFit);
        let pending = vec![PendingEvent::new("A", 30), PendingEvent::new("B", 30)];

        let outcome = Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        let calls: Vec<_> = oracle.calls().into_iter().filter(|c| c.starts_with("slot:")).collect();
        assert_eq!(calls, vec!["slot:B", "slot:A"]);

        // B takes the early gap first; A lands after its buffer.
        assert_eq!(outcome.placements[0].name, "B");
        assert_eq!(outcome.placements[0].start, day().at(hm(8, 30)));
        assert_eq!(outcome.placements[1].name, "A");
        assert_eq!(outcome.placements[1].start, day().at(hm(11, 0)));
    }

    #[tokio::test]
    async fn test_estimate_is_clamped() {
        let oracle = ScriptedOracle::new().with_estimate("Essay", 600);
        let pending = vec![PendingEvent::new("Essay", 0)];

        let outcome = Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        assert_eq!(outcome.placements[0].duration_minutes(), 180);
    }

    #[tokio::test]
    async fn test_requested_duration_skips_estimate() {
        let oracle = ScriptedOracle::new();
        let pending = vec![PendingEvent::new("Gym", 45)];

        Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        assert!(!oracle.calls().iter().any(|c| c.starts_with("estimate:")));
    }

    #[tokio::test]
    async fn test_non_positive_estimate_aborts() {
        let oracle = ScriptedOracle::new().with_estimate("Nap", 0);
        let pending = vec![PendingEvent::new("Nap", 0)];

        let err = Scheduler::new(&oracle).run(input(pending)).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::OracleContract {
                violation: ContractViolation::NonPositiveDuration { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_none_answer_leaves_event_unscheduled() {
        let oracle = ScriptedOracle::new().with_slot("Party", Ok(None));
        let pending = vec![PendingEvent::new("Party", 120), PendingEvent::new("Gym", 60)];

        let outcome = Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(outcome.placements[0].name, "Gym");
        assert_eq!(
            outcome.unscheduled,
            vec![Unscheduled {
                name: "Party".into(),
                reason: UnscheduledReason::NoSlotAvailable
            }]
        );
        // Visited once only.
        assert_eq!(oracle.calls().iter().filter(|c| *c == "slot:Party").count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_per_event_by_default() {
        let oracle = ScriptedOracle::new()
            .with_slot("A", Err(OracleError::Transport("connection reset".into())));
        let pending = vec![PendingEvent::new("A", 30), PendingEvent::new("B", 30)];

        let outcome = Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        assert_eq!(outcome.placements.len(), 1);
        assert!(matches!(outcome.unscheduled[0].reason, UnscheduledReason::Transport(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_can_be_fatal() {
        let oracle = ScriptedOracle::new()
            .with_slot("B", Err(OracleError::Transport("connection reset".into())));
        let pending = vec![PendingEvent::new("A", 30), PendingEvent::new("B", 30)];
        let config = SchedulerConfig {
            transport_failures_fatal: true,
            ..SchedulerConfig::default()
        };

        let err = Scheduler::with_config(&oracle, config).run(input(pending)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::OracleUnavailable { .. }));
        assert_eq!(err.placed().len(), 1);
        assert_eq!(err.placed()[0].name, "A");
    }

    #[tokio::test]
    async fn test_repeated_pending_name_is_rejected_before_ranking() {
        let oracle = ScriptedOracle::new();
        let pending = vec![PendingEvent::new("Gym", 60), PendingEvent::new("Gym", 30)];

        let err = Scheduler::new(&oracle).run(input(pending)).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::MalformedInput(InputError::DuplicateEvent(ref name)) if name == "Gym"
        ));
        assert!(err.placed().is_empty());
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_transport_failure_leaves_event_unscheduled() {
        let oracle = ScriptedOracle::new()
            .with_estimate_error("Laundry", OracleError::Transport("connection refused".into()));
        let pending = vec![PendingEvent::new("Laundry", 0), PendingEvent::new("Call", 20)];

        let outcome = Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(outcome.placements[0].name, "Call");
        assert_eq!(outcome.unscheduled[0].name, "Laundry");
        assert!(!oracle.calls().iter().any(|c| c == "slot:Laundry"));
    }

    #[tokio::test]
    async fn test_timeout_treated_as_transport_failure() {
        let oracle = ScriptedOracle::new().with_slot_delay(StdDuration::from_millis(200));
        let pending = vec![PendingEvent::new("Slow", 30)];
        let config = SchedulerConfig {
            oracle_timeout: Some(StdDuration::from_millis(20)),
            ..SchedulerConfig::default()
        };

        let outcome = Scheduler::with_config(&oracle, config).run(input(pending)).await.unwrap();
        assert!(outcome.placements.is_empty());
        assert_eq!(
            outcome.unscheduled[0].reason,
            UnscheduledReason::Transport(OracleError::Timeout { timeout_ms: 20 }.to_string())
        );
    }

    #[tokio::test]
    async fn test_slot_outside_gaps_aborts_but_keeps_earlier_placements() {
        let d = day();
        let oracle = ScriptedOracle::new().with_slot(
            "B",
            Ok(Some(Slot::new(d.at(hm(10, 0)), d.at(hm(10, 30))))),
        );
        let pending = vec![PendingEvent::new("A", 30), PendingEvent::new("B", 30)];

        let err = Scheduler::new(&oracle).run(input(pending)).await.unwrap_err();
        match err {
            ScheduleError::OracleContract { event, violation, placed } => {
                assert_eq!(event.as_deref(), Some("B"));
                assert!(matches!(violation, ContractViolation::SlotOutsideGaps { .. }));
                assert_eq!(placed.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rank_transport_failure_aborts_run() {
        let oracle = ScriptedOracle::new()
            .with_ranking_error(OracleError::Transport("dns failure".into()));
        let pending = vec![PendingEvent::new("A", 30)];

        let err = Scheduler::new(&oracle).run(input(pending)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::OracleUnavailable { event: None, .. }));
        assert!(err.placed().is_empty());
    }

    #[tokio::test]
    async fn test_placement_reserves_buffer() {
        let oracle = ScriptedOracle::new().with_policy(SlotPolicy::RoomiestGap);
        let pending = vec![PendingEvent::new("Gym", 60)];

        let outcome = Scheduler::new(&oracle).run(input(pending)).await.unwrap();
        assert_eq!(
            outcome.timeline.gaps(),
            vec![Gap::new(hm(8, 30), hm(9, 30)), Gap::new(hm(12, 10), hm(23, 0))]
        );
    }
}
