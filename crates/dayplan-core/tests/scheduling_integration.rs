//! Integration tests for a full planning run: input, scheduling, export.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use dayplan_core::oracle::ScriptedOracle;
use dayplan_core::{
    CalendarSink, ContractViolation, DayContext, EventExporter, ExtractedEvent, InputAdapter,
    MemorySink, OracleError, RoutineEntry, ScheduleError, Scheduler, SchedulerConfig, Slot, SlotPolicy,
    UnscheduledReason,
};

fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn fallback() -> DayContext {
    DayContext::new(
        NaiveDate::from_ymd_opt(2024, 4, 22).unwrap(),
        FixedOffset::west_opt(4 * 3600).unwrap(),
        "America/New_York",
    )
}

fn routine() -> Vec<RoutineEntry> {
    vec![RoutineEntry::new(
        "Mini Course",
        "2024-04-22T09:30:00-04:00",
        "2024-04-22T10:50:00-04:00",
    )]
}

fn gym_and_grocery() -> ScriptedOracle {
    ScriptedOracle::new()
        .with_events(vec![
            ExtractedEvent::new("Gym session", 60),
            ExtractedEvent::new("Grocery shopping", 0),
        ])
        .with_ranking(&["Gym session", "Grocery shopping"])
        .with_estimate("Grocery shopping", 30)
        .with_policy(SlotPolicy::RoomiestGap)
}

#[tokio::test]
async fn test_gym_and_grocery_day() {
    let oracle = gym_and_grocery();
    let config = SchedulerConfig::default();
    let input = InputAdapter::new(&oracle, &config)
        .prepare("Gym for an hour, then groceries", &routine(), &fallback())
        .await
        .unwrap();

    let outcome = Scheduler::with_config(&oracle, config).run(input).await.unwrap();

    assert_eq!(outcome.placements.len(), 2);
    assert_eq!(outcome.placements[0].name, "Gym session");
    assert_eq!(outcome.placements[0].start, ts("2024-04-22T11:00:00-04:00"));
    assert_eq!(outcome.placements[0].end, ts("2024-04-22T12:00:00-04:00"));
    assert_eq!(outcome.placements[1].name, "Grocery shopping");
    assert_eq!(outcome.placements[1].start, ts("2024-04-22T12:10:00-04:00"));
    assert_eq!(outcome.placements[1].end, ts("2024-04-22T12:40:00-04:00"));
    assert!(outcome.unscheduled.is_empty());

    // Sentinels plus the padded routine entry and both padded placements.
    let intervals = outcome.timeline.intervals();
    assert_eq!(intervals.len(), 5);
    assert!(intervals.first().unwrap().is_sentinel());
    assert!(intervals.last().unwrap().is_sentinel());
    let busy: Vec<(String, DateTime<FixedOffset>, DateTime<FixedOffset>)> = outcome
        .timeline
        .busy()
        .map(|i| (i.name.clone(), i.start, i.end))
        .collect();
    assert_eq!(
        busy,
        vec![
            (
                "Mini Course".to_string(),
                ts("2024-04-22T09:30:00-04:00"),
                ts("2024-04-22T11:00:00-04:00")
            ),
            (
                "Gym session".to_string(),
                ts("2024-04-22T10:50:00-04:00"),
                ts("2024-04-22T12:10:00-04:00")
            ),
            (
                "Grocery shopping".to_string(),
                ts("2024-04-22T12:00:00-04:00"),
                ts("2024-04-22T12:50:00-04:00")
            ),
        ]
    );

    // Only the unknown duration was estimated, and ranking happened once.
    let calls = oracle.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("estimate:")).count(), 1);
    assert_eq!(calls.iter().filter(|c| c.starts_with("rank:")).count(), 1);
}

#[tokio::test]
async fn test_ranking_missing_an_event_aborts_before_placing() {
    let oracle = gym_and_grocery().with_ranking(&["Gym session"]);
    let config = SchedulerConfig::default();
    let input = InputAdapter::new(&oracle, &config)
        .prepare("Gym, groceries", &routine(), &fallback())
        .await
        .unwrap();

    let err = Scheduler::with_config(&oracle, config).run(input).await.unwrap_err();
    match &err {
        ScheduleError::OracleContract { violation, .. } => {
            assert!(matches!(violation, ContractViolation::NotAPermutation { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.placed().is_empty());
    assert!(!oracle.calls().iter().any(|c| c.starts_with("slot:")));
}

#[tokio::test]
async fn test_slot_outside_gaps_keeps_earlier_placements() {
    let d = fallback();
    let at = |h, m| d.at(NaiveTime::from_hms_opt(h, m, 0).unwrap());
    // Grocery is offered the middle of the routine entry.
    let oracle = gym_and_grocery().with_slot("Grocery shopping", Ok(Some(Slot::new(at(9, 45), at(10, 15)))));
    let config = SchedulerConfig::default();
    let input = InputAdapter::new(&oracle, &config)
        .prepare("Gym, groceries", &routine(), &fallback())
        .await
        .unwrap();

    let err = Scheduler::with_config(&oracle, config).run(input).await.unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::OracleContract {
            violation: ContractViolation::SlotOutsideGaps { .. },
            ..
        }
    ));
    assert_eq!(err.placed().len(), 1);
    assert_eq!(err.placed()[0].name, "Gym session");
}

#[tokio::test]
async fn test_unreachable_slot_oracle_leaves_event_unscheduled() {
    let oracle = gym_and_grocery().with_slot("Gym session", Err(OracleError::Transport("connection reset".into())));
    let config = SchedulerConfig::default();
    let input = InputAdapter::new(&oracle, &config)
        .prepare("Gym, groceries", &routine(), &fallback())
        .await
        .unwrap();

    let outcome = Scheduler::with_config(&oracle, config).run(input).await.unwrap();
    assert_eq!(outcome.placements.len(), 1);
    assert_eq!(outcome.placements[0].name, "Grocery shopping");
    assert_eq!(outcome.unscheduled.len(), 1);
    assert_eq!(outcome.unscheduled[0].name, "Gym session");
    assert!(matches!(outcome.unscheduled[0].reason, UnscheduledReason::Transport(_)));
}

#[tokio::test]
async fn test_transport_failures_can_be_fatal() {
    let oracle = gym_and_grocery().with_slot("Gym session", Err(OracleError::Transport("connection reset".into())));
    let config = SchedulerConfig {
        transport_failures_fatal: true,
        ..SchedulerConfig::default()
    };
    let input = InputAdapter::new(&oracle, &config)
        .prepare("Gym, groceries", &routine(), &fallback())
        .await
        .unwrap();

    let err = Scheduler::with_config(&oracle, config).run(input).await.unwrap_err();
    assert!(matches!(err, ScheduleError::OracleUnavailable { .. }));
    assert!(err.placed().is_empty());
}

#[tokio::test]
async fn test_exported_records_follow_placements() {
    let oracle = gym_and_grocery();
    let config = SchedulerConfig::default();
    let input = InputAdapter::new(&oracle, &config)
        .prepare("Gym, groceries", &routine(), &fallback())
        .await
        .unwrap();
    let outcome = Scheduler::with_config(&oracle, config).run(input).await.unwrap();

    let exporter = EventExporter::new("America/New_York")
        .with_attendee(Some("me@example.com".to_string()))
        .with_color_id(Some("1".to_string()));
    let mut sink = MemorySink::default();
    let written = sink.publish(&exporter.export_all(&outcome.placements)).unwrap();

    assert_eq!(written, 2);
    let gym = &sink.records[0];
    assert_eq!(gym.summary, "Gym session");
    assert_eq!(gym.start.date_time, "2024-04-22T11:00:00-04:00");
    assert_eq!(gym.end.date_time, "2024-04-22T12:00:00-04:00");
    assert_eq!(gym.start.time_zone, "America/New_York");
    assert_eq!(gym.attendees[0].email, "me@example.com");

    let json = serde_json::to_value(gym).unwrap();
    assert_eq!(json["colorId"], "1");
    assert_eq!(json["start"]["dateTime"], "2024-04-22T11:00:00-04:00");
}
