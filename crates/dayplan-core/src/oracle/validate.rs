//! Strict checks applied to every oracle answer.
//!
//! Anything that deviates from the expected shape is a
//! [`ContractViolation`]; nothing is repaired or guessed.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use super::{ExtractedEvent, Slot};
use crate::error::ContractViolation;
use crate::timeline::{DayContext, Gap};

/// The ranking must name every requested event exactly once and nothing else.
pub fn check_permutation(requested: &[String], ranked: &[String]) -> Result<(), ContractViolation> {
    let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for name in ranked {
        *seen.entry(name.as_str()).or_default() += 1;
    }

    let missing: Vec<String> = requested
        .iter()
        .filter(|n| !seen.contains_key(n.as_str()))
        .cloned()
        .collect();
    let mut unexpected: Vec<String> = seen
        .keys()
        .filter(|n| !wanted.contains(*n))
        .map(|n| n.to_string())
        .collect();
    let mut repeated: Vec<String> = seen
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(n, _)| n.to_string())
        .collect();
    unexpected.sort();
    repeated.sort();

    if missing.is_empty() && unexpected.is_empty() && repeated.is_empty() {
        Ok(())
    } else {
        Err(ContractViolation::NotAPermutation {
            missing,
            unexpected,
            repeated,
        })
    }
}

/// Estimates must be strictly positive.
pub fn check_estimate(event: &str, estimate: Duration) -> Result<Duration, ContractViolation> {
    if estimate <= Duration::zero() {
        return Err(ContractViolation::NonPositiveDuration {
            event: event.to_string(),
            minutes: estimate.num_minutes(),
        });
    }
    Ok(estimate)
}

/// A slot must be non-empty, on the planned day and inside one candidate gap.
///
/// The requested duration is a soft lower bound and is not checked here.
pub fn check_slot(event: &str, slot: &Slot, gaps: &[Gap], day: &DayContext) -> Result<(), ContractViolation> {
    if slot.end <= slot.start {
        return Err(ContractViolation::InvertedSlot {
            event: event.to_string(),
            start: slot.start,
            end: slot.end,
        });
    }

    for ts in [&slot.start, &slot.end] {
        let found = day.local_date(ts);
        if found != day.date {
            return Err(ContractViolation::SlotWrongDay {
                event: event.to_string(),
                expected: day.date,
                found,
            });
        }
    }

    let start = slot.start.with_timezone(&day.offset).time();
    let end = slot.end.with_timezone(&day.offset).time();
    if !gaps.iter().any(|g| g.contains(start, end)) {
        return Err(ContractViolation::SlotOutsideGaps {
            event: event.to_string(),
            start: slot.start,
            end: slot.end,
        });
    }
    Ok(())
}

/// Extracted events need distinct, non-empty names and non-negative durations.
pub fn check_extracted(events: &[ExtractedEvent]) -> Result<(), ContractViolation> {
    let mut names = HashSet::new();
    for event in events {
        if event.name.trim().is_empty() {
            return Err(ContractViolation::EmptyEventName);
        }
        if event.duration < Duration::zero() {
            return Err(ContractViolation::NegativeDuration {
                event: event.name.clone(),
                minutes: event.duration.num_minutes(),
            });
        }
        if !names.insert(event.name.as_str()) {
            return Err(ContractViolation::DuplicateEvent(event.name.clone()));
        }
    }
    Ok(())
}

/// Parse the compact `Name, minutes; Name, minutes` event list.
///
/// Every entry needs exactly one comma and a whole number of minutes.
/// Blank entries (e.g. a trailing `;`) are ignored.
pub fn parse_event_list(text: &str) -> Result<Vec<ExtractedEvent>, ContractViolation> {
    let unparseable = || ContractViolation::Unparseable {
        what: "event list",
        raw: text.to_string(),
    };

    let mut events = Vec::new();
    for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, minutes) = entry.split_once(',').ok_or_else(unparseable)?;
        if minutes.contains(',') {
            return Err(unparseable());
        }
        let minutes: i64 = minutes.trim().parse().map_err(|_| unparseable())?;
        events.push(ExtractedEvent::new(name.trim(), minutes));
    }
    check_extracted(&events)?;
    Ok(events)
}

/// Drop a Markdown code fence wrapped around a model answer, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Skip an info string such as "json" on the opening line.
    match body.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('{') => rest.trim(),
        _ => body.trim(),
    }
}
