use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use dayplan_core::{
    CalendarEventRecord, CalendarSink, CompletionOracle, Config, InputAdapter, JsonFileSink, LocalOracle, Oracle,
    Scheduler,
};
use serde::Serialize;
use tracing::{info, warn};

use super::{load_routine, resolve_day};

#[derive(Args)]
pub struct PlanArgs {
    /// Events to place, in free text
    #[arg(long, conflicts_with = "text_file", required_unless_present = "text_file")]
    pub text: Option<String>,
    /// Read the free text from a file
    #[arg(long)]
    pub text_file: Option<PathBuf>,
    /// JSON file with the fixed routine
    #[arg(long)]
    pub routine: Option<PathBuf>,
    /// Day to plan (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Write calendar event records to this file
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Use the deterministic local oracle instead of the completion endpoint
    #[arg(long)]
    pub offline: bool,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    placements: &'a [dayplan_core::Placement],
    unscheduled: &'a [dayplan_core::Unscheduled],
    events: &'a [CalendarEventRecord],
}

pub async fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let scheduler_config = config.scheduler_config()?;
    let day = resolve_day(&config, args.date)?;
    let routine = load_routine(args.routine.as_deref(), day.date)?;

    let text = match (&args.text, &args.text_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Err("either --text or --text-file is required".into()),
    };

    let oracle: Box<dyn Oracle> = if args.offline {
        Box::new(LocalOracle::default())
    } else {
        let settings = config.completion_settings();
        if settings.api_key.is_none() {
            warn!(env = %config.oracle.api_key_env, "no API key set; requests are sent unauthenticated");
        }
        Box::new(CompletionOracle::new(settings))
    };

    let input = InputAdapter::new(oracle.as_ref(), &scheduler_config)
        .prepare(&text, &routine, &day)
        .await?;
    info!(date = %input.timeline.day().date, events = input.pending.len(), "planning");

    let exporter = config.exporter();
    let outcome = match Scheduler::with_config(oracle.as_ref(), scheduler_config).run(input).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Keep what was placed before the run was aborted.
            if let Some(path) = &args.out {
                let written = JsonFileSink::new(path).publish(&exporter.export_all(e.placed()))?;
                warn!(written, path = %path.display(), "partial schedule written");
            }
            return Err(e.into());
        }
    };

    let events = exporter.export_all(&outcome.placements);
    if let Some(path) = &args.out {
        let written = JsonFileSink::new(path).publish(&events)?;
        info!(written, path = %path.display(), "events written");
    }

    if args.json {
        let report = PlanReport {
            placements: &outcome.placements,
            unscheduled: &outcome.unscheduled,
            events: &events,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", outcome.timeline.day().date);
    if outcome.placements.is_empty() {
        println!("  nothing placed");
    }
    for placement in &outcome.placements {
        println!("  {placement}");
    }
    if !outcome.unscheduled.is_empty() {
        println!("unscheduled:");
        for item in &outcome.unscheduled {
            println!("  {item}");
        }
    }
    Ok(())
}
