use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use dayplan_core::{Config, InputAdapter, LocalOracle};

use super::{load_routine, resolve_day};

#[derive(Args)]
pub struct GapsArgs {
    /// JSON file with the fixed routine
    #[arg(long)]
    pub routine: Option<PathBuf>,
    /// Day to inspect (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: GapsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let scheduler_config = config.scheduler_config()?;
    let day = resolve_day(&config, args.date)?;
    let routine = load_routine(args.routine.as_deref(), day.date)?;

    // Seeding never consults the oracle.
    let oracle = LocalOracle::default();
    let timeline = InputAdapter::new(&oracle, &scheduler_config).seed_timeline(&routine, &day)?;
    let gaps = timeline.gaps();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&gaps)?);
        return Ok(());
    }

    let window = timeline.window();
    println!(
        "{} ({}-{})",
        timeline.day().date,
        window.start.format("%H:%M"),
        window.end.format("%H:%M")
    );
    for interval in timeline.busy() {
        println!("  busy {interval}");
    }
    if gaps.is_empty() {
        println!("  no free time");
    }
    for gap in &gaps {
        println!("  free {gap} ({} min)", gap.duration_minutes());
    }
    Ok(())
}
