//! # Dayplan Core Library
//!
//! Greedy placement of flexible events into the free time of one day.
//! All decisions that need judgement (how long, which first, where) are
//! delegated to an [`Oracle`]; this crate owns the timeline arithmetic and
//! refuses oracle answers that would break it.
//!
//! ## Architecture
//!
//! - **Timeline**: Busy intervals of a day bracketed by sentinels, and the
//!   gaps between them
//! - **Oracle**: Duration estimates, priority ranking and slot choice, with
//!   a chat-completion backend and a deterministic local one
//! - **Scheduler**: Single pass over events in priority order, placing each
//!   at most once
//! - **Export**: Calendar event records for the placements
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Runs one planning pass
//! - [`Timeline`]: Busy intervals and gap finding
//! - [`InputAdapter`]: Turns text and routine entries into a run's input
//! - [`EventExporter`]: Placement to calendar record conversion
//! - [`Config`]: Application configuration management

pub mod calendar;
pub mod error;
pub mod export;
pub mod input;
pub mod oracle;
pub mod scheduler;
pub mod storage;
pub mod timeline;

pub use calendar::{planning_date, CalendarSink, CalendarSource, JsonFileSink, JsonFileSource, MemorySink};
pub use error::{CalendarError, ConfigError, ContractViolation, CoreError, InputError, OracleError, ScheduleError};
pub use export::{CalendarEventRecord, EventExporter};
pub use input::{InputAdapter, RoutineEntry};
pub use oracle::{CompletionOracle, ExtractedEvent, LocalOracle, Oracle, Slot, SlotPolicy, SlotRequest};
pub use scheduler::{
    PendingEvent, Placement, ScheduleInput, ScheduleOutcome, Scheduler, SchedulerConfig, Unscheduled,
    UnscheduledReason,
};
pub use storage::Config;
pub use timeline::{DayContext, DayWindow, Gap, Interval, Timeline};
