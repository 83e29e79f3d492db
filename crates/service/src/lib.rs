//! Periodic power position extract service.
//!
//! This crate wires the pieces together:
//! - Settings resolution (command line, config file, defaults)
//! - Console and rolling-file logging
//! - The cancellable periodic scheduler

pub mod logging;
pub mod scheduler;
pub mod settings;

pub use logging::{LogConfig, LogHandle};
pub use scheduler::{RunSummary, Scheduler, SchedulerConfig, SchedulerState, TickOutcome};
pub use settings::{ResolvedSettings, SettingsChain, SettingsSource};
