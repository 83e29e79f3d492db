//! Log sinks for the service.
//!
//! Builds a console sink and a daily-rolling file sink and hands them back as a
//! [`Dispatch`] rather than installing a global subscriber. Whoever owns the
//! handle decides which code logs through it.

use std::path::PathBuf;

use anyhow::Context as _;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Where and how to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the rolling log files. Created if missing.
    pub directory: PathBuf,
    /// Log file name prefix; files are `<prefix>.YYYY-MM-DD.txt`.
    pub file_prefix: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl LogConfig {
    /// Log into `directory` at `info` level.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: "log".to_string(),
            default_filter: "info".to_string(),
        }
    }
}

/// Logging capability handed to the scheduler.
///
/// Dropping the handle flushes and stops the background file writer.
pub struct LogHandle {
    dispatch: Dispatch,
    _guard: WorkerGuard,
}

impl LogHandle {
    /// Dispatcher to run code under.
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }
}

/// Build the console and file sinks described by `config`.
pub fn init(config: &LogConfig) -> anyhow::Result<LogHandle> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory {}", config.directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("txt")
        .build(&config.directory)
        .with_context(|| format!("opening log file in {}", config.directory.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new("%H:%M:%S".to_string()));
    let file = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_writer(file_writer);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file);

    Ok(LogHandle {
        dispatch: Dispatch::new(subscriber),
        _guard: guard,
    })
}
