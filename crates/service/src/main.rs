//! `power-position`: writes an hourly day-ahead power position report every
//! interval until interrupted.
//!
//! Usage:
//!   power-position [OUTPUT_FOLDER INTERVAL_MINUTES] [--config appsettings.json]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use power_core::{PeriodIndexPolicy, RetryPolicy, RoundingPolicy};
use power_ingestion::SimulatedPowerService;
use power_service::settings::DEFAULT_CONFIG_FILE;
use power_service::{logging, LogConfig, Scheduler, SchedulerConfig, SettingsChain};
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, Dispatch};

#[derive(Parser, Debug)]
#[command(name = "power-position", author, version, about)]
struct Cli {
    /// Existing folder receiving the report files
    output_folder: Option<String>,

    /// Minutes between extracts (positive integer)
    interval_minutes: Option<String>,

    /// JSON settings file with OutputFolder and IntervalMinutes
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Folder for the daily log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// What to do with trade periods outside 1..=24
    #[arg(long, value_enum, default_value_t = PeriodPolicyArg::Skip)]
    period_index_policy: PeriodPolicyArg,

    /// Rounding of fractional volumes in the report
    #[arg(long, value_enum, default_value_t = RoundingArg::HalfEven)]
    rounding: RoundingArg,

    /// Pause after the first failed fetch, in milliseconds (0 = retry immediately)
    #[arg(long, default_value_t = 250)]
    retry_initial_ms: u64,

    /// Longest pause between failed fetches, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    retry_max_ms: u64,

    /// Probability that a simulated power service call fails
    #[arg(long, default_value_t = 0.1)]
    simulated_failure_rate: f64,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PeriodPolicyArg {
    Skip,
    Reject,
}

impl From<PeriodPolicyArg> for PeriodIndexPolicy {
    fn from(arg: PeriodPolicyArg) -> Self {
        match arg {
            PeriodPolicyArg::Skip => PeriodIndexPolicy::Skip,
            PeriodPolicyArg::Reject => PeriodIndexPolicy::Reject,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RoundingArg {
    HalfEven,
    HalfAwayFromZero,
}

impl From<RoundingArg> for RoundingPolicy {
    fn from(arg: RoundingArg) -> Self {
        match arg {
            RoundingArg::HalfEven => RoundingPolicy::HalfEven,
            RoundingArg::HalfAwayFromZero => RoundingPolicy::HalfAwayFromZero,
        }
    }
}

impl Cli {
    fn retry_policy(&self) -> RetryPolicy {
        if self.retry_initial_ms == 0 {
            return RetryPolicy::immediate();
        }
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.retry_initial_ms),
            max_backoff: Duration::from_millis(self.retry_max_ms.max(self.retry_initial_ms)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log = logging::init(&LogConfig::new(&cli.log_dir))?;
    let dispatch = log.dispatch();
    let result = run(cli, dispatch.clone()).with_subscriber(dispatch).await;

    // Flush the file sink before exiting.
    drop(log);
    result
}

async fn run(cli: Cli, log: Dispatch) -> anyhow::Result<()> {
    let chain = SettingsChain::standard(
        cli.output_folder.clone(),
        cli.interval_minutes.clone(),
        cli.config.clone(),
        std::env::current_dir()?,
    );
    let resolved = chain.resolve()?;
    let settings = &resolved.settings;
    info!(
        "Using OutputFolder=\"{}\", IntervalMinutes={} (from {})",
        settings.output_folder.display(),
        settings.interval_minutes,
        resolved.source
    );

    let config = SchedulerConfig::from_settings(settings)
        .period_index_policy(cli.period_index_policy.into())
        .rounding(cli.rounding.into())
        .retry(cli.retry_policy());
    let source = SimulatedPowerService::new().failure_rate(cli.simulated_failure_rate);
    let scheduler = Scheduler::new(config, source, log)?;

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    info!("Service started. Press Ctrl+C to stop.");
    let summary = scheduler.run(cancel).await;
    info!(
        written = summary.ticks_written,
        failed = summary.ticks_failed,
        "Service stopped."
    );
    Ok(())
}

/// Turn Ctrl+C into a cancellation request instead of process termination.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
                return;
            }
            info!("Stopping...");
            cancel.cancel();
        }
        .with_current_subscriber(),
    );
}
