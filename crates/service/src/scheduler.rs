//! Periodic extract scheduler.
//!
//! Runs one tick (fetch, aggregate, write) immediately and then once per
//! interval, measured between tick starts. Ticks never overlap and a late tick
//! is followed by the next regular boundary rather than a catch-up burst. A
//! failing tick is logged and the schedule carries on; cancellation ends it.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use power_core::{
    Cancelled, Error, PeriodIndexPolicy, Result, RetryPolicy, RoundingPolicy, Settings,
};
use power_ingestion::{PeriodAggregator, PowerSource, ResilientFetcher};
use power_report::ReportWriter;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn, Dispatch};

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, not started.
    Idle,
    /// Ticking on the interval.
    Running,
    /// Cancellation observed; the current tick is unwinding.
    Stopping,
    /// Terminal.
    Stopped,
}

/// How a tick ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A report was written to this path.
    Written(PathBuf),
    /// Shutdown was requested before the report was written.
    Cancelled,
}

/// Tick counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks that wrote a report.
    pub ticks_written: u64,
    /// Ticks that failed and were skipped.
    pub ticks_failed: u64,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between tick starts. Must be non-zero.
    pub interval: Duration,
    /// Existing directory receiving reports.
    pub output_folder: PathBuf,
    /// Handling of out-of-range period indices.
    pub period_index_policy: PeriodIndexPolicy,
    /// Volume rounding in reports.
    pub rounding: RoundingPolicy,
    /// Pause schedule between failed fetch attempts.
    pub retry: RetryPolicy,
}

impl SchedulerConfig {
    /// Configuration for resolved settings with default policies.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.interval(),
            output_folder: settings.output_folder.clone(),
            period_index_policy: PeriodIndexPolicy::default(),
            rounding: RoundingPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the period index policy.
    pub fn period_index_policy(mut self, policy: PeriodIndexPolicy) -> Self {
        self.period_index_policy = policy;
        self
    }

    /// Override the rounding policy.
    pub fn rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    /// Override the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Drives fetch, aggregate and write once per interval until cancelled.
pub struct Scheduler<S> {
    fetcher: ResilientFetcher<S>,
    aggregator: PeriodAggregator,
    writer: ReportWriter,
    interval: Duration,
    log: Dispatch,
    state: watch::Sender<SchedulerState>,
}

impl<S: PowerSource> Scheduler<S> {
    /// Create an idle scheduler. Everything it logs goes to `log`.
    pub fn new(config: SchedulerConfig, source: S, log: Dispatch) -> Result<Self> {
        if config.interval.is_zero() {
            return Err(Error::config("scheduler interval must be greater than zero"));
        }
        let (state, _) = watch::channel(SchedulerState::Idle);

        Ok(Self {
            fetcher: ResilientFetcher::new(source, config.retry),
            aggregator: PeriodAggregator::new(config.period_index_policy),
            writer: ReportWriter::new(config.output_folder, config.rounding),
            interval: config.interval,
            log,
            state,
        })
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch state changes. Subscribe before calling [`Scheduler::run`].
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run until `cancel` fires, returning once the scheduler is `Stopped`.
    pub async fn run(self, cancel: CancellationToken) -> RunSummary {
        let log = self.log.clone();
        self.run_loop(&cancel).with_subscriber(log).await
    }

    /// Run a single tick outside the schedule.
    pub async fn tick(&self, cancel: &CancellationToken) -> Result<TickOutcome> {
        self.run_tick(cancel).with_subscriber(self.log.clone()).await
    }

    async fn run_loop(&self, cancel: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut next_start = Instant::now();

        self.set_state(SchedulerState::Running);
        info!(interval_secs = self.interval.as_secs(), "Scheduler running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next_start) => {}
            }

            let tick = self.run_tick(cancel);
            tokio::pin!(tick);
            let finished = tokio::select! {
                result = &mut tick => Some(result),
                _ = cancel.cancelled() => None,
            };
            let result = match finished {
                Some(result) => result,
                None => {
                    self.set_state(SchedulerState::Stopping);
                    tick.await
                }
            };

            match result {
                Ok(TickOutcome::Written(_)) => summary.ticks_written += 1,
                Ok(TickOutcome::Cancelled) => break,
                Err(e) => {
                    summary.ticks_failed += 1;
                    error!("Error: {}", e);
                }
            }

            next_start = next_boundary(next_start, Instant::now(), self.interval);
        }

        self.set_state(SchedulerState::Stopping);
        info!(
            written = summary.ticks_written,
            failed = summary.ticks_failed,
            "Scheduler stopped"
        );
        self.set_state(SchedulerState::Stopped);
        summary
    }

    async fn run_tick(&self, cancel: &CancellationToken) -> Result<TickOutcome> {
        info!("Next execution...");
        info!("Task started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

        let trades = match self.fetcher.fetch(cancel).await {
            Ok(trades) => trades,
            Err(Cancelled) => {
                info!("Fetch abandoned, shutdown requested");
                return Ok(TickOutcome::Cancelled);
            }
        };

        let aggregation = self.aggregator.aggregate(&trades)?;
        debug!(
            trades = trades.len(),
            total_volume = aggregation.total_volume(),
            "Aggregated trades"
        );
        for skipped in &aggregation.skipped {
            warn!(
                trade = skipped.trade,
                period_index = skipped.period.period_index,
                volume = skipped.period.volume,
                "Skipping period with index outside 1..=24"
            );
        }

        if cancel.is_cancelled() {
            info!("Shutdown requested, report not written");
            return Ok(TickOutcome::Cancelled);
        }

        let path = self.writer.write_now(&aggregation.buckets).await?;
        info!("Task finished at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        Ok(TickOutcome::Written(path))
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}

/// First boundary `start + k * interval`, `k >= 1`, that is not before `now`.
///
/// Boundaries a long tick ran past are dropped rather than run late.
fn next_boundary(start: Instant, now: Instant, interval: Duration) -> Instant {
    let elapsed = now.saturating_duration_since(start).as_nanos();
    let periods = elapsed.div_ceil(interval.as_nanos().max(1)).max(1);
    let periods = u32::try_from(periods).unwrap_or(u32::MAX);

    interval
        .checked_mul(periods)
        .and_then(|offset| start.checked_add(offset))
        .unwrap_or(now + interval)
}
