//! Resilient fetch of the current day's trades.
//!
//! The data source is unreliable. A fetch keeps retrying until it gets an
//! answer or shutdown is requested; there is no attempt limit.

use chrono::{Local, NaiveDate};
use power_core::{Cancelled, RetryPolicy, Trade};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::source::{PowerSource, SourceError};

/// Wraps a [`PowerSource`] in an unbounded, cancellable retry loop.
pub struct ResilientFetcher<S> {
    source: S,
    retry: RetryPolicy,
}

impl<S: PowerSource> ResilientFetcher<S> {
    /// Create a new fetcher.
    pub fn new(source: S, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch all trades for today's local date.
    ///
    /// The date is read once, when the call starts.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Trade>, Cancelled> {
        self.fetch_for(Local::now().date_naive(), cancel).await
    }

    /// Fetch all trades for `date`, retrying every failure.
    ///
    /// Returns `Err(Cancelled)` as soon as `cancel` fires, whether the source
    /// call or a backoff pause is in flight. A cancelled fetch never returns data.
    pub async fn fetch_for(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<Trade>, Cancelled> {
        let mut failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                result = self.source.get_trades(date) => result,
            };

            match result {
                Ok(trades) => {
                    if failures > 0 {
                        info!(%date, failures, "Fetched {} trades after {} failed attempts", trades.len(), failures);
                    } else {
                        debug!(%date, "Fetched {} trades", trades.len());
                    }
                    return Ok(trades);
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    match &err {
                        SourceError::Provider(msg) => error!(
                            attempt = failures,
                            kind = err.kind(),
                            "Error fetching data from power service: {}. Retrying...",
                            msg
                        ),
                        SourceError::Unexpected(e) => error!(
                            attempt = failures,
                            kind = err.kind(),
                            "Unexpected error while fetching data: {}. Retrying...",
                            e
                        ),
                    }
                    self.pause(failures, cancel).await?;
                }
            }
        }
    }

    async fn pause(&self, failures: u32, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let delay = self.retry.backoff(failures);
        if delay.is_zero() {
            // Immediate retry still hands the thread back to the runtime once.
            tokio::task::yield_now().await;
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
