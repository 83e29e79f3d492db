//! Data source abstraction.
//!
//! [`PowerSource`] is the single operation the service needs from the trading
//! system: all trades for a date. Implementations may fail at any time; every
//! failure is treated as transient by the fetcher.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use power_core::Trade;
use thiserror::Error;

/// Failure reported by a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider signalled a known failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// Anything else.
    #[error("unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl SourceError {
    /// Create a provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        SourceError::Provider(msg.into())
    }

    /// Short classification used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Provider(_) => "provider",
            SourceError::Unexpected(_) => "unexpected",
        }
    }
}

/// Provider of a day's trades.
#[async_trait]
pub trait PowerSource: Send + Sync {
    /// Fetch every trade for `date`. An empty vector is a valid answer.
    async fn get_trades(&self, date: NaiveDate) -> Result<Vec<Trade>, SourceError>;
}

#[async_trait]
impl<S: PowerSource + ?Sized> PowerSource for Arc<S> {
    async fn get_trades(&self, date: NaiveDate) -> Result<Vec<Trade>, SourceError> {
        (**self).get_trades(date).await
    }
}

#[async_trait]
impl<S: PowerSource + ?Sized> PowerSource for Box<S> {
    async fn get_trades(&self, date: NaiveDate) -> Result<Vec<Trade>, SourceError> {
        (**self).get_trades(date).await
    }
}
