//! Data acquisition for the power position extract.
//!
//! This crate handles:
//! - The data source abstraction and its error type
//! - Unbounded, cancellable retrying of fetches
//! - Aggregation of trade periods into 24 hourly buckets
//! - A simulated data source for local runs

pub mod aggregator;
pub mod fetcher;
pub mod simulated;
pub mod source;

pub use aggregator::PeriodAggregator;
pub use fetcher::ResilientFetcher;
pub use simulated::SimulatedPowerService;
pub use source::{PowerSource, SourceError};
