//! Core types and configuration for the power position extract.
//!
//! This crate provides shared types used across all other crates:
//! - Trade data as delivered by the data source
//! - The fixed 24-slot aggregation model
//! - Configuration and policy types
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{PeriodIndexPolicy, RetryPolicy, RoundingPolicy, Settings};
pub use error::{Cancelled, Error, Result};
pub use types::*;
