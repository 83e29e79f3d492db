//! Core data types for the power position extract.

use serde::{Deserialize, Serialize};

/// Number of hourly periods in a trading day.
pub const PERIODS_PER_DAY: usize = 24;

/// Header row of every report file.
pub const REPORT_HEADER: &str = "Local Time,Volume";

/// Label of an aggregation slot, e.g. `"23:00"` for slot 0.
///
/// The trading day starts at 23:00 local time on the previous calendar day, so
/// the label is the slot index rotated back by one hour.
pub fn slot_label(slot: usize) -> String {
    format!("{:02}:00", (slot + PERIODS_PER_DAY - 1) % PERIODS_PER_DAY)
}

/// Slot index for a 1-based period index, or `None` if it is outside `1..=24`.
#[inline]
pub fn period_slot(period_index: i32) -> Option<usize> {
    if (1..=PERIODS_PER_DAY as i32).contains(&period_index) {
        Some(period_index as usize - 1)
    } else {
        None
    }
}

/// One hour-slot of a trade, as supplied by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePeriod {
    /// 1-based period index (1..=24).
    pub period_index: i32,
    /// Traded volume. May be negative or fractional.
    pub volume: f64,
}

impl TradePeriod {
    /// Create a new trade period.
    pub fn new(period_index: i32, volume: f64) -> Self {
        Self {
            period_index,
            volume,
        }
    }
}

/// A trade for one query date: zero or more periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Periods of this trade.
    pub periods: Vec<TradePeriod>,
}

impl Trade {
    /// Create a trade from its periods.
    pub fn new(periods: Vec<TradePeriod>) -> Self {
        Self { periods }
    }
}

/// One of the 24 fixed output slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucket {
    /// Local hour label (`HH:00`).
    pub label: String,
    /// Accumulated volume.
    pub volume: f64,
}

impl AggregationBucket {
    /// Create an empty bucket for the given slot index.
    pub fn for_slot(slot: usize) -> Self {
        Self {
            label: slot_label(slot),
            volume: 0.0,
        }
    }
}

/// A period that could not be mapped onto a slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvalidPeriod {
    /// Position of the owning trade in the fetch result.
    pub trade: usize,
    /// The offending period.
    pub period: TradePeriod,
}

/// Result of aggregating one fetch: exactly 24 buckets in slot order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Buckets, indexed by slot.
    pub buckets: [AggregationBucket; PERIODS_PER_DAY],
    /// Periods dropped because their index was out of range.
    pub skipped: Vec<InvalidPeriod>,
}

impl Aggregation {
    /// 24 zero-volume buckets.
    pub fn empty() -> Self {
        Self {
            buckets: std::array::from_fn(AggregationBucket::for_slot),
            skipped: Vec::new(),
        }
    }

    /// Sum of all bucket volumes.
    pub fn total_volume(&self) -> f64 {
        self.buckets.iter().map(|b| b.volume).sum()
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Self::empty()
    }
}
