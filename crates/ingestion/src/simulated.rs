//! Simulated trading system.
//!
//! Stands in for the vendor's power service when running locally: random
//! trades covering all 24 periods, random latency and random provider failures.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use power_core::{Trade, TradePeriod, PERIODS_PER_DAY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::source::{PowerSource, SourceError};

/// Random trade generator implementing [`PowerSource`].
pub struct SimulatedPowerService {
    rng: Mutex<StdRng>,
    /// Probability in `[0, 1]` that a call fails.
    failure_rate: f64,
    /// Upper bound on trades per call (at least one is returned).
    max_trades: usize,
    /// Upper bound on the simulated call latency.
    max_latency: Duration,
}

impl SimulatedPowerService {
    /// Create a new simulated service seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a deterministic simulated service.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            failure_rate: 0.1,
            max_trades: 5,
            max_latency: Duration::from_millis(200),
        }
    }

    /// Set the failure probability, clamped to `[0, 1]`. NaN disables failures.
    pub fn failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    /// Set the maximum number of trades per call.
    pub fn max_trades(mut self, max_trades: usize) -> Self {
        self.max_trades = max_trades.max(1);
        self
    }

    /// Set the maximum simulated latency.
    pub fn max_latency(mut self, latency: Duration) -> Self {
        self.max_latency = latency;
        self
    }

    /// Draw the latency and the outcome of one call.
    fn draw(&self, date: NaiveDate) -> (Duration, Result<Vec<Trade>, SourceError>) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let latency = if self.max_latency.is_zero() {
            Duration::ZERO
        } else {
            self.max_latency.mul_f64(rng.gen::<f64>())
        };

        if rng.gen_bool(self.failure_rate) {
            return (
                latency,
                Err(SourceError::provider(format!(
                    "power service failed to return trades for {}",
                    date
                ))),
            );
        }

        let count = rng.gen_range(1..=self.max_trades);
        let trades = (0..count)
            .map(|_| {
                Trade::new(
                    (1..=PERIODS_PER_DAY as i32)
                        .map(|index| TradePeriod::new(index, rng.gen_range(-100.0..400.0)))
                        .collect(),
                )
            })
            .collect();

        (latency, Ok(trades))
    }
}

impl Default for SimulatedPowerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PowerSource for SimulatedPowerService {
    async fn get_trades(&self, date: NaiveDate) -> Result<Vec<Trade>, SourceError> {
        let (latency, outcome) = self.draw(date);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}
