//! Hourly volume aggregation.
//!
//! Folds the trades of one fetch into the fixed 24-slot layout. Period index
//! `p` always lands in slot `p - 1`; only the slot label is rotated.

use power_core::{
    period_slot, Aggregation, Error, InvalidPeriod, PeriodIndexPolicy, Result, Trade,
};

/// Aggregator for the 24 hourly buckets of a trading day.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodAggregator {
    /// Handling of out-of-range period indices.
    policy: PeriodIndexPolicy,
}

impl PeriodAggregator {
    /// Create a new aggregator.
    pub fn new(policy: PeriodIndexPolicy) -> Self {
        Self { policy }
    }

    /// Aggregate all periods of all trades.
    ///
    /// Always yields 24 buckets in slot order; with no trades every volume is 0.
    /// Periods sharing an index are summed, across trades as well as within one.
    pub fn aggregate(&self, trades: &[Trade]) -> Result<Aggregation> {
        let mut aggregation = Aggregation::empty();

        for (trade_pos, trade) in trades.iter().enumerate() {
            for period in &trade.periods {
                match period_slot(period.period_index) {
                    Some(slot) => aggregation.buckets[slot].volume += period.volume,
                    None => match self.policy {
                        PeriodIndexPolicy::Skip => aggregation.skipped.push(InvalidPeriod {
                            trade: trade_pos,
                            period: *period,
                        }),
                        PeriodIndexPolicy::Reject => {
                            return Err(Error::data_integrity(format!(
                                "trade {} has period index {} outside 1..=24",
                                trade_pos, period.period_index
                            )));
                        }
                    },
                }
            }
        }

        Ok(aggregation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use power_core::{slot_label, TradePeriod, PERIODS_PER_DAY};

    fn make_trade(periods: &[(i32, f64)]) -> Trade {
        Trade::new(
            periods
                .iter()
                .map(|&(index, volume)| TradePeriod::new(index, volume))
                .collect(),
        )
    }

    #[test]
    fn test_full_day_lands_in_matching_slots() {
        let periods: Vec<(i32, f64)> = (1..=24).map(|p| (p, p as f64 * 10.5 - 3.0)).collect();
        let aggregator = PeriodAggregator::default();

        let agg = aggregator.aggregate(&[make_trade(&periods)]).unwrap();

        for (index, volume) in periods {
            let bucket = &agg.buckets[(index - 1) as usize];
            assert_relative_eq!(bucket.volume, volume);
        }
    }

    #[test]
    fn test_label_table() {
        let agg = PeriodAggregator::default().aggregate(&[]).unwrap();
        let expected = [
            "23:00", "00:00", "01:00", "02:00", "03:00", "04:00", "05:00", "06:00", "07:00",
            "08:00", "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00",
            "17:00", "18:00", "19:00", "20:00", "21:00", "22:00",
        ];
        for (slot, label) in expected.iter().enumerate() {
            assert_eq!(agg.buckets[slot].label, *label);
            assert_eq!(slot_label(slot), *label);
        }
    }

    #[test]
    fn test_no_trades() {
        let agg = PeriodAggregator::default().aggregate(&[]).unwrap();

        assert_eq!(agg.buckets.len(), PERIODS_PER_DAY);
        assert!(agg.buckets.iter().all(|b| b.volume == 0.0));
        assert_eq!(agg, power_core::Aggregation::empty());
    }

    #[test]
    fn test_same_period_across_trades_sums() {
        let trades = vec![make_trade(&[(5, 10.0)]), make_trade(&[(5, 3.5)])];

        let agg = PeriodAggregator::default().aggregate(&trades).unwrap();

        assert_relative_eq!(agg.buckets[4].volume, 13.5);
        assert_relative_eq!(agg.total_volume(), 13.5);
    }

    #[test]
    fn test_negative_volumes_net_out() {
        let trades = vec![make_trade(&[(1, 100.0)]), make_trade(&[(1, -40.0), (2, -5.0)])];

        let agg = PeriodAggregator::default().aggregate(&trades).unwrap();

        assert_relative_eq!(agg.buckets[0].volume, 60.0);
        assert_relative_eq!(agg.buckets[1].volume, -5.0);
    }

    #[test]
    fn test_out_of_range_skipped() {
        let trades = vec![make_trade(&[(0, 1.0), (3, 2.0), (25, 4.0)])];

        let agg = PeriodAggregator::new(PeriodIndexPolicy::Skip)
            .aggregate(&trades)
            .unwrap();

        assert_relative_eq!(agg.total_volume(), 2.0);
        assert_eq!(agg.skipped.len(), 2);
        assert_eq!(agg.skipped[0].period.period_index, 0);
        assert_eq!(agg.skipped[1].period.period_index, 25);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let trades = vec![make_trade(&[(3, 2.0)]), make_trade(&[(30, 1.0)])];

        let result = PeriodAggregator::new(PeriodIndexPolicy::Reject).aggregate(&trades);

        assert!(matches!(result, Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn test_deterministic() {
        let trades = vec![make_trade(&[(7, 1.25), (8, 2.5)]), make_trade(&[(7, 0.75)])];
        let aggregator = PeriodAggregator::default();

        assert_eq!(
            aggregator.aggregate(&trades).unwrap(),
            aggregator.aggregate(&trades).unwrap()
        );
    }
}
