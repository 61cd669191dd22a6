//! Fast/slow EMA trend filter.

use super::ema::ema_series;
use crate::services::signals::Indicator;
use crate::types::{HistorySnapshot, TrendResult};

/// Trend filter built from two EMAs (20/50 by default).
///
/// - Fast above slow = bullish trend
/// - Fast crossing above slow on the latest bar = bullish crossover
pub struct TrendEmas {
    fast_period: usize,
    slow_period: usize,
}

impl Default for TrendEmas {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
        }
    }
}

impl TrendEmas {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
        }
    }
}

impl Indicator for TrendEmas {
    type Output = TrendResult;

    fn id(&self) -> &str {
        "trend"
    }

    fn min_periods(&self) -> usize {
        self.slow_period.max(2)
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<TrendResult> {
        let prices = &history.prices;
        if prices.len() < self.min_periods() {
            return None;
        }

        let fast = ema_series(prices, self.fast_period);
        let slow = ema_series(prices, self.slow_period);
        let n = prices.len();

        let (ema_fast, ema_slow) = (fast[n - 1], slow[n - 1]);
        let (prev_fast, prev_slow) = (fast[n - 2], slow[n - 2]);

        let trend_strength = if ema_slow != 0.0 {
            (ema_fast - ema_slow).abs() / ema_slow * 100.0
        } else {
            0.0
        };

        Some(TrendResult {
            ema_fast,
            ema_slow,
            bullish_trend: ema_fast > ema_slow,
            bearish_trend: ema_fast < ema_slow,
            bullish_crossover: ema_fast > ema_slow && prev_fast <= prev_slow,
            bearish_crossover: ema_fast < ema_slow && prev_fast >= prev_slow,
            trend_strength,
        })
    }
}
