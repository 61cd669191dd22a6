//! MACD (Moving Average Convergence Divergence) indicator.

use super::ema::ema_series;
use crate::services::signals::Indicator;
use crate::types::{HistorySnapshot, MacdResult};

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
///
/// Buy signal: histogram turns positive
/// Sell signal: histogram turns negative
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }
}

impl Indicator for Macd {
    type Output = MacdResult;

    fn id(&self) -> &str {
        "macd"
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<MacdResult> {
        let closes = &history.prices;
        if closes.len() < self.min_periods() {
            return None;
        }

        let fast_ema = ema_series(closes, self.fast_period);
        let slow_ema = ema_series(closes, self.slow_period);

        // Both series are seeded on the first close, so they share indices
        let macd_line: Vec<f64> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();
        let signal_line = ema_series(&macd_line, self.signal_period);

        let n = macd_line.len();
        let macd = macd_line[n - 1];
        let signal = signal_line[n - 1];
        let histogram = macd - signal;
        let prev_histogram = macd_line[n - 2] - signal_line[n - 2];

        Some(MacdResult {
            macd,
            signal,
            histogram,
            prev_histogram,
            bullish_crossover: histogram > 0.0 && prev_histogram < 0.0,
            bearish_crossover: histogram < 0.0 && prev_histogram > 0.0,
        })
    }
}
