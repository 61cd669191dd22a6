//! Relative Strength Index (RSI) indicator.

use crate::services::signals::Indicator;
use crate::types::HistorySnapshot;

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Values range from 0-100:
/// - Below 30: Oversold (potential buy signal)
/// - Above 70: Overbought (potential sell signal)
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn to_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }

    /// Wilder-smoothed RSI after every bar.
    ///
    /// Element `j` is the RSI at price index `period + j`; empty when there
    /// are fewer than `period + 1` prices.
    pub fn series(prices: &[f64], period: usize) -> Vec<f64> {
        if period == 0 || prices.len() < period + 1 {
            return Vec::new();
        }

        let mut gains = Vec::with_capacity(prices.len() - 1);
        let mut losses = Vec::with_capacity(prices.len() - 1);

        for pair in prices.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        // Initial averages are simple means over the first period
        let mut avg_gain: f64 = gains.iter().take(period).sum::<f64>() / period as f64;
        let mut avg_loss: f64 = losses.iter().take(period).sum::<f64>() / period as f64;

        let mut values = Vec::with_capacity(gains.len() - period + 1);
        values.push(Self::to_rsi(avg_gain, avg_loss));

        for i in period..gains.len() {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
            values.push(Self::to_rsi(avg_gain, avg_loss));
        }

        values
    }

    /// Latest RSI value.
    pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
        Self::series(prices, period).last().copied()
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn id(&self) -> &str {
        "rsi"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<f64> {
        Self::calculate_rsi(&history.prices, self.period)
    }
}
