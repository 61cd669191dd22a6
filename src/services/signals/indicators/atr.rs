//! Average True Range (ATR) indicator.

use crate::services::signals::Indicator;
use crate::types::HistorySnapshot;

/// ATR (Average True Range) indicator.
///
/// Measures market volatility by averaging true ranges:
/// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
///
/// Reported in price units so it can size ATR-based stops.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Calculate True Range.
    fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
        let hl = high - low;
        let hc = (high - prev_close).abs();
        let lc = (low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Wilder-smoothed ATR from parallel high/low/close series.
    pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
        let len = closes.len().min(highs.len()).min(lows.len());
        if period == 0 || len < period + 1 {
            return None;
        }

        let true_ranges: Vec<f64> = (1..len)
            .map(|i| Self::true_range(highs[i], lows[i], closes[i - 1]))
            .collect();

        let mut atr = true_ranges.iter().take(period).sum::<f64>() / period as f64;
        for tr in true_ranges.iter().skip(period) {
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
        }

        Some(atr.max(0.0))
    }
}

impl Indicator for Atr {
    type Output = f64;

    fn id(&self) -> &str {
        "atr"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<f64> {
        Self::calculate_atr(&history.highs, &history.lows, &history.prices, self.period)
    }
}
