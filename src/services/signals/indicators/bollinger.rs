//! Bollinger Bands indicator.

use crate::services::signals::Indicator;
use crate::types::{BollingerResult, HistorySnapshot};

/// Position below which price is considered to be touching the lower band.
const LOWER_TOUCH: f64 = 0.2;
/// Position above which price is considered to be touching the upper band.
const UPPER_TOUCH: f64 = 0.8;

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// Signals:
/// - Price near lower band = oversold (bullish)
/// - Price near upper band = overbought (bearish)
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        Self {
            period,
            std_dev_multiplier,
        }
    }

    /// Population standard deviation.
    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

impl Indicator for BollingerBands {
    type Output = BollingerResult;

    fn id(&self) -> &str {
        "bollinger"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<BollingerResult> {
        if self.period == 0 || history.prices.len() < self.period {
            return None;
        }

        let closes = &history.prices[history.prices.len() - self.period..];
        let middle = closes.iter().sum::<f64>() / self.period as f64;
        let std_dev = Self::std_dev(closes, middle);

        let upper = middle + self.std_dev_multiplier * std_dev;
        let lower = middle - self.std_dev_multiplier * std_dev;
        let band_width = upper - lower;

        let current = history.current_price()?;

        // %B: 0 at the lower band, 1 at the upper band
        let position = if band_width > 0.0 {
            (current - lower) / band_width
        } else {
            0.5
        };

        let bandwidth = if middle != 0.0 {
            band_width / middle * 100.0
        } else {
            0.0
        };

        Some(BollingerResult {
            upper,
            middle,
            lower,
            current,
            position,
            at_lower: position < LOWER_TOUCH,
            at_upper: position > UPPER_TOUCH,
            bandwidth,
        })
    }
}
