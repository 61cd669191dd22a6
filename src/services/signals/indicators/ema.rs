//! Exponential Moving Average (EMA) helpers and indicator.

use crate::services::signals::Indicator;
use crate::types::HistorySnapshot;

/// Full EMA series seeded with the first value.
///
/// `ema[i] = value[i] * k + ema[i-1] * (1 - k)` with `k = 2 / (period + 1)`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = Vec::with_capacity(values.len());
    ema.push(first);

    for value in values.iter().skip(1) {
        let prev = ema[ema.len() - 1];
        ema.push(value * multiplier + prev * (1.0 - multiplier));
    }

    ema
}

/// Simple mean of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[values.len() - period..].iter().sum::<f64>() / period as f64)
}

/// EMA (Exponential Moving Average) indicator.
///
/// Gives more weight to recent prices than a simple average.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn id(&self) -> &str {
        "ema"
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<f64> {
        ema_series(&history.prices, self.period).last().copied()
    }
}
