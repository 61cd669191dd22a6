//! Short-window price momentum.

use crate::services::signals::Indicator;
use crate::types::{Bias, HistorySnapshot, MomentumResult};

/// Momentum over the last few closes.
///
/// Counts up and down steps: three or more in one direction sets the trend.
pub struct Momentum {
    window: usize,
}

impl Default for Momentum {
    fn default() -> Self {
        Self { window: 5 }
    }
}

impl Momentum {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Indicator for Momentum {
    type Output = MomentumResult;

    fn id(&self) -> &str {
        "momentum"
    }

    fn min_periods(&self) -> usize {
        self.window.max(2)
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<MomentumResult> {
        let prices = &history.prices;
        if prices.len() < self.min_periods() {
            return None;
        }

        let recent = &prices[prices.len() - self.min_periods()..];
        let steps = recent.len() - 1;
        let (mut up, mut down) = (0usize, 0usize);
        for pair in recent.windows(2) {
            if pair[1] > pair[0] {
                up += 1;
            } else if pair[1] < pair[0] {
                down += 1;
            }
        }

        let first = recent[0];
        let change_percent = if first != 0.0 {
            (recent[steps] - first) / first * 100.0
        } else {
            0.0
        };

        let trend = if up >= 3 {
            Bias::Bullish
        } else if down >= 3 {
            Bias::Bearish
        } else {
            Bias::Neutral
        };

        Some(MomentumResult {
            trend,
            strength: change_percent.abs(),
            change_percent,
            score: (up as f64 - down as f64) / steps as f64 * 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_momentum() {
        let history = HistorySnapshot::from_prices(&[90.0, 100.0, 101.0, 102.0, 101.5, 104.0]);
        let result = Momentum::default().calculate(&history).unwrap();
        assert_eq!(result.trend, Bias::Bullish);
        assert!((result.change_percent - 4.0).abs() < 1e-9);
        assert!((result.strength - 4.0).abs() < 1e-9);
        assert_eq!(result.score, 50.0);
    }

    #[test]
    fn test_bearish_momentum() {
        let history = HistorySnapshot::from_prices(&[100.0, 99.0, 98.0, 97.0, 96.0]);
        let result = Momentum::default().calculate(&history).unwrap();
        assert_eq!(result.trend, Bias::Bearish);
        assert!(result.change_percent < 0.0);
        assert_eq!(result.score, -100.0);
    }

    #[test]
    fn test_choppy_is_neutral() {
        let history = HistorySnapshot::from_prices(&[100.0, 101.0, 100.0, 101.0, 100.0]);
        let result = Momentum::default().calculate(&history).unwrap();
        assert_eq!(result.trend, Bias::Neutral);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_momentum_needs_window() {
        let history = HistorySnapshot::from_prices(&[100.0, 101.0, 102.0, 103.0]);
        assert!(Momentum::default().calculate(&history).is_none());
    }
}
