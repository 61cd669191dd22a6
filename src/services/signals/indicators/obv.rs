//! On-Balance Volume (OBV) indicator.

use crate::services::signals::Indicator;
use crate::types::HistorySnapshot;

/// OBV (On-Balance Volume) indicator.
///
/// Cumulative volume indicator:
/// - If close > previous close: OBV += volume
/// - If close < previous close: OBV -= volume
#[derive(Default)]
pub struct Obv;

impl Obv {
    /// Running OBV total over aligned price/volume series.
    pub fn calculate_obv(prices: &[f64], volumes: &[f64]) -> Option<f64> {
        let len = prices.len().min(volumes.len());
        if len < 2 {
            return None;
        }

        let obv = (1..len).fold(0.0, |obv, i| {
            if prices[i] > prices[i - 1] {
                obv + volumes[i]
            } else if prices[i] < prices[i - 1] {
                obv - volumes[i]
            } else {
                obv
            }
        });

        Some(obv)
    }
}

impl Indicator for Obv {
    type Output = f64;

    fn id(&self) -> &str {
        "obv"
    }

    fn min_periods(&self) -> usize {
        2
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<f64> {
        Self::calculate_obv(&history.prices, &history.volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obv_running_total() {
        let prices = [10.0, 11.0, 12.0, 11.0, 12.0, 13.0];
        let volumes = [1000.0, 1500.0, 1200.0, 800.0, 1300.0, 1600.0];
        assert_eq!(Obv::calculate_obv(&prices, &volumes), Some(4800.0));
    }

    #[test]
    fn test_obv_unchanged_price_keeps_total() {
        let prices = [10.0, 10.0, 9.0];
        let volumes = [100.0, 500.0, 200.0];
        assert_eq!(Obv::calculate_obv(&prices, &volumes), Some(-200.0));
    }

    #[test]
    fn test_obv_needs_two_points() {
        assert!(Obv::calculate_obv(&[10.0], &[100.0]).is_none());
    }
}
