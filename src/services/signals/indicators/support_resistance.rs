//! Support and resistance levels from clustered swing points.

use crate::services::signals::Indicator;
use crate::types::{HistorySnapshot, SupportResistance};

/// Bars on each side a swing point must beat.
const SWING_WINDOW: usize = 2;

/// Group sorted values whose distance to the running cluster mean stays
/// within `threshold_pct`, then collapse each group to its mean.
pub fn cluster_levels(values: &[f64], threshold_pct: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut levels = Vec::new();
    let mut cluster: Vec<f64> = Vec::new();

    for value in sorted {
        if let Some(mean) = mean(&cluster) {
            if mean != 0.0 && ((value - mean) / mean).abs() * 100.0 > threshold_pct {
                levels.push(mean);
                cluster.clear();
            }
        }
        cluster.push(value);
    }

    if let Some(mean) = mean(&cluster) {
        levels.push(mean);
    }

    levels
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn nearest_distance(price: f64, levels: &[f64]) -> Option<f64> {
    levels
        .iter()
        .map(|level| (price - level).abs() / price * 100.0)
        .min_by(|a, b| a.total_cmp(b))
}

/// Support/resistance detector.
///
/// Swing highs and lows need two strictly lower (higher) bars on each
/// side. Nearby swings are merged into a single level.
pub struct SupportResistanceLevels {
    threshold_pct: f64,
}

impl Default for SupportResistanceLevels {
    fn default() -> Self {
        Self { threshold_pct: 2.0 }
    }
}

impl SupportResistanceLevels {
    pub fn new(threshold_pct: f64) -> Self {
        Self { threshold_pct }
    }
}

impl Indicator for SupportResistanceLevels {
    type Output = SupportResistance;

    fn id(&self) -> &str {
        "support_resistance"
    }

    fn min_periods(&self) -> usize {
        SWING_WINDOW * 2 + 1
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<SupportResistance> {
        let prices = &history.prices;
        if prices.len() < self.min_periods() {
            return None;
        }
        let current = history.current_price()?;

        let mut highs = Vec::new();
        let mut lows = Vec::new();
        for i in SWING_WINDOW..prices.len() - SWING_WINDOW {
            let p = prices[i];
            let mut neighbours = (i - SWING_WINDOW..=i + SWING_WINDOW).filter(|&j| j != i);
            if neighbours.clone().all(|j| p > prices[j]) {
                highs.push(p);
            } else if neighbours.all(|j| p < prices[j]) {
                lows.push(p);
            }
        }

        let resistance_levels = cluster_levels(&highs, self.threshold_pct);
        let support_levels = cluster_levels(&lows, self.threshold_pct);

        let nearest_support_distance = nearest_distance(current, &support_levels);
        let nearest_resistance_distance = nearest_distance(current, &resistance_levels);
        let near = |d: Option<f64>| d.is_some_and(|d| d <= self.threshold_pct);

        Some(SupportResistance {
            near_support: near(nearest_support_distance),
            near_resistance: near(nearest_resistance_distance),
            support_levels,
            resistance_levels,
            nearest_support_distance,
            nearest_resistance_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_merges_close_values() {
        let levels = cluster_levels(&[100.0, 101.0, 110.0, 100.5], 2.0);
        assert_eq!(levels.len(), 2);
        assert!((levels[0] - 100.5).abs() < 1e-9);
        assert!((levels[1] - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_empty() {
        assert!(cluster_levels(&[], 2.0).is_empty());
    }

    #[test]
    fn test_levels_from_swings() {
        // Swing lows near 90, swing highs near 110
        let prices = [
            100.0, 95.0, 90.0, 95.0, 100.0, 105.0, 110.0, 105.0, 100.0, 95.0, 90.5, 95.0, 100.0,
            105.0, 109.5, 105.0, 100.0, 95.0, 91.0,
        ];
        let result = SupportResistanceLevels::default()
            .calculate(&HistorySnapshot::from_prices(&prices))
            .unwrap();

        assert_eq!(result.support_levels.len(), 1);
        assert_eq!(result.resistance_levels.len(), 1);
        assert!((result.support_levels[0] - 90.25).abs() < 1e-9);
        assert!((result.resistance_levels[0] - 109.75).abs() < 1e-9);
        assert!(result.near_support);
        assert!(!result.near_resistance);
        assert!(result.nearest_support_distance.unwrap() < 1.0);
    }

    #[test]
    fn test_monotonic_prices_have_no_levels() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = SupportResistanceLevels::default()
            .calculate(&HistorySnapshot::from_prices(&prices))
            .unwrap();
        assert!(result.support_levels.is_empty());
        assert!(result.resistance_levels.is_empty());
        assert!(!result.near_support && !result.near_resistance);
        assert!(result.nearest_support_distance.is_none());
    }
}
