//! Price/RSI divergence detection.

use super::rsi::Rsi;
use crate::services::signals::Indicator;
use crate::types::{DivergenceResult, HistorySnapshot};

/// Bars on each side a pivot must beat.
const PIVOT_WINDOW: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq)]
enum PivotKind {
    Low,
    High,
}

/// Indices of strict local extremes inside `values`.
fn pivots(values: &[f64], kind: PivotKind) -> Vec<usize> {
    if values.len() < PIVOT_WINDOW * 2 + 1 {
        return Vec::new();
    }

    (PIVOT_WINDOW..values.len() - PIVOT_WINDOW)
        .filter(|&i| {
            let v = values[i];
            (i - PIVOT_WINDOW..=i + PIVOT_WINDOW)
                .filter(|&j| j != i)
                .all(|j| match kind {
                    PivotKind::Low => v < values[j],
                    PivotKind::High => v > values[j],
                })
        })
        .collect()
}

/// Price pivots that are also indicator pivots of the same kind.
fn paired_pivots(prices: &[f64], indicator: &[f64], kind: PivotKind) -> Vec<usize> {
    let indicator_pivots = pivots(indicator, kind);
    pivots(prices, kind)
        .into_iter()
        .filter(|i| indicator_pivots.contains(i))
        .collect()
}

/// Compare the last two pivots shared by price and indicator.
///
/// Both slices must be aligned bar for bar. Only the trailing `lookback`
/// bars are inspected.
pub fn detect(prices: &[f64], indicator: &[f64], lookback: usize, strength: f64) -> DivergenceResult {
    let len = prices.len().min(indicator.len()).min(lookback);
    let prices = &prices[prices.len() - len..];
    let indicator = &indicator[indicator.len() - len..];

    let mut result = DivergenceResult::default();

    let lows = paired_pivots(prices, indicator, PivotKind::Low);
    if let [.., prev, last] = lows[..] {
        // Lower low in price, higher low in the oscillator
        if prices[last] < prices[prev] && indicator[last] > indicator[prev] {
            result.bullish_divergence = true;
        }
    }

    let highs = paired_pivots(prices, indicator, PivotKind::High);
    if let [.., prev, last] = highs[..] {
        if prices[last] > prices[prev] && indicator[last] < indicator[prev] {
            result.bearish_divergence = true;
        }
    }

    if result.detected() {
        result.divergence_strength = strength;
    }

    result
}

/// RSI divergence over the trailing `lookback` bars.
pub struct Divergence {
    lookback: usize,
    rsi_period: usize,
    strength: f64,
}

impl Default for Divergence {
    fn default() -> Self {
        Self {
            lookback: 10,
            rsi_period: 14,
            strength: 20.0,
        }
    }
}

impl Divergence {
    pub fn new(lookback: usize, rsi_period: usize, strength: f64) -> Self {
        Self {
            lookback,
            rsi_period,
            strength,
        }
    }
}

impl Indicator for Divergence {
    type Output = DivergenceResult;

    fn id(&self) -> &str {
        "rsi_divergence"
    }

    fn min_periods(&self) -> usize {
        self.rsi_period + PIVOT_WINDOW * 2 + 1
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<DivergenceResult> {
        let rsi = Rsi::series(&history.prices, self.rsi_period);
        if rsi.len() < PIVOT_WINDOW * 2 + 1 {
            return None;
        }
        // The RSI series ends on the same bar as the prices
        Some(detect(&history.prices, &rsi, self.lookback, self.strength))
    }
}
