//! Feature snapshot produced by the indicator engine for one symbol per cycle.

use serde::{Deserialize, Serialize};

/// Directional reading of a trend or momentum indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_histogram: f64,
    /// Histogram flipped from negative to positive on the latest bar.
    pub bullish_crossover: bool,
    /// Histogram flipped from positive to negative on the latest bar.
    pub bearish_crossover: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub current: f64,
    /// (price - lower) / (upper - lower); 0.5 when the bands collapse.
    pub position: f64,
    pub at_lower: bool,
    pub at_upper: bool,
    /// Band width as a percentage of the middle band.
    pub bandwidth: f64,
}

/// Fast/slow EMA trend filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub bullish_trend: bool,
    pub bearish_trend: bool,
    pub bullish_crossover: bool,
    pub bearish_crossover: bool,
    /// |fast - slow| / slow * 100
    pub trend_strength: f64,
}

impl TrendResult {
    pub fn bias(&self) -> Bias {
        if self.bullish_trend {
            Bias::Bullish
        } else if self.bearish_trend {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResult {
    pub is_surge: bool,
    /// Current volume over the mean of all prior volumes in the window.
    pub multiplier: f64,
    /// Mean of the prior volumes.
    pub average: f64,
    /// Current volume over the long rolling average.
    pub relative_volume: f64,
    pub trend: VolumeTrend,
}

impl Default for VolumeResult {
    fn default() -> Self {
        Self {
            is_surge: false,
            multiplier: 1.0,
            average: 0.0,
            relative_volume: 1.0,
            trend: VolumeTrend::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MomentumResult {
    pub trend: Bias,
    /// Absolute percent change over the window.
    pub strength: f64,
    pub change_percent: f64,
    /// (up steps - down steps) / steps * 100
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistance {
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub near_support: bool,
    pub near_resistance: bool,
    /// Distance to the closest support level as a percent of price.
    pub nearest_support_distance: Option<f64>,
    /// Distance to the closest resistance level as a percent of price.
    pub nearest_resistance_distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DivergenceResult {
    pub bullish_divergence: bool,
    pub bearish_divergence: bool,
    pub divergence_strength: f64,
}

impl DivergenceResult {
    pub fn detected(&self) -> bool {
        self.bullish_divergence || self.bearish_divergence
    }
}

/// Everything the scorer needs to know about one symbol for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSnapshot {
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub macd: Option<MacdResult>,
    pub bollinger_bands: Option<BollingerResult>,
    pub trend: Option<TrendResult>,
    pub volume: VolumeResult,
    pub momentum: MomentumResult,
    pub support_resistance: SupportResistance,
    pub rsi_divergence: DivergenceResult,
    pub obv: Option<f64>,
    /// True only when RSI, MACD, Bollinger Bands and ATR are all present.
    pub has_data: bool,
}

impl FeatureSnapshot {
    /// Recompute `has_data` from the required indicators.
    pub fn refresh_completeness(&mut self) {
        self.has_data = self.rsi.is_some()
            && self.macd.is_some()
            && self.bollinger_bands.is_some()
            && self.atr.is_some();
    }

    pub fn trend_bias(&self) -> Bias {
        self.trend.map(|t| t.bias()).unwrap_or_default()
    }
}
