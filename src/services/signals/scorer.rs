//! Multi-factor confidence scoring.
//!
//! Every indicator family casts weighted votes for a long or a short. The
//! side with more votes wins when it clears `min_signals_required`; the
//! opposing votes are charged as a penalty and the remaining score is
//! mapped to a 0-100 confidence through a piecewise-linear curve.

use serde::{Deserialize, Serialize};

use crate::config::{Config, IndicatorConfig, IndicatorWeights};
use crate::types::{Bias, FeatureSnapshot, IndicatorFamily, SignalDetails, TradeDirection};

/// Points subtracted from the winning side per opposing vote.
const CONFLICT_PENALTY: f64 = 5.0;
/// Confidence added when the direction agrees with the EMA trend.
const TREND_ALIGNMENT_BONUS: f64 = 8.0;
/// Momentum must move at least this percent over its window to vote.
const MOMENTUM_MIN_STRENGTH: f64 = 0.5;

/// Map an adjusted raw score to a confidence percentage.
///
/// | score   | confidence                    |
/// |---------|-------------------------------|
/// | <= 0    | 0                             |
/// | 0-50    | score * 0.6                   |
/// | 50-100  | 30 + (score - 50) * 0.8       |
/// | 100-150 | 70 + (score - 100) * 0.4      |
/// | 150-200 | 90 + (score - 150) * 0.15     |
/// | > 200   | min(100, 97.5 + (score - 200) * 0.05) |
pub fn calibrate_confidence(raw_score: f64) -> f64 {
    if raw_score <= 0.0 {
        0.0
    } else if raw_score < 50.0 {
        raw_score * 0.6
    } else if raw_score < 100.0 {
        30.0 + (raw_score - 50.0) * 0.8
    } else if raw_score < 150.0 {
        70.0 + (raw_score - 100.0) * 0.4
    } else if raw_score < 200.0 {
        90.0 + (raw_score - 150.0) * 0.15
    } else {
        (97.5 + (raw_score - 200.0) * 0.05).min(100.0)
    }
}

/// Votes collected for one side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub reasons: Vec<String>,
    /// Weighted strength of each vote, parallel to `reasons`.
    pub contributions: Vec<f64>,
}

impl Evidence {
    fn push(&mut self, reason: impl Into<String>, weighted: f64) {
        self.reasons.push(reason.into());
        self.contributions.push(weighted);
    }

    pub fn count(&self) -> usize {
        self.reasons.len()
    }

    pub fn total(&self) -> f64 {
        self.contributions.iter().sum()
    }
}

/// Result of scoring one feature snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// `None` when neither side has a clear majority.
    pub direction: Option<TradeDirection>,
    pub confidence: f64,
    /// Reasons of the winning side, in evaluation order.
    pub reasons: Vec<String>,
    pub buy: Evidence,
    pub sell: Evidence,
    pub details: SignalDetails,
}

impl Evaluation {
    pub fn is_neutral(&self) -> bool {
        self.direction.is_none()
    }
}

/// Weighted multi-indicator scorer.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    rsi_oversold: f64,
    rsi_overbought: f64,
    weights: IndicatorWeights,
    min_signals_required: usize,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ConfidenceScorer {
    pub fn new(
        indicators: &IndicatorConfig,
        weights: IndicatorWeights,
        min_signals_required: usize,
    ) -> Self {
        Self {
            rsi_oversold: indicators.rsi_oversold,
            rsi_overbought: indicators.rsi_overbought,
            weights,
            min_signals_required,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.indicators,
            config.weights.clone(),
            config.signals.min_signals_required,
        )
    }

    fn weight(&self, family: IndicatorFamily) -> f64 {
        self.weights.get(family)
    }

    /// Score a feature snapshot.
    pub fn evaluate(&self, analysis: &FeatureSnapshot) -> Evaluation {
        let mut buy = Evidence::default();
        let mut sell = Evidence::default();

        let mut details = SignalDetails {
            rsi_value: analysis.rsi,
            macd_histogram: analysis.macd.map(|m| m.histogram),
            trend_direction: analysis.trend.map(|t| t.bias()),
            volume_multiplier: analysis.volume.multiplier,
            ..SignalDetails::default()
        };

        if let Some(rsi) = analysis.rsi {
            let w = self.weight(IndicatorFamily::Rsi);
            if rsi < self.rsi_oversold {
                let strength = (self.rsi_oversold - rsi) / self.rsi_oversold * 25.0;
                buy.push(format!("RSI({:.1}) Oversold", rsi), strength * w);
            } else if rsi > self.rsi_overbought {
                let strength = (rsi - self.rsi_overbought) / (100.0 - self.rsi_overbought) * 25.0;
                sell.push(format!("RSI({:.1}) Overbought", rsi), strength * w);
            }
        }

        if let Some(macd) = analysis.macd {
            let w = self.weight(IndicatorFamily::Macd);
            let histogram_strength = (macd.histogram.abs() * 10.0).min(15.0);
            if macd.bullish_crossover {
                buy.push("MACD Bullish Crossover", 25.0 * w);
            } else if macd.bearish_crossover {
                sell.push("MACD Bearish Crossover", 25.0 * w);
            } else if macd.histogram > 0.0 {
                buy.push("MACD Positive", histogram_strength * w);
            } else if macd.histogram < 0.0 {
                sell.push("MACD Negative", histogram_strength * w);
            }
        }

        // Trend strength and a fresh crossover vote independently
        if let Some(trend) = analysis.trend {
            let w = self.weight(IndicatorFamily::Trend);
            let strength = (trend.trend_strength * 2.0).min(25.0);
            if trend.bullish_trend {
                buy.push("Bullish Trend (EMA)", strength * w);
            } else if trend.bearish_trend {
                sell.push("Bearish Trend (EMA)", strength * w);
            }

            if trend.bullish_crossover {
                buy.push("EMA Bullish Crossover", 30.0 * w);
            } else if trend.bearish_crossover {
                sell.push("EMA Bearish Crossover", 30.0 * w);
            }
        }

        if let Some(bands) = analysis.bollinger_bands {
            let w = self.weight(IndicatorFamily::Bollinger);
            if bands.at_lower {
                buy.push("BB Lower Band Bounce", 15.0 * w);
            } else if bands.at_upper {
                sell.push("BB Upper Band Rejection", 15.0 * w);
            }
        }

        let divergence = analysis.rsi_divergence;
        let divergence_strength = divergence.divergence_strength.min(30.0);
        let w = self.weight(IndicatorFamily::Divergence);
        if divergence.bullish_divergence {
            buy.push("Bullish Divergence (RSI)", divergence_strength * w);
            details.divergence_detected = true;
        }
        if divergence.bearish_divergence {
            sell.push("Bearish Divergence (RSI)", divergence_strength * w);
            details.divergence_detected = true;
        }

        let levels = &analysis.support_resistance;
        let w = self.weight(IndicatorFamily::SupportResistance);
        if levels.near_support {
            buy.push("Near Support Level", 15.0 * w);
        }
        if levels.near_resistance {
            sell.push("Near Resistance Level", 15.0 * w);
        }

        // A surge backs whichever side is already ahead; a tie gets nothing
        let volume = analysis.volume;
        if volume.is_surge {
            let w = self.weight(IndicatorFamily::Volume);
            let surge_strength = (volume.multiplier * 10.0).min(30.0);
            let reason = format!("Volume Surge ({:.1}x)", volume.multiplier);
            if buy.count() > sell.count() {
                buy.push(reason, surge_strength * w);
            } else if sell.count() > buy.count() {
                sell.push(reason, surge_strength * w);
            }
        }

        let momentum = analysis.momentum;
        if momentum.strength > MOMENTUM_MIN_STRENGTH {
            let w = self.weight(IndicatorFamily::Momentum);
            match momentum.trend {
                Bias::Bullish => buy.push(
                    format!("Bullish Momentum ({:.2}%)", momentum.change_percent),
                    15.0 * w,
                ),
                Bias::Bearish => sell.push(
                    format!("Bearish Momentum ({:.2}%)", momentum.change_percent),
                    15.0 * w,
                ),
                Bias::Neutral => {}
            }
        }

        let direction = if buy.count() > sell.count() && buy.count() > self.min_signals_required {
            Some(TradeDirection::Long)
        } else if sell.count() > buy.count() && sell.count() > self.min_signals_required {
            Some(TradeDirection::Short)
        } else {
            None
        };

        let Some(direction) = direction else {
            return Evaluation {
                direction: None,
                confidence: 0.0,
                reasons: Vec::new(),
                buy,
                sell,
                details,
            };
        };

        let (winning, losing) = match direction {
            TradeDirection::Long => (&buy, &sell),
            TradeDirection::Short => (&sell, &buy),
        };

        let raw_score = winning.total();
        let adjusted_score = (raw_score - losing.count() as f64 * CONFLICT_PENALTY).max(0.0);
        let mut confidence = calibrate_confidence(adjusted_score);

        if let Some(trend) = analysis.trend {
            if direction.agrees_with(trend.bias()) {
                confidence = (confidence + TREND_ALIGNMENT_BONUS).min(100.0);
            }
        }

        details.raw_score = raw_score;
        details.adjusted_score = adjusted_score;
        let reasons = winning.reasons.clone();

        Evaluation {
            direction: Some(direction),
            confidence,
            reasons,
            buy,
            sell,
            details,
        }
    }
}
