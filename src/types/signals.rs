use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Bias, FeatureSnapshot, PriceData};

/// Indicator families that can contribute evidence to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorFamily {
    Rsi,
    Macd,
    Trend,
    Bollinger,
    Volume,
    Momentum,
    Divergence,
    SupportResistance,
}

impl IndicatorFamily {
    /// Parse from a config key.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rsi" => Some(Self::Rsi),
            "macd" => Some(Self::Macd),
            "trend" | "ema" => Some(Self::Trend),
            "bollinger" | "bb" => Some(Self::Bollinger),
            "volume" => Some(Self::Volume),
            "momentum" => Some(Self::Momentum),
            "divergence" => Some(Self::Divergence),
            "support_resistance" | "sr" => Some(Self::SupportResistance),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rsi => "RSI",
            Self::Macd => "MACD",
            Self::Trend => "Trend",
            Self::Bollinger => "Bollinger Bands",
            Self::Volume => "Volume",
            Self::Momentum => "Momentum",
            Self::Divergence => "Divergence",
            Self::SupportResistance => "Support/Resistance",
        }
    }
}

/// Direction of an emitted signal. Neutral evaluations never become signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            TradeDirection::Long => 1.0,
            TradeDirection::Short => -1.0,
        }
    }

    /// Whether a trend/momentum reading agrees with this direction.
    pub fn agrees_with(&self, bias: Bias) -> bool {
        matches!(
            (self, bias),
            (TradeDirection::Long, Bias::Bullish) | (TradeDirection::Short, Bias::Bearish)
        )
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => write!(f, "LONG"),
            TradeDirection::Short => write!(f, "SHORT"),
        }
    }
}

/// Configured take-profit step: gain percent and share of the position to exit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeProfitTarget {
    pub target_percent: f64,
    pub exit_percent: f64,
}

impl TakeProfitTarget {
    pub fn new(target_percent: f64, exit_percent: f64) -> Self {
        Self {
            target_percent,
            exit_percent,
        }
    }
}

/// A take-profit step converted to an absolute price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub price: f64,
    pub exit_percent: f64,
    pub profit_percent: f64,
}

/// Confidence threshold mapped to the maximum percent of capital per trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceTier {
    pub min_confidence: f64,
    pub capital_percent: f64,
}

impl ConfidenceTier {
    pub fn new(min_confidence: f64, capital_percent: f64) -> Self {
        Self {
            min_confidence,
            capital_percent,
        }
    }
}

/// Diagnostic values captured while scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetails {
    pub rsi_value: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub trend_direction: Option<Bias>,
    pub volume_multiplier: f64,
    pub divergence_detected: bool,
    /// Sum of the winning side's weighted contributions.
    pub raw_score: f64,
    /// Raw score minus the conflicting-signal penalty.
    pub adjusted_score: f64,
    pub risk_reward_ratio: Option<f64>,
}

/// A calibrated, risk-bounded trade proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: Uuid,
    pub symbol: String,
    pub market: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub targets: Vec<Target>,
    pub position_size: f64,
    pub leverage: u32,
    /// Calibrated confidence (0-100).
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub signal_details: SignalDetails,
    pub timestamp: DateTime<Utc>,
    pub price_data: PriceData,
    pub analysis: FeatureSnapshot,
}

impl Signal {
    /// Stop distance as a percent of entry.
    pub fn stop_distance_percent(&self) -> f64 {
        if self.entry_price > 0.0 {
            (self.entry_price - self.stop_loss).abs() / self.entry_price * 100.0
        } else {
            0.0
        }
    }

    pub fn trend_aligned(&self) -> bool {
        self.direction.agrees_with(self.analysis.trend_bias())
    }
}

/// Outcome of a policy check: accepted, or rejected with a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCheck {
    Accepted,
    Rejected(String),
}

impl PolicyCheck {
    pub fn reject(reason: impl Into<String>) -> Self {
        PolicyCheck::Rejected(reason.into())
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, PolicyCheck::Accepted)
    }

    pub fn reason(&self) -> &str {
        match self {
            PolicyCheck::Accepted => "OK",
            PolicyCheck::Rejected(reason) => reason,
        }
    }
}

/// Why an evaluation did not become a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Rejection {
    /// Required indicators could not be computed yet.
    NoData,
    /// Evidence did not favour either side.
    Neutral,
    /// The tick price cannot be used as an entry.
    InvalidPrice { price: f64 },
    Cooldown { direction: TradeDirection },
    LowConfidence { confidence: f64, threshold: f64 },
    /// The move is too slow to reach the target within the holding window.
    TooSlow { estimated_minutes: f64, max_minutes: f64 },
    RiskReward { ratio: f64, minimum: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoData => write!(f, "Insufficient data for analysis"),
            Rejection::Neutral => write!(f, "No directional edge"),
            Rejection::InvalidPrice { price } => write!(f, "Invalid entry price {}", price),
            Rejection::Cooldown { direction } => write!(f, "{} signal in cooldown period", direction),
            Rejection::LowConfidence {
                confidence,
                threshold,
            } => write!(f, "Confidence {:.1}% < threshold {:.1}%", confidence, threshold),
            Rejection::TooSlow {
                estimated_minutes,
                max_minutes,
            } => write!(
                f,
                "Too slow - needs {:.1} min but max hold is {:.1} min",
                estimated_minutes, max_minutes
            ),
            Rejection::RiskReward { ratio, minimum } => {
                write!(f, "Risk:Reward {:.2} below minimum {:.2}", ratio, minimum)
            }
        }
    }
}
