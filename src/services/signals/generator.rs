//! Signal orchestration.
//!
//! Turns a scored feature snapshot into a trade proposal:
//! no data / neutral / cooldown / confidence checks, stop and target
//! geometry, the speed-of-move filter, position sizing, risk/reward
//! validation, then emission and cooldown bookkeeping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cooldown::CooldownTracker;
use super::scorer::ConfidenceScorer;
use crate::config::{Config, RiskConfig, SignalConfig};
use crate::services::risk::RiskManager;
use crate::types::{
    FeatureSnapshot, PriceData, Rejection, Signal, TakeProfitTarget, Target, TradeDirection,
};

/// Score bonus when ranking a signal backed by a divergence.
const DIVERGENCE_RANK_BONUS: f64 = 5.0;
/// Score bonus when ranking a signal that agrees with the EMA trend.
const TREND_RANK_BONUS: f64 = 10.0;
/// Hold-time estimate multiplier applied to target distance / recent move.
const SPEED_FACTOR: f64 = 2.0;
/// Allowed overshoot of the position expiry by the hold-time estimate.
const SPEED_TOLERANCE: f64 = 1.5;

/// Diagnostic categories that are only logged a limited number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    SignalCounts,
    LowConfidence,
    AtrStop,
    Validation,
}

impl LogCategory {
    fn index(self) -> usize {
        match self {
            LogCategory::SignalCounts => 0,
            LogCategory::LowConfidence => 1,
            LogCategory::AtrStop => 2,
            LogCategory::Validation => 3,
        }
    }

    fn limit(self) -> usize {
        match self {
            LogCategory::SignalCounts => 10,
            LogCategory::LowConfidence => 5,
            LogCategory::AtrStop => 3,
            LogCategory::Validation => 5,
        }
    }
}

/// Per-generator counters for "log the first N" diagnostics.
#[derive(Debug, Default)]
pub struct LogBudget {
    used: [AtomicUsize; 4],
}

impl LogBudget {
    /// True while the category still has budget; consumes one unit.
    pub fn allow(&self, category: LogCategory) -> bool {
        self.used[category.index()].fetch_add(1, Ordering::Relaxed) < category.limit()
    }
}

/// Result of running one symbol through the generator.
#[derive(Debug, Clone)]
pub enum SignalOutcome {
    Emitted(Box<Signal>),
    Rejected(Rejection),
}

impl SignalOutcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SignalOutcome::Emitted(signal) => Some(signal),
            SignalOutcome::Rejected(_) => None,
        }
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            SignalOutcome::Emitted(signal) => Some(*signal),
            SignalOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            SignalOutcome::Emitted(_) => None,
            SignalOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Stop price `stop_percent` away from entry, on the losing side.
pub fn compute_stop_loss(entry_price: f64, stop_percent: f64, direction: TradeDirection) -> f64 {
    entry_price * (1.0 - direction.sign() * stop_percent / 100.0)
}

/// Absolute target prices on the winning side of entry.
pub fn compute_targets(
    entry_price: f64,
    targets: &[TakeProfitTarget],
    direction: TradeDirection,
) -> Vec<Target> {
    targets
        .iter()
        .map(|t| Target {
            price: entry_price * (1.0 + direction.sign() * t.target_percent / 100.0),
            exit_percent: t.exit_percent,
            profit_percent: t.target_percent,
        })
        .collect()
}

/// Exit-weighted reward over the stop distance.
///
/// `sum(profit% * exit% / 100) / stop%`; 0 when the stop distance is not positive.
pub fn blended_risk_reward(targets: &[Target], stop_percent: f64) -> f64 {
    if stop_percent <= 0.0 {
        return 0.0;
    }
    let reward: f64 = targets
        .iter()
        .map(|t| t.profit_percent * t.exit_percent / 100.0)
        .sum();
    reward / stop_percent
}

/// Ranking score: confidence plus divergence and trend-alignment bonuses.
pub fn rank_score(signal: &Signal) -> f64 {
    let mut score = signal.confidence;
    if signal.signal_details.divergence_detected {
        score += DIVERGENCE_RANK_BONUS;
    }
    if signal.trend_aligned() {
        score += TREND_RANK_BONUS;
    }
    score
}

/// Order signals by ranking score, best first.
pub fn rank_signals(mut signals: Vec<Signal>) -> Vec<Signal> {
    signals.sort_by(|a, b| rank_score(b).total_cmp(&rank_score(a)));
    signals
}

/// Ranked signals truncated to `max_alerts`.
pub fn filter_top_signals(signals: Vec<Signal>, max_alerts: usize) -> Vec<Signal> {
    let mut ranked = rank_signals(signals);
    ranked.truncate(max_alerts);
    ranked
}

/// Builds signals for one trading session.
///
/// Owns the cooldown state; position sizing goes through the shared
/// [`RiskManager`].
pub struct SignalGenerator {
    signals: SignalConfig,
    risk: RiskConfig,
    scorer: ConfidenceScorer,
    cooldown: CooldownTracker,
    risk_manager: Arc<RiskManager>,
    log_budget: LogBudget,
}

impl SignalGenerator {
    pub fn new(config: &Config, risk_manager: Arc<RiskManager>) -> Self {
        Self {
            signals: config.signals.clone(),
            risk: config.risk.clone(),
            scorer: ConfidenceScorer::from_config(config),
            cooldown: CooldownTracker::new(config.signals.cooldown_minutes),
            risk_manager,
            log_budget: LogBudget::default(),
        }
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn risk_manager(&self) -> &Arc<RiskManager> {
        &self.risk_manager
    }

    pub fn log_budget(&self) -> &LogBudget {
        &self.log_budget
    }

    pub fn max_alerts_per_scan(&self) -> usize {
        self.signals.max_alerts_per_scan
    }

    /// Stop distance in percent of entry: ATR-based when enabled and available.
    fn stop_percent(&self, symbol: &str, entry_price: f64, analysis: &FeatureSnapshot) -> f64 {
        let fixed = self.risk.stop_loss_percent;
        if !self.risk.use_atr_stops {
            return fixed;
        }
        match analysis.atr {
            Some(atr) if atr > 0.0 && entry_price > 0.0 => {
                let atr_percent = atr * self.risk.atr_stop_multiplier / entry_price * 100.0;
                if self.log_budget.allow(LogCategory::AtrStop) {
                    info!(
                        "{}: ATR stop={:.2}% (vs fixed {:.2}%)",
                        symbol, atr_percent, fixed
                    );
                }
                atr_percent
            }
            _ => fixed,
        }
    }

    /// Generate a signal at the current time.
    pub fn generate_signal(
        &self,
        symbol: &str,
        price_data: &PriceData,
        analysis: &FeatureSnapshot,
        min_confidence: Option<f64>,
    ) -> SignalOutcome {
        self.generate_signal_at(symbol, price_data, analysis, min_confidence, Utc::now())
    }

    /// Generate a signal as of `now`. `min_confidence` overrides the configured threshold.
    pub fn generate_signal_at(
        &self,
        symbol: &str,
        price_data: &PriceData,
        analysis: &FeatureSnapshot,
        min_confidence: Option<f64>,
        now: DateTime<Utc>,
    ) -> SignalOutcome {
        if !analysis.has_data {
            debug!("{}: Insufficient data for analysis", symbol);
            return SignalOutcome::Rejected(Rejection::NoData);
        }

        let evaluation = self.scorer.evaluate(analysis);
        if (evaluation.buy.count() > 0 || evaluation.sell.count() > 0)
            && self.log_budget.allow(LogCategory::SignalCounts)
        {
            debug!(
                "{}: Signals detected - Buy:{} Sell:{} (Need >{})",
                symbol,
                evaluation.buy.count(),
                evaluation.sell.count(),
                self.signals.min_signals_required
            );
        }

        let Some(direction) = evaluation.direction else {
            return SignalOutcome::Rejected(Rejection::Neutral);
        };

        let entry_price = price_data.price;
        if !entry_price.is_finite() || entry_price <= 0.0 {
            warn!("{}: Invalid entry price {}", symbol, entry_price);
            return SignalOutcome::Rejected(Rejection::InvalidPrice { price: entry_price });
        }

        if !self.cooldown.can_alert(symbol, direction, now) {
            return SignalOutcome::Rejected(Rejection::Cooldown { direction });
        }

        let threshold = min_confidence.unwrap_or(self.signals.min_confidence);
        if evaluation.confidence < threshold {
            if self.log_budget.allow(LogCategory::LowConfidence) {
                info!(
                    "{}: Confidence {:.1}% < threshold {:.1}%",
                    symbol, evaluation.confidence, threshold
                );
            }
            return SignalOutcome::Rejected(Rejection::LowConfidence {
                confidence: evaluation.confidence,
                threshold,
            });
        }

        let stop_percent = self.stop_percent(symbol, entry_price, analysis);
        let stop_loss = compute_stop_loss(entry_price, stop_percent, direction);
        let targets = compute_targets(entry_price, &self.risk.take_profit_targets, direction);

        // Skip moves too slow to reach the second target before the position expires
        let recent_change = analysis.momentum.change_percent.abs();
        let target_distance = targets
            .get(1)
            .or_else(|| targets.first())
            .map(|t| t.profit_percent);
        if let Some(target_distance) = target_distance {
            if recent_change > 0.0 {
                let estimated_minutes = target_distance / recent_change * SPEED_FACTOR;
                let max_hold = self.risk.position_expiry_minutes as f64;
                if estimated_minutes > max_hold * SPEED_TOLERANCE {
                    debug!(
                        "{}: Too slow - needs {:.1} min but max hold is {} min",
                        symbol, estimated_minutes, max_hold
                    );
                    return SignalOutcome::Rejected(Rejection::TooSlow {
                        estimated_minutes,
                        max_minutes: max_hold * SPEED_TOLERANCE,
                    });
                }
            }
        }

        let leverage = self.risk_manager.default_leverage();
        let position_size = self.risk_manager.calculate_position_size(
            entry_price,
            stop_loss,
            Some(leverage),
            Some(evaluation.confidence),
        );

        let risk_reward = blended_risk_reward(&targets, stop_percent);
        if risk_reward < self.risk.min_risk_reward_ratio {
            if self.log_budget.allow(LogCategory::Validation) {
                info!(
                    "{}: REJECTED - Risk:Reward {:.2} below minimum {:.2}",
                    symbol, risk_reward, self.risk.min_risk_reward_ratio
                );
            }
            return SignalOutcome::Rejected(Rejection::RiskReward {
                ratio: risk_reward,
                minimum: self.risk.min_risk_reward_ratio,
            });
        }

        let mut signal_details = evaluation.details;
        signal_details.risk_reward_ratio = Some(risk_reward);

        let signal = Signal {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            market: price_data.market.clone(),
            direction,
            entry_price,
            stop_loss,
            targets,
            position_size,
            leverage,
            confidence: evaluation.confidence,
            reasons: evaluation.reasons,
            signal_details,
            timestamp: now,
            price_data: price_data.clone(),
            analysis: analysis.clone(),
        };

        self.cooldown.record(symbol, direction, now);
        info!(
            "{}: {} signal at {:.4} ({:.1}% confidence, size {:.2})",
            symbol, direction, entry_price, signal.confidence, position_size
        );

        SignalOutcome::Emitted(Box::new(signal))
    }
}
