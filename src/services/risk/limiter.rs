//! Active-position ledger with concurrency and leverage limits.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::sizing::PositionSizer;
use crate::config::RiskConfig;
use crate::services::signals::round2;
use crate::types::{ActivePosition, PolicyCheck, Signal, TradeDirection};

/// Profit or loss of a leveraged position at `current_price`.
///
/// Returns `(amount, percent)` where percent is the unleveraged price move
/// in the position's favour.
pub fn profit_loss(
    entry_price: f64,
    current_price: f64,
    position_size: f64,
    leverage: u32,
    direction: TradeDirection,
) -> (f64, f64) {
    if entry_price <= 0.0 {
        return (0.0, 0.0);
    }
    let pnl_percent = direction.sign() * (current_price - entry_price) / entry_price * 100.0;
    let pnl_amount = position_size * leverage as f64 * pnl_percent / 100.0;
    (pnl_amount, pnl_percent)
}

/// Tracks accepted signals and enforces exposure limits.
pub struct RiskManager {
    sizer: PositionSizer,
    default_leverage: u32,
    max_leverage: u32,
    max_concurrent_positions: usize,
    transaction_cost_percent: f64,
    positions: RwLock<Vec<ActivePosition>>,
}

impl RiskManager {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            sizer: PositionSizer::new(config),
            default_leverage: config.default_leverage,
            max_leverage: config.max_leverage,
            max_concurrent_positions: config.max_concurrent_positions,
            transaction_cost_percent: config.transaction_cost_percent,
            positions: RwLock::new(Vec::new()),
        }
    }

    // Every mutation is a single push or retain, so a poisoned ledger is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Vec<ActivePosition>> {
        self.positions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ActivePosition>> {
        self.positions.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sizer(&self) -> &PositionSizer {
        &self.sizer
    }

    pub fn default_leverage(&self) -> u32 {
        self.default_leverage
    }

    /// Position size at the default leverage unless one is given.
    pub fn calculate_position_size(
        &self,
        entry_price: f64,
        stop_loss: f64,
        leverage: Option<u32>,
        confidence: Option<f64>,
    ) -> f64 {
        let leverage = leverage.unwrap_or(self.default_leverage);
        self.sizer
            .calculate_position_size(entry_price, stop_loss, leverage, confidence)
    }

    pub fn can_open_position(&self) -> PolicyCheck {
        if self.read().len() >= self.max_concurrent_positions {
            return PolicyCheck::reject(format!(
                "Max concurrent positions reached ({})",
                self.max_concurrent_positions
            ));
        }
        PolicyCheck::Accepted
    }

    pub fn validate_leverage(&self, leverage: u32) -> PolicyCheck {
        if leverage > self.max_leverage {
            return PolicyCheck::reject(format!(
                "Leverage {}x exceeds maximum {}x",
                leverage, self.max_leverage
            ));
        }
        if leverage < 1 {
            return PolicyCheck::reject("Leverage must be at least 1x");
        }
        PolicyCheck::Accepted
    }

    /// Check the limits and record the position if they pass.
    pub fn try_open(&self, signal: &Signal) -> PolicyCheck {
        let leverage = self.validate_leverage(signal.leverage);
        if !leverage.is_accepted() {
            return leverage;
        }

        let mut positions = self.write();
        if positions.len() >= self.max_concurrent_positions {
            return PolicyCheck::reject(format!(
                "Max concurrent positions reached ({})",
                self.max_concurrent_positions
            ));
        }
        positions.push(ActivePosition::from_signal(signal));
        info!(
            "Position added: {} {} at {:.4}",
            signal.symbol, signal.direction, signal.entry_price
        );
        PolicyCheck::Accepted
    }

    /// Record a position without checking limits.
    pub fn add_position(&self, signal: &Signal) {
        self.write().push(ActivePosition::from_signal(signal));
        info!(
            "Position added: {} {} at {:.4}",
            signal.symbol, signal.direction, signal.entry_price
        );
    }

    /// Remove every position on `symbol`. Returns how many were removed.
    pub fn remove_position(&self, symbol: &str) -> usize {
        let mut positions = self.write();
        let before = positions.len();
        positions.retain(|p| p.symbol != symbol);
        let removed = before - positions.len();
        if removed > 0 {
            info!("Position removed: {}", symbol);
        }
        removed
    }

    pub fn get_position(&self, symbol: &str) -> Option<ActivePosition> {
        self.read().iter().find(|p| p.symbol == symbol).cloned()
    }

    pub fn active_positions(&self) -> Vec<ActivePosition> {
        self.read().clone()
    }

    pub fn active_count(&self) -> usize {
        self.read().len()
    }

    /// Sum of margin times leverage over open positions.
    pub fn total_exposure(&self) -> f64 {
        self.read().iter().map(|p| p.exposure()).sum()
    }

    /// Drop positions older than `max_age_minutes`. Returns how many were removed.
    pub fn cleanup_expired_positions(&self, now: DateTime<Utc>, max_age_minutes: i64) -> usize {
        let mut positions = self.write();
        let before = positions.len();
        positions.retain(|p| !p.is_expired(now, max_age_minutes));
        let removed = before - positions.len();
        if removed > 0 {
            info!(
                "Auto-cleanup: removed {} expired positions (>{} min old)",
                removed, max_age_minutes
            );
        } else {
            debug!("Auto-cleanup: no expired positions");
        }
        removed
    }

    fn fees(&self, position_size: f64) -> f64 {
        position_size * self.transaction_cost_percent / 100.0
    }

    /// Loss if the stop is hit, fees included.
    pub fn calculate_max_loss(&self, position_size: f64, leverage: u32, stop_loss_percent: f64) -> f64 {
        let exposure = position_size * leverage as f64;
        round2(exposure * stop_loss_percent / 100.0 + self.fees(position_size))
    }

    /// Profit if the target is hit, net of fees.
    pub fn calculate_potential_profit(
        &self,
        position_size: f64,
        leverage: u32,
        target_percent: f64,
    ) -> f64 {
        let exposure = position_size * leverage as f64;
        round2(exposure * target_percent / 100.0 - self.fees(position_size))
    }

    pub fn calculate_breakeven_percent(&self) -> f64 {
        self.transaction_cost_percent
    }

    /// Long-side profit from `entry_price` to `exit_price`, net of fees.
    pub fn calculate_net_profit(
        &self,
        position_size: f64,
        leverage: u32,
        entry_price: f64,
        exit_price: f64,
    ) -> f64 {
        if entry_price <= 0.0 {
            return 0.0;
        }
        let exposure = position_size * leverage as f64;
        let change_percent = (exit_price - entry_price) / entry_price * 100.0;
        round2(exposure * change_percent / 100.0 - self.fees(position_size))
    }

    /// Reward over risk for a single target. 0 when the stop is on the wrong side.
    pub fn calculate_risk_reward_ratio(
        entry_price: f64,
        stop_loss: f64,
        target_price: f64,
        direction: TradeDirection,
    ) -> f64 {
        let risk = direction.sign() * (entry_price - stop_loss);
        let reward = direction.sign() * (target_price - entry_price);
        if risk <= 0.0 {
            return 0.0;
        }
        reward / risk
    }
}
