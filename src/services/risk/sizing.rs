//! Position sizing from capital at risk.

use tracing::debug;

use crate::config::RiskConfig;
use crate::services::signals::round2;
use crate::types::{AccountSnapshot, ConfidenceTier, PolicyCheck};

/// Round to cents without letting rounding lift the size past `cap`.
fn round_within(value: f64, cap: f64) -> f64 {
    round2(value).min(cap).max(0.0)
}

/// Converts capital, per-trade risk and stop distance into a margin amount.
///
/// `base = (capital * risk% / 100) / (stop% / 100) / leverage`, then capped
/// by the confidence tier's share of capital and by the capital safety
/// fraction.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    total_capital: f64,
    risk_per_trade_percent: f64,
    capital_safety_fraction: f64,
    /// Highest threshold first.
    confidence_tiers: Vec<ConfidenceTier>,
    base_capital_percent: f64,
}

impl PositionSizer {
    pub fn new(config: &RiskConfig) -> Self {
        let mut confidence_tiers = config.confidence_tiers.clone();
        confidence_tiers.sort_by(|a, b| b.min_confidence.total_cmp(&a.min_confidence));

        Self {
            total_capital: config.total_capital,
            risk_per_trade_percent: config.risk_per_trade_percent,
            capital_safety_fraction: config.capital_safety_fraction,
            confidence_tiers,
            base_capital_percent: config.base_capital_percent,
        }
    }

    pub fn total_capital(&self) -> f64 {
        self.total_capital
    }

    /// Max percent of capital for one trade at this confidence.
    pub fn max_percent_for(&self, confidence: Option<f64>) -> f64 {
        confidence
            .and_then(|c| {
                self.confidence_tiers
                    .iter()
                    .find(|tier| c >= tier.min_confidence)
            })
            .map(|tier| tier.capital_percent)
            .unwrap_or(self.base_capital_percent)
    }

    /// Margin to commit for a trade from `entry_price` to `stop_loss`.
    ///
    /// Returns 0 when the stop distance is undefined.
    pub fn calculate_position_size(
        &self,
        entry_price: f64,
        stop_loss: f64,
        leverage: u32,
        confidence: Option<f64>,
    ) -> f64 {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return 0.0;
        }
        let stop_distance_percent = (entry_price - stop_loss).abs() / entry_price * 100.0;
        if !stop_distance_percent.is_finite() || stop_distance_percent <= 0.0 {
            return 0.0;
        }

        let leverage = leverage.max(1) as f64;
        let risk_amount = self.total_capital * self.risk_per_trade_percent / 100.0;
        let base = risk_amount / (stop_distance_percent / 100.0) / leverage;

        let tier_cap = self.total_capital * self.max_percent_for(confidence) / 100.0;
        let safety_cap = self.total_capital * self.capital_safety_fraction;

        let cap = tier_cap.min(safety_cap);
        if base > cap {
            debug!(
                "Position size capped from {:.2} to {:.2} (tier {:.2}, safety {:.2})",
                base, cap, tier_cap, safety_cap
            );
        }

        round_within(base.min(cap), cap)
    }

    /// Cap a size by a share of the account's available margin.
    pub fn dynamic_position_size(
        base_size: f64,
        account: &AccountSnapshot,
        max_margin_percent: f64,
    ) -> f64 {
        let max_from_margin = account.available_margin * max_margin_percent / 100.0;
        round_within(base_size.min(max_from_margin), max_from_margin)
    }

    /// Reject sizes the account cannot fund.
    pub fn can_afford(position_size: f64, account: &AccountSnapshot) -> PolicyCheck {
        if position_size > account.available_margin {
            return PolicyCheck::reject(format!(
                "Insufficient margin. Required: {:.2}, Available: {:.2}",
                position_size, account.available_margin
            ));
        }
        PolicyCheck::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(&RiskConfig::default())
    }

    #[test]
    fn test_tier_selection() {
        let sizer = sizer();
        assert_eq!(sizer.max_percent_for(Some(80.0)), 35.0);
        assert_eq!(sizer.max_percent_for(Some(75.0)), 35.0);
        assert_eq!(sizer.max_percent_for(Some(70.0)), 28.0);
        assert_eq!(sizer.max_percent_for(Some(60.0)), 22.0);
        assert_eq!(sizer.max_percent_for(Some(40.0)), 18.0);
        assert_eq!(sizer.max_percent_for(None), 18.0);
    }

    #[test]
    fn test_base_formula_below_caps() {
        // risk 250, stop 5% -> 5000 notional, 5x -> 1000 margin
        let size = sizer().calculate_position_size(100.0, 95.0, 5, Some(80.0));
        assert!((size - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_tight_stop_hits_tier_cap() {
        // 0.5% stop would ask for 10_000 margin at 5x
        let size = sizer().calculate_position_size(100.0, 99.5, 5, Some(66.0));
        assert_eq!(size, 2800.0);
    }

    #[test]
    fn test_safety_cap() {
        let config = RiskConfig {
            confidence_tiers: vec![ConfidenceTier::new(0.0, 500.0)],
            ..RiskConfig::default()
        };
        let size = PositionSizer::new(&config).calculate_position_size(100.0, 99.99, 1, Some(90.0));
        assert!((size - 9500.0).abs() < 0.01, "got {}", size);
    }

    #[test]
    fn test_zero_stop_distance() {
        assert_eq!(sizer().calculate_position_size(100.0, 100.0, 5, None), 0.0);
        assert_eq!(sizer().calculate_position_size(0.0, 1.0, 5, None), 0.0);
    }

    #[test]
    fn test_dynamic_size_and_affordability() {
        let account = AccountSnapshot::new(1000.0, 500.0);
        assert_eq!(PositionSizer::dynamic_position_size(800.0, &account, 50.0), 500.0);
        assert_eq!(PositionSizer::dynamic_position_size(200.0, &account, 50.0), 200.0);

        assert!(PositionSizer::can_afford(900.0, &account).is_accepted());
        let check = PositionSizer::can_afford(1200.0, &account);
        assert!(!check.is_accepted());
        assert!(check.reason().contains("Insufficient margin"));
    }
}
