use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Signal, Target, TradeDirection};

/// A signal that the risk limiter accepted and is now tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePosition {
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub targets: Vec<Target>,
    pub position_size: f64,
    pub leverage: u32,
    pub entry_time: DateTime<Utc>,
}

impl ActivePosition {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            targets: signal.targets.clone(),
            position_size: signal.position_size,
            leverage: signal.leverage,
            entry_time: signal.timestamp,
        }
    }

    /// Margin times leverage.
    pub fn exposure(&self) -> f64 {
        self.position_size * self.leverage as f64
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age_minutes: i64) -> bool {
        now - self.entry_time > Duration::minutes(max_age_minutes)
    }
}

/// Account balance figures supplied by the exchange account source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub total_balance: f64,
    pub available_margin: f64,
    pub used_margin: f64,
}

impl AccountSnapshot {
    pub fn new(available_margin: f64, used_margin: f64) -> Self {
        Self {
            total_balance: available_margin + used_margin,
            available_margin,
            used_margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(entry_time: DateTime<Utc>) -> ActivePosition {
        ActivePosition {
            symbol: "BTC".to_string(),
            direction: TradeDirection::Long,
            entry_price: 100.0,
            stop_loss: 99.5,
            targets: vec![],
            position_size: 200.0,
            leverage: 5,
            entry_time,
        }
    }

    #[test]
    fn test_exposure() {
        assert_eq!(position(Utc::now()).exposure(), 1000.0);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let p = position(now - Duration::minutes(6));
        assert!(p.is_expired(now, 5));
        assert!(!p.is_expired(now, 10));
    }

    #[test]
    fn test_account_totals() {
        let account = AccountSnapshot::new(800.0, 200.0);
        assert_eq!(account.total_balance, 1000.0);
    }
}
