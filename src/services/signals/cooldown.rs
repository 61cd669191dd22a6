//! Per-symbol, per-direction alert cooldown.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::types::TradeDirection;

/// Remembers when each (symbol, direction) last produced a signal.
///
/// Long and short cooldowns are independent: a recent LONG never blocks a
/// SHORT on the same symbol.
pub struct CooldownTracker {
    cooldown: Duration,
    last_alert: DashMap<(String, TradeDirection), DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(cooldown_minutes: i64) -> Self {
        Self {
            cooldown: Duration::minutes(cooldown_minutes),
            last_alert: DashMap::new(),
        }
    }

    /// Whether a signal for this pair may be emitted at `now`.
    pub fn can_alert(&self, symbol: &str, direction: TradeDirection, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(&(symbol.to_string(), direction)) {
            Some(last) => {
                let elapsed = now - *last;
                if elapsed < self.cooldown {
                    debug!(
                        "{}: {} in cooldown ({}s of {}s elapsed)",
                        symbol,
                        direction,
                        elapsed.num_seconds(),
                        self.cooldown.num_seconds()
                    );
                    return false;
                }
                true
            }
            None => true,
        }
    }

    /// Record an emission.
    pub fn record(&self, symbol: &str, direction: TradeDirection, at: DateTime<Utc>) {
        self.last_alert.insert((symbol.to_string(), direction), at);
    }

    pub fn last_alert(&self, symbol: &str, direction: TradeDirection) -> Option<DateTime<Utc>> {
        self.last_alert
            .get(&(symbol.to_string(), direction))
            .map(|entry| *entry)
    }

    pub fn clear(&self) {
        self.last_alert.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_alert_allowed() {
        let tracker = CooldownTracker::new(5);
        assert!(tracker.can_alert("BTC", TradeDirection::Long, Utc::now()));
        assert!(tracker.last_alert("BTC", TradeDirection::Long).is_none());
    }

    #[test]
    fn test_blocks_within_window() {
        let tracker = CooldownTracker::new(5);
        let t0 = Utc::now();
        tracker.record("BTC", TradeDirection::Long, t0);

        assert!(!tracker.can_alert("BTC", TradeDirection::Long, t0 + Duration::minutes(4)));
        assert!(tracker.can_alert("BTC", TradeDirection::Long, t0 + Duration::minutes(5)));
    }

    #[test]
    fn test_directions_are_independent() {
        let tracker = CooldownTracker::new(5);
        let t0 = Utc::now();
        tracker.record("BTC", TradeDirection::Long, t0);

        assert!(tracker.can_alert("BTC", TradeDirection::Short, t0));
        assert!(tracker.can_alert("ETH", TradeDirection::Long, t0));
    }

    #[test]
    fn test_clear() {
        let tracker = CooldownTracker::new(5);
        let t0 = Utc::now();
        tracker.record("BTC", TradeDirection::Short, t0);
        tracker.clear();
        assert!(tracker.can_alert("BTC", TradeDirection::Short, t0));
    }
}
