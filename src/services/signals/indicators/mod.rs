//! Technical indicator implementations.

pub mod atr;
pub mod bollinger;
pub mod divergence;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod obv;
pub mod rsi;
pub mod support_resistance;
pub mod trend;
pub mod volume;

pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use divergence::Divergence;
pub use ema::Ema;
pub use macd::Macd;
pub use momentum::Momentum;
pub use obv::Obv;
pub use rsi::Rsi;
pub use support_resistance::SupportResistanceLevels;
pub use trend::TrendEmas;
pub use volume::VolumeSurge;

use tracing::trace;

use super::Indicator;
use crate::config::IndicatorConfig;
use crate::error::{AppError, Result};
use crate::types::{FeatureSnapshot, HistorySnapshot};

/// Computes a full [`FeatureSnapshot`] from one symbol's history.
pub struct IndicatorEngine {
    rsi: Rsi,
    macd: Macd,
    bollinger: BollingerBands,
    atr: Atr,
    trend: TrendEmas,
    volume: VolumeSurge,
    momentum: Momentum,
    support_resistance: SupportResistanceLevels,
    divergence: Divergence,
    obv: Obv,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(&IndicatorConfig::default())
    }
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            bollinger: BollingerBands::new(config.bb_period, config.bb_std),
            atr: Atr::new(config.atr_period),
            trend: TrendEmas::new(config.trend_ema_fast, config.trend_ema_slow),
            volume: VolumeSurge::new(config.volume_surge_multiplier),
            momentum: Momentum::new(config.momentum_window),
            support_resistance: SupportResistanceLevels::new(config.sr_threshold_pct),
            divergence: Divergence::new(
                config.divergence_lookback,
                config.rsi_period,
                config.divergence_strength,
            ),
            obv: Obv,
        }
    }

    /// Reject histories the indicators cannot interpret.
    fn validate(history: &HistorySnapshot) -> Result<()> {
        if let Some(bad) = history.prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
            return Err(AppError::InvalidInput(format!("invalid price {}", bad)));
        }
        let ranges_ok = history
            .highs
            .iter()
            .chain(history.lows.iter())
            .all(|v| v.is_finite());
        if !ranges_ok {
            return Err(AppError::InvalidInput("non-finite high/low".to_string()));
        }
        if history.volumes.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AppError::InvalidInput("invalid volume".to_string()));
        }
        Ok(())
    }

    /// Ids of the required indicators absent from `snapshot`.
    pub fn missing_required(&self, snapshot: &FeatureSnapshot) -> Vec<&str> {
        [
            (self.rsi.id(), snapshot.rsi.is_none()),
            (self.macd.id(), snapshot.macd.is_none()),
            (self.bollinger.id(), snapshot.bollinger_bands.is_none()),
            (self.atr.id(), snapshot.atr.is_none()),
        ]
        .into_iter()
        .filter_map(|(id, absent)| absent.then_some(id))
        .collect()
    }

    /// Run every indicator over the history.
    ///
    /// Indicators without enough data are left absent (or at their neutral
    /// default); `has_data` is set only when RSI, MACD, Bollinger Bands and
    /// ATR are all present.
    pub fn analyze(&self, history: &HistorySnapshot) -> Result<FeatureSnapshot> {
        Self::validate(history)?;

        let mut snapshot = FeatureSnapshot {
            rsi: self.rsi.calculate(history),
            atr: self.atr.calculate(history),
            macd: self.macd.calculate(history),
            bollinger_bands: self.bollinger.calculate(history),
            trend: self.trend.calculate(history),
            volume: self.volume.calculate(history).unwrap_or_default(),
            momentum: self.momentum.calculate(history).unwrap_or_default(),
            support_resistance: self.support_resistance.calculate(history).unwrap_or_default(),
            rsi_divergence: self.divergence.calculate(history).unwrap_or_default(),
            obv: self.obv.calculate(history),
            has_data: false,
        };
        snapshot.refresh_completeness();

        if !snapshot.has_data {
            trace!(
                "Incomplete analysis over {} bars, missing {}",
                history.len(),
                self.missing_required(&snapshot).join(", ")
            );
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(count: usize) -> HistorySnapshot {
        let prices: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
        HistorySnapshot::from_prices(&prices)
    }

    #[test]
    fn test_short_history_lacks_data() {
        let snapshot = IndicatorEngine::default().analyze(&rising(20)).unwrap();
        assert!(!snapshot.has_data);
        assert!(snapshot.rsi.is_some());
        assert!(snapshot.macd.is_none());
        assert!(snapshot.trend.is_none());
    }

    #[test]
    fn test_missing_required_names_cold_indicators() {
        let engine = IndicatorEngine::default();
        let snapshot = engine.analyze(&rising(20)).unwrap();
        assert_eq!(engine.missing_required(&snapshot), vec!["macd"]);

        let warm = engine.analyze(&rising(60)).unwrap();
        assert!(engine.missing_required(&warm).is_empty());
    }

    #[test]
    fn test_full_history_has_data() {
        let snapshot = IndicatorEngine::default().analyze(&rising(60)).unwrap();
        assert!(snapshot.has_data);
        assert!(snapshot.trend.is_some());
        assert!(snapshot.obv.is_some());
        assert_eq!(snapshot.momentum.trend, crate::types::Bias::Bullish);
    }

    #[test]
    fn test_trend_optional_for_completeness() {
        // Enough for MACD (35) but not the slow trend EMA (50)
        let snapshot = IndicatorEngine::default().analyze(&rising(40)).unwrap();
        assert!(snapshot.has_data);
        assert!(snapshot.trend.is_none());
    }

    #[test]
    fn test_rejects_invalid_prices() {
        let engine = IndicatorEngine::default();
        let nan = HistorySnapshot::from_prices(&[100.0, f64::NAN, 101.0]);
        assert!(matches!(engine.analyze(&nan), Err(AppError::InvalidInput(_))));

        let negative = HistorySnapshot::from_prices(&[100.0, -1.0]);
        assert!(engine.analyze(&negative).is_err());
    }

    #[test]
    fn test_empty_history_is_not_an_error() {
        let snapshot = IndicatorEngine::default()
            .analyze(&HistorySnapshot::default())
            .unwrap();
        assert!(!snapshot.has_data);
    }
}
