use std::env;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::types::{ConfidenceTier, IndicatorFamily, TakeProfitTarget};

/// Indicator periods and thresholds.
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub atr_period: usize,
    pub trend_ema_fast: usize,
    pub trend_ema_slow: usize,
    /// Current volume must be at least this multiple of the prior average.
    pub volume_surge_multiplier: f64,
    /// Closes inspected for up/down momentum steps.
    pub momentum_window: usize,
    /// Bars inspected for price/RSI divergence.
    pub divergence_lookback: usize,
    /// Fixed strength reported when a divergence is found.
    pub divergence_strength: f64,
    /// Relative distance (percent) used to cluster and match support/resistance levels.
    pub sr_threshold_pct: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std: 2.0,
            atr_period: 14,
            trend_ema_fast: 20,
            trend_ema_slow: 50,
            volume_surge_multiplier: 2.0,
            momentum_window: 5,
            divergence_lookback: 10,
            divergence_strength: 20.0,
            sr_threshold_pct: 2.0,
        }
    }
}

/// Per-family multipliers applied to raw indicator strength.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorWeights {
    pub rsi: f64,
    pub macd: f64,
    pub trend: f64,
    pub volume: f64,
    pub momentum: f64,
    pub divergence: f64,
    pub support_resistance: f64,
}

impl Default for IndicatorWeights {
    fn default() -> Self {
        Self {
            rsi: 1.0,
            macd: 1.2,
            trend: 1.5,
            volume: 1.0,
            momentum: 0.8,
            divergence: 1.3,
            support_resistance: 1.1,
        }
    }
}

impl IndicatorWeights {
    /// Weight for an indicator family. Bollinger touches are unweighted.
    pub fn get(&self, family: IndicatorFamily) -> f64 {
        match family {
            IndicatorFamily::Rsi => self.rsi,
            IndicatorFamily::Macd => self.macd,
            IndicatorFamily::Trend => self.trend,
            IndicatorFamily::Volume => self.volume,
            IndicatorFamily::Momentum => self.momentum,
            IndicatorFamily::Divergence => self.divergence,
            IndicatorFamily::SupportResistance => self.support_resistance,
            IndicatorFamily::Bollinger => 1.0,
        }
    }

    fn set(&mut self, family: IndicatorFamily, weight: f64) -> Result<()> {
        match family {
            IndicatorFamily::Rsi => self.rsi = weight,
            IndicatorFamily::Macd => self.macd = weight,
            IndicatorFamily::Trend => self.trend = weight,
            IndicatorFamily::Volume => self.volume = weight,
            IndicatorFamily::Momentum => self.momentum = weight,
            IndicatorFamily::Divergence => self.divergence = weight,
            IndicatorFamily::SupportResistance => self.support_resistance = weight,
            IndicatorFamily::Bollinger => {
                return Err(AppError::Config(
                    "bollinger contributions are not weighted".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Parse a `family=weight,family=weight` list on top of the defaults.
    /// Format: "rsi=1.0,macd=1.2,trend=1.5"
    pub fn parse(list: &str) -> Result<Self> {
        let mut weights = Self::default();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry.split_once('=').ok_or_else(|| {
                AppError::Config(format!("weight entry '{}' must be family=value", entry))
            })?;
            let family = IndicatorFamily::from_str(name.trim()).ok_or_else(|| {
                AppError::Config(format!("unknown indicator family '{}'", name.trim()))
            })?;
            let weight: f64 = value.trim().parse().map_err(|_| {
                AppError::Config(format!("weight for '{}' is not a number", name.trim()))
            })?;
            weights.set(family, weight)?;
        }
        Ok(weights)
    }

    fn all(&self) -> [(&'static str, f64); 7] {
        [
            ("rsi", self.rsi),
            ("macd", self.macd),
            ("trend", self.trend),
            ("volume", self.volume),
            ("momentum", self.momentum),
            ("divergence", self.divergence),
            ("support_resistance", self.support_resistance),
        ]
    }
}

/// Signal emission policy.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// A side needs strictly more than this many agreeing indicators.
    pub min_signals_required: usize,
    pub min_confidence: f64,
    pub cooldown_minutes: i64,
    pub max_alerts_per_scan: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_signals_required: 3,
            min_confidence: 60.0,
            cooldown_minutes: 5,
            max_alerts_per_scan: 3,
        }
    }
}

/// Capital, stop/target geometry and exposure limits.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub total_capital: f64,
    pub risk_per_trade_percent: f64,
    pub stop_loss_percent: f64,
    pub use_atr_stops: bool,
    pub atr_stop_multiplier: f64,
    pub take_profit_targets: Vec<TakeProfitTarget>,
    pub default_leverage: u32,
    pub max_leverage: u32,
    pub max_concurrent_positions: usize,
    pub position_expiry_minutes: i64,
    pub min_risk_reward_ratio: f64,
    pub transaction_cost_percent: f64,
    /// Fraction of total capital a single position may never exceed (0, 1].
    pub capital_safety_fraction: f64,
    /// Confidence tiers, highest first, selecting the max percent of capital per trade.
    pub confidence_tiers: Vec<ConfidenceTier>,
    /// Percent of capital per trade below the lowest tier.
    pub base_capital_percent: f64,
    /// Share of the account's available margin one signal may commit.
    pub max_margin_per_trade_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            total_capital: 10_000.0,
            risk_per_trade_percent: 2.5,
            stop_loss_percent: 0.5,
            use_atr_stops: false,
            atr_stop_multiplier: 2.0,
            take_profit_targets: vec![
                TakeProfitTarget::new(1.0, 50.0),
                TakeProfitTarget::new(1.5, 50.0),
            ],
            default_leverage: 5,
            max_leverage: 10,
            max_concurrent_positions: 3,
            position_expiry_minutes: 5,
            min_risk_reward_ratio: 1.5,
            transaction_cost_percent: 0.0,
            capital_safety_fraction: 0.95,
            confidence_tiers: vec![
                ConfidenceTier::new(75.0, 35.0),
                ConfidenceTier::new(65.0, 28.0),
                ConfidenceTier::new(55.0, 22.0),
            ],
            base_capital_percent: 18.0,
            max_margin_per_trade_percent: 50.0,
        }
    }
}

/// Parse a take-profit list.
/// Format: "target%:exit%,target%:exit%" e.g. "1.0:50,1.5:50"
pub fn parse_targets(list: &str) -> Result<Vec<TakeProfitTarget>> {
    list.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|entry| {
            let (target, exit) = entry.split_once(':').ok_or_else(|| {
                AppError::Config(format!("take-profit entry '{}' must be target:exit", entry))
            })?;
            let target = target.trim().parse::<f64>().map_err(|_| {
                AppError::Config(format!("take-profit target '{}' is not a number", target))
            })?;
            let exit = exit.trim().parse::<f64>().map_err(|_| {
                AppError::Config(format!("take-profit exit '{}' is not a number", exit))
            })?;
            Ok(TakeProfitTarget::new(target, exit))
        })
        .collect()
}

/// Scan loop settings for the binary.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub symbols: Vec<String>,
    pub interval_seconds: u64,
    pub history_capacity: usize,
    pub min_history_periods: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: ["BTC", "ETH", "SOL", "BNB", "XRP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            interval_seconds: 5,
            history_capacity: 100,
            min_history_periods: 20,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub indicators: IndicatorConfig,
    pub weights: IndicatorWeights,
    pub signals: SignalConfig,
    pub risk: RiskConfig,
    pub scanner: ScannerConfig,
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables and validate it.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let indicators = IndicatorConfig {
            rsi_period: env_or("RSI_PERIOD", d.indicators.rsi_period)?,
            rsi_oversold: env_or("RSI_OVERSOLD", d.indicators.rsi_oversold)?,
            rsi_overbought: env_or("RSI_OVERBOUGHT", d.indicators.rsi_overbought)?,
            macd_fast: env_or("MACD_FAST", d.indicators.macd_fast)?,
            macd_slow: env_or("MACD_SLOW", d.indicators.macd_slow)?,
            macd_signal: env_or("MACD_SIGNAL", d.indicators.macd_signal)?,
            bb_period: env_or("BB_PERIOD", d.indicators.bb_period)?,
            bb_std: env_or("BB_STD", d.indicators.bb_std)?,
            atr_period: env_or("ATR_PERIOD", d.indicators.atr_period)?,
            trend_ema_fast: env_or("TREND_EMA_FAST", d.indicators.trend_ema_fast)?,
            trend_ema_slow: env_or("TREND_EMA_SLOW", d.indicators.trend_ema_slow)?,
            volume_surge_multiplier: env_or(
                "VOLUME_SURGE_MULTIPLIER",
                d.indicators.volume_surge_multiplier,
            )?,
            momentum_window: env_or("MOMENTUM_WINDOW", d.indicators.momentum_window)?,
            divergence_lookback: env_or("DIVERGENCE_LOOKBACK", d.indicators.divergence_lookback)?,
            divergence_strength: env_or("DIVERGENCE_STRENGTH", d.indicators.divergence_strength)?,
            sr_threshold_pct: env_or("SR_THRESHOLD_PCT", d.indicators.sr_threshold_pct)?,
        };

        let weights = match env::var("INDICATOR_WEIGHTS") {
            Ok(list) => IndicatorWeights::parse(&list)?,
            Err(_) => d.weights,
        };

        let signals = SignalConfig {
            min_signals_required: env_or("MIN_SIGNALS_REQUIRED", d.signals.min_signals_required)?,
            min_confidence: env_or("MIN_CONFIDENCE", d.signals.min_confidence)?,
            cooldown_minutes: env_or("COOLDOWN_MINUTES", d.signals.cooldown_minutes)?,
            max_alerts_per_scan: env_or("MAX_ALERTS_PER_SCAN", d.signals.max_alerts_per_scan)?,
        };

        let take_profit_targets = match env::var("TAKE_PROFIT_TARGETS") {
            Ok(list) => parse_targets(&list)?,
            Err(_) => d.risk.take_profit_targets,
        };

        let risk = RiskConfig {
            total_capital: env_or("TOTAL_CAPITAL", d.risk.total_capital)?,
            risk_per_trade_percent: env_or("RISK_PER_TRADE_PERCENT", d.risk.risk_per_trade_percent)?,
            stop_loss_percent: env_or("STOP_LOSS_PERCENT", d.risk.stop_loss_percent)?,
            use_atr_stops: env_flag("USE_ATR_STOPS", d.risk.use_atr_stops),
            atr_stop_multiplier: env_or("ATR_STOP_MULTIPLIER", d.risk.atr_stop_multiplier)?,
            take_profit_targets,
            default_leverage: env_or("DEFAULT_LEVERAGE", d.risk.default_leverage)?,
            max_leverage: env_or("MAX_LEVERAGE", d.risk.max_leverage)?,
            max_concurrent_positions: env_or(
                "MAX_CONCURRENT_POSITIONS",
                d.risk.max_concurrent_positions,
            )?,
            position_expiry_minutes: env_or(
                "POSITION_EXPIRY_MINUTES",
                d.risk.position_expiry_minutes,
            )?,
            min_risk_reward_ratio: env_or("MIN_RISK_REWARD_RATIO", d.risk.min_risk_reward_ratio)?,
            transaction_cost_percent: env_or(
                "TRANSACTION_COST_PERCENT",
                d.risk.transaction_cost_percent,
            )?,
            capital_safety_fraction: env_or(
                "CAPITAL_SAFETY_FRACTION",
                d.risk.capital_safety_fraction,
            )?,
            confidence_tiers: d.risk.confidence_tiers,
            base_capital_percent: env_or("BASE_CAPITAL_PERCENT", d.risk.base_capital_percent)?,
            max_margin_per_trade_percent: env_or(
                "MAX_MARGIN_PER_TRADE_PERCENT",
                d.risk.max_margin_per_trade_percent,
            )?,
        };

        // Format: "BTC,ETH,SOL"
        let symbols = env::var("SYMBOLS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|sym| sym.trim().to_uppercase())
                    .filter(|sym| !sym.is_empty())
                    .collect()
            })
            .unwrap_or(d.scanner.symbols);

        let scanner = ScannerConfig {
            symbols,
            interval_seconds: env_or("SCAN_INTERVAL_SECONDS", d.scanner.interval_seconds)?,
            history_capacity: env_or("HISTORY_CAPACITY", d.scanner.history_capacity)?,
            min_history_periods: env_or("MIN_HISTORY_PERIODS", d.scanner.min_history_periods)?,
        };

        let config = Self {
            indicators,
            weights,
            signals,
            risk,
            scanner,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings before the first scan.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(AppError::Config(msg));
        let ind = &self.indicators;

        for (name, period) in [
            ("rsi_period", ind.rsi_period),
            ("macd_fast", ind.macd_fast),
            ("macd_slow", ind.macd_slow),
            ("macd_signal", ind.macd_signal),
            ("bb_period", ind.bb_period),
            ("atr_period", ind.atr_period),
            ("momentum_window", ind.momentum_window),
            ("trend_ema_fast", ind.trend_ema_fast),
            ("trend_ema_slow", ind.trend_ema_slow),
        ] {
            if period == 0 {
                return fail(format!("{} must be greater than zero", name));
            }
        }
        if ind.macd_fast >= ind.macd_slow {
            return fail("macd_fast must be smaller than macd_slow".to_string());
        }
        if ind.trend_ema_fast >= ind.trend_ema_slow {
            return fail("trend_ema_fast must be smaller than trend_ema_slow".to_string());
        }
        if !(0.0 < ind.rsi_oversold && ind.rsi_oversold < ind.rsi_overbought && ind.rsi_overbought < 100.0) {
            return fail("RSI thresholds must satisfy 0 < oversold < overbought < 100".to_string());
        }
        if ind.bb_std <= 0.0 || ind.volume_surge_multiplier <= 0.0 || ind.sr_threshold_pct <= 0.0 {
            return fail("bb_std, volume_surge_multiplier and sr_threshold_pct must be positive".to_string());
        }

        for (name, weight) in self.weights.all() {
            if !weight.is_finite() || weight <= 0.0 {
                return fail(format!("weight '{}' must be positive", name));
            }
        }

        let risk = &self.risk;
        if risk.take_profit_targets.is_empty() {
            return fail("at least one take-profit target is required".to_string());
        }
        if risk
            .take_profit_targets
            .iter()
            .any(|t| t.target_percent <= 0.0 || t.exit_percent <= 0.0)
        {
            return fail("take-profit targets and exits must be positive".to_string());
        }
        if risk.stop_loss_percent <= 0.0 {
            return fail("stop_loss_percent must be positive".to_string());
        }
        if risk.default_leverage < 1 || risk.default_leverage > risk.max_leverage {
            return fail(format!(
                "default_leverage {} must be within 1..={}",
                risk.default_leverage, risk.max_leverage
            ));
        }
        if risk.total_capital <= 0.0 || risk.risk_per_trade_percent <= 0.0 {
            return fail("total_capital and risk_per_trade_percent must be positive".to_string());
        }
        if !(risk.capital_safety_fraction > 0.0 && risk.capital_safety_fraction <= 1.0) {
            return fail("capital_safety_fraction must be within (0, 1]".to_string());
        }
        if !(risk.max_margin_per_trade_percent > 0.0 && risk.max_margin_per_trade_percent <= 100.0) {
            return fail("max_margin_per_trade_percent must be within (0, 100]".to_string());
        }
        if risk.max_concurrent_positions == 0 {
            return fail("max_concurrent_positions must be at least 1".to_string());
        }

        if self.scanner.history_capacity < self.scanner.min_history_periods {
            return fail("history_capacity must be at least min_history_periods".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.indicators.rsi_period, 14);
        assert_eq!(config.signals.min_signals_required, 3);
        assert_eq!(config.risk.take_profit_targets.len(), 2);
    }

    #[test]
    fn test_default_weights() {
        let w = IndicatorWeights::default();
        assert_eq!(w.get(IndicatorFamily::Rsi), 1.0);
        assert_eq!(w.get(IndicatorFamily::Macd), 1.2);
        assert_eq!(w.get(IndicatorFamily::Trend), 1.5);
        assert_eq!(w.get(IndicatorFamily::Volume), 1.0);
        assert_eq!(w.get(IndicatorFamily::Momentum), 0.8);
        assert_eq!(w.get(IndicatorFamily::Divergence), 1.3);
        assert_eq!(w.get(IndicatorFamily::SupportResistance), 1.1);
        assert_eq!(w.get(IndicatorFamily::Bollinger), 1.0);
    }

    #[test]
    fn test_parse_weights_overrides_defaults() {
        let w = IndicatorWeights::parse("rsi=2.0, trend=0.5").unwrap();
        assert_eq!(w.rsi, 2.0);
        assert_eq!(w.trend, 0.5);
        assert_eq!(w.macd, 1.2);
    }

    #[test]
    fn test_parse_weights_rejects_unknown_family() {
        assert!(matches!(
            IndicatorWeights::parse("fibonacci=1.0"),
            Err(AppError::Config(_))
        ));
        assert!(IndicatorWeights::parse("rsi").is_err());
        assert!(IndicatorWeights::parse("rsi=abc").is_err());
    }

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets("1.0:50, 2.5:50").unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].target_percent, 2.5);
        assert_eq!(targets[1].exit_percent, 50.0);

        assert!(parse_targets("1.0").is_err());
        assert!(parse_targets("x:50").is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_macd() {
        let mut config = Config::default();
        config.indicators.macd_fast = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_leverage() {
        let mut config = Config::default();
        config.risk.default_leverage = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_targets() {
        let mut config = Config::default();
        config.risk.take_profit_targets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_weight() {
        let mut config = Config::default();
        config.weights.momentum = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_safety_fraction_out_of_range() {
        let mut config = Config::default();
        config.risk.capital_safety_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_margin_share_out_of_range() {
        let mut config = Config::default();
        config.risk.max_margin_per_trade_percent = 0.0;
        assert!(config.validate().is_err());
        config.risk.max_margin_per_trade_percent = 100.0;
        assert!(config.validate().is_ok());
    }
}
