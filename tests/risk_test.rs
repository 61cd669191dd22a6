//! Position sizing and risk limiter tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use spectre::config::{Config, RiskConfig};
use spectre::services::signals::SignalGenerator;
use spectre::services::{profit_loss, PositionSizer, RiskManager};
use spectre::types::{
    AccountSnapshot, Bias, BollingerResult, DivergenceResult, FeatureSnapshot, MacdResult,
    MomentumResult, PriceData, Signal, TradeDirection,
};

#[test]
fn test_size_never_exceeds_caps() {
    let config = RiskConfig::default();
    let sizer = PositionSizer::new(&config);
    let safety_cap = config.total_capital * config.capital_safety_fraction;

    let entries = [0.0001, 0.55, 100.0, 65_000.0];
    let stop_offsets = [1e-9, 0.0001, 0.005, 0.05, 0.5, 0.99];
    let leverages = [0, 1, 5, 10, 125];
    let confidences = [None, Some(0.0), Some(55.0), Some(65.0), Some(99.0)];

    for entry in entries {
        for offset in stop_offsets {
            for leverage in leverages {
                for confidence in confidences {
                    let stop = entry * (1.0 - offset);
                    let size = sizer.calculate_position_size(entry, stop, leverage, confidence);
                    let tier_cap =
                        config.total_capital * sizer.max_percent_for(confidence) / 100.0;
                    assert!(size >= 0.0, "negative size for {} {}", entry, offset);
                    assert!(size <= tier_cap.min(safety_cap) + 1e-9);
                }
            }
        }
    }
}

#[test]
fn test_undefined_stop_distance_sizes_zero() {
    let sizer = PositionSizer::new(&RiskConfig::default());
    assert_eq!(sizer.calculate_position_size(100.0, 100.0, 5, Some(90.0)), 0.0);
    assert_eq!(sizer.calculate_position_size(0.0, 1.0, 5, Some(90.0)), 0.0);
    assert_eq!(sizer.calculate_position_size(f64::NAN, 1.0, 5, None), 0.0);
    assert_eq!(sizer.calculate_position_size(100.0, f64::INFINITY, 5, None), 0.0);
}

#[test]
fn test_account_limits() {
    let account = AccountSnapshot::new(1_000.0, 250.0);
    assert_eq!(account.total_balance, 1_250.0);
    assert_eq!(PositionSizer::dynamic_position_size(900.0, &account, 50.0), 500.0);
    assert_eq!(PositionSizer::dynamic_position_size(300.0, &account, 50.0), 300.0);
    assert!(PositionSizer::can_afford(1_000.0, &account).is_accepted());
    assert!(!PositionSizer::can_afford(1_000.01, &account).is_accepted());
}

fn emit(generator: &SignalGenerator, symbol: &str) -> Signal {
    let mut analysis = FeatureSnapshot {
        rsi: Some(10.0),
        atr: Some(1.0),
        macd: Some(MacdResult {
            macd: 1.0,
            signal: 0.2,
            histogram: 0.8,
            prev_histogram: -0.1,
            bullish_crossover: true,
            bearish_crossover: false,
        }),
        bollinger_bands: Some(BollingerResult {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
            current: 90.5,
            position: 0.05,
            at_lower: true,
            at_upper: false,
            bandwidth: 20.0,
        }),
        ..FeatureSnapshot::default()
    };
    analysis.support_resistance.near_support = true;
    analysis.rsi_divergence = DivergenceResult {
        bullish_divergence: true,
        bearish_divergence: false,
        divergence_strength: 20.0,
    };
    analysis.momentum = MomentumResult {
        trend: Bias::Bullish,
        strength: 1.0,
        change_percent: 1.0,
        score: 100.0,
    };
    analysis.refresh_completeness();

    let tick = PriceData::new(symbol, "USDT", 100.0, 1.0, Utc::now());
    generator
        .generate_signal(symbol, &tick, &analysis, None)
        .into_signal()
        .expect("signal emitted")
}

#[test]
fn test_concurrent_limit_and_expiry() {
    let config = Config::default();
    let manager = Arc::new(RiskManager::new(&config.risk));
    let generator = SignalGenerator::new(&config, manager.clone());

    let signals: Vec<Signal> = ["BTC", "ETH", "SOL", "BNB"]
        .iter()
        .map(|s| emit(&generator, s))
        .collect();

    // Sizing alone never touches the ledger
    assert_eq!(manager.active_count(), 0);

    let accepted = signals.iter().filter(|s| manager.try_open(s).is_accepted()).count();
    assert_eq!(accepted, 3);
    assert_eq!(manager.active_count(), 3);
    assert!(manager.get_position("BNB").is_none());

    let later = Utc::now() + Duration::minutes(config.risk.position_expiry_minutes + 1);
    assert_eq!(
        manager.cleanup_expired_positions(later, config.risk.position_expiry_minutes),
        3
    );
    assert!(manager.try_open(&signals[3]).is_accepted());
}

#[test]
fn test_profit_loss_symmetry() {
    for direction in [TradeDirection::Long, TradeDirection::Short] {
        let (up, _) = profit_loss(100.0, 102.0, 500.0, 5, direction);
        let (down, _) = profit_loss(100.0, 98.0, 500.0, 5, direction);
        assert!((up + down).abs() < 1e-9);
        assert!((up.abs() - 50.0).abs() < 1e-9);
    }
    assert_eq!(profit_loss(0.0, 1.0, 500.0, 5, TradeDirection::Long), (0.0, 0.0));
}
