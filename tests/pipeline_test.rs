//! End-to-end scan cycles through the history store, generator, risk limiter and sinks.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use spectre::config::Config;
use spectre::error::{AppError, Result};
use spectre::services::{AccountSource, CycleOptions, HistoryStore, Scanner, SignalSink};
use spectre::types::{AccountSnapshot, PriceData, Signal, TradeDirection};

#[derive(Default)]
struct CollectingSink {
    signals: Mutex<Vec<Signal>>,
}

impl CollectingSink {
    fn collected(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }
}

impl SignalSink for CollectingSink {
    fn name(&self) -> &str {
        "collect"
    }

    fn deliver(&self, signal: &Signal) -> Result<()> {
        self.signals.lock().unwrap().push(signal.clone());
        Ok(())
    }
}

struct FailingSink;

impl SignalSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn deliver(&self, _signal: &Signal) -> Result<()> {
        Err(AppError::Sink("webhook unreachable".to_string()))
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.signals.min_signals_required = 1;
    config
}

fn rising(i: usize, at: DateTime<Utc>) -> PriceData {
    PriceData::new("BTC", "USDT", 100.0 * 1.01f64.powi(i as i32), 10.0, at)
}

fn broken(at: DateTime<Utc>) -> PriceData {
    PriceData::new("BAD", "USDT", 50.0, 10.0, at).with_range(f64::NAN, 50.0)
}

#[test]
fn test_scan_emits_and_isolates_failures() {
    let mut scanner = Scanner::with_history(&config(), Arc::new(HistoryStore::new(100)));
    let sink = Arc::new(CollectingSink::default());
    scanner.add_sink(Arc::new(FailingSink));
    scanner.add_sink(sink.clone());

    let options = CycleOptions {
        min_confidence: Some(0.0),
        max_alerts: None,
        ..CycleOptions::default()
    };
    let t0 = Utc::now();
    let mut last_report = None;
    for i in 0..60 {
        let at = t0 + Duration::minutes(i as i64);
        let report = scanner.run_cycle_at(&[rising(i, at), broken(at)], options, at);

        // Nothing can be emitted before the slow indicators have warmed up
        if i < 34 {
            assert!(report.emitted.is_empty());
        }
        last_report = Some(report);
    }

    let report = last_report.expect("cycles ran");
    assert_eq!(report.symbols_seen, 2);
    assert_eq!(report.with_history, 2);
    assert_eq!(report.analyzed, 1);
    assert_eq!(report.errors, 1);

    let delivered = sink.collected();
    assert!(!delivered.is_empty());
    assert!(delivered.iter().all(|s| s.symbol == "BTC"));
    assert!(delivered.iter().all(|s| s.direction == TradeDirection::Long));
    assert!(delivered.iter().all(|s| s.stop_loss < s.entry_price));

    // One signal per symbol and direction per cooldown window
    let cooldown = Duration::minutes(Config::default().signals.cooldown_minutes);
    for pair in delivered.windows(2) {
        assert!(pair[1].timestamp - pair[0].timestamp >= cooldown);
    }
}

#[test]
fn test_unusable_tick_is_skipped() {
    let mut scanner = Scanner::new(&config());
    let sink = Arc::new(CollectingSink::default());
    scanner.add_sink(sink.clone());

    let options = CycleOptions {
        min_confidence: Some(0.0),
        ..CycleOptions::default()
    };
    let t0 = Utc::now();
    for i in 0..60 {
        let at = t0 + Duration::minutes(i as i64);
        scanner.run_cycle_at(&[rising(i, at)], options, at);
    }
    let recorded = scanner.history().len("BTC");

    let at = t0 + Duration::minutes(70);
    for price in [0.0, f64::NAN] {
        let bad = PriceData::new("BTC", "USDT", price, 10.0, at);
        let report = scanner.run_cycle_at(&[bad], options, at);
        assert_eq!(report.symbols_seen, 1);
        assert_eq!(report.invalid_ticks, 1);
        assert_eq!(report.with_history, 0);
        assert!(report.emitted.is_empty());
    }

    assert_eq!(scanner.history().len("BTC"), recorded);
    assert!(sink
        .collected()
        .iter()
        .all(|s| s.entry_price.is_finite() && s.entry_price > 0.0));
}

struct EmptyAccount;

impl AccountSource for EmptyAccount {
    fn account(&self) -> Option<AccountSnapshot> {
        Some(AccountSnapshot::new(0.0, 2_000.0))
    }
}

#[test]
fn test_exhausted_margin_blocks_signals() {
    let mut scanner = Scanner::new(&config());
    let sink = Arc::new(CollectingSink::default());
    scanner.add_sink(sink.clone());
    scanner.set_account_source(Arc::new(EmptyAccount));

    let options = CycleOptions {
        min_confidence: Some(0.0),
        ..CycleOptions::default()
    };
    let t0 = Utc::now();
    let mut blocked = 0;
    for i in 0..60 {
        let at = t0 + Duration::minutes(i as i64);
        let report = scanner.run_cycle_at(&[rising(i, at)], options, at);
        assert!(report.emitted.is_empty());
        blocked += report.blocked;
    }

    assert!(blocked > 0);
    assert!(sink.collected().is_empty());
    assert_eq!(scanner.risk_manager().active_count(), 0);
}

#[test]
fn test_size_fits_free_margin() {
    let scanner = Scanner::new(&config());
    let max_share = config().risk.max_margin_per_trade_percent;
    let account = AccountSnapshot::new(100.0, 0.0);
    let options = CycleOptions {
        min_confidence: Some(0.0),
        account: Some(account),
        ..CycleOptions::default()
    };

    let t0 = Utc::now();
    let mut emitted = Vec::new();
    for i in 0..60 {
        let at = t0 + Duration::minutes(i as i64);
        emitted.extend(scanner.run_cycle_at(&[rising(i, at)], options, at).emitted);
    }

    assert!(!emitted.is_empty());
    let limit = account.available_margin * max_share / 100.0;
    assert!(emitted
        .iter()
        .all(|s| s.position_size > 0.0 && s.position_size <= limit));
}

#[test]
fn test_scan_respects_alert_cap() {
    let scanner = Scanner::new(&config());
    let t0 = Utc::now();
    let options = CycleOptions {
        min_confidence: Some(0.0),
        max_alerts: Some(0),
        ..CycleOptions::default()
    };
    for i in 0..60 {
        let at = t0 + Duration::minutes(i as i64);
        let report = scanner.run_cycle_at(&[rising(i, at)], options, at);
        assert!(report.emitted.is_empty());
        assert_eq!(report.blocked, 0);
    }
    assert_eq!(scanner.risk_manager().active_count(), 0);
}

#[test]
fn test_history_is_bounded() {
    let mut config = config();
    config.scanner.history_capacity = 30;
    let scanner = Scanner::new(&config);
    let t0 = Utc::now();
    for i in 0..50 {
        let at = t0 + Duration::seconds(i as i64);
        scanner.run_cycle_at(&[rising(i, at)], CycleOptions::default(), at);
    }
    assert_eq!(scanner.history().len("BTC"), 30);
    assert_eq!(scanner.prune_history(t0 + Duration::seconds(60), Duration::seconds(15)), 25);
}

#[test]
fn test_run_loop_stops_on_shutdown() {
    let scanner = Arc::new(Scanner::new(&config()));
    tokio_test::block_on(async {
        let stopper = scanner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            stopper.shutdown();
        });

        let mut i = 0;
        scanner
            .run(|| {
                i += 1;
                vec![rising(i, Utc::now())]
            })
            .await;
    });
    assert!(scanner.history().len("BTC") >= 1);
}
