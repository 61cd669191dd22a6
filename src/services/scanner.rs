//! Scan cycle driver.
//!
//! One cycle records the latest ticks, analyses every symbol that has
//! enough history and ranks the resulting candidates. The best ones are
//! resized to the account's free margin when balances are known, run past
//! the risk limiter and handed to the sinks. A failure on one symbol is
//! logged and never stops the others.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use super::history::{HistoryStore, PriceSource};
use super::risk::{AccountSource, PositionSizer, RiskManager};
use super::signals::generator::filter_top_signals;
use super::signals::{IndicatorEngine, SignalGenerator, SignalOutcome};
use super::sink::SignalSink;
use crate::config::{Config, ScannerConfig};
use crate::error::{AppError, Result};
use crate::types::{AccountSnapshot, PolicyCheck, PriceData, Signal};

/// Per-cycle overrides of the configured thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOptions {
    pub min_confidence: Option<f64>,
    pub max_alerts: Option<usize>,
    /// Balances to size against; takes precedence over the account source.
    pub account: Option<AccountSnapshot>,
}

/// What happened during one scan cycle.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub symbols_seen: usize,
    /// Ticks dropped for an unusable price.
    pub invalid_ticks: usize,
    pub with_history: usize,
    pub analyzed: usize,
    pub candidates: usize,
    /// Accepted by the risk limiter and delivered.
    pub emitted: Vec<Signal>,
    /// Ranked into the top list but refused for margin or by the risk limiter.
    pub blocked: usize,
    pub errors: usize,
}

pub struct Scanner {
    config: ScannerConfig,
    position_expiry_minutes: i64,
    max_margin_per_trade_percent: f64,
    engine: IndicatorEngine,
    generator: SignalGenerator,
    history: Arc<HistoryStore>,
    risk_manager: Arc<RiskManager>,
    sinks: Vec<Arc<dyn SignalSink>>,
    account_source: Option<Arc<dyn AccountSource>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scanner {
    pub fn new(config: &Config) -> Self {
        let history = Arc::new(HistoryStore::new(config.scanner.history_capacity));
        Self::with_history(config, history)
    }

    /// Build a scanner over an existing history store.
    pub fn with_history(config: &Config, history: Arc<HistoryStore>) -> Self {
        let risk_manager = Arc::new(RiskManager::new(&config.risk));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config: config.scanner.clone(),
            position_expiry_minutes: config.risk.position_expiry_minutes,
            max_margin_per_trade_percent: config.risk.max_margin_per_trade_percent,
            engine: IndicatorEngine::new(&config.indicators),
            generator: SignalGenerator::new(config, risk_manager.clone()),
            history,
            risk_manager,
            sinks: Vec::new(),
            account_source: None,
            shutdown_tx,
        }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn SignalSink>) {
        info!("Registered signal sink '{}'", sink.name());
        self.sinks.push(sink);
    }

    pub fn set_account_source(&mut self, source: Arc<dyn AccountSource>) {
        self.account_source = Some(source);
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn risk_manager(&self) -> &Arc<RiskManager> {
        &self.risk_manager
    }

    pub fn generator(&self) -> &SignalGenerator {
        &self.generator
    }

    /// Analyse one symbol from its recorded history.
    fn evaluate_symbol(
        &self,
        tick: &PriceData,
        min_confidence: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<SignalOutcome> {
        let history = self
            .history
            .snapshot(&tick.symbol)
            .ok_or_else(|| AppError::Internal(format!("no history for {}", tick.symbol)))?;
        let analysis = self.engine.analyze(&history)?;
        Ok(self
            .generator
            .generate_signal_at(&tick.symbol, tick, &analysis, min_confidence, now))
    }

    /// Shrink the size to the allowed share of free margin, then check the
    /// account can still fund it.
    fn fit_to_account(&self, signal: &mut Signal, account: &AccountSnapshot) -> PolicyCheck {
        signal.position_size = PositionSizer::dynamic_position_size(
            signal.position_size,
            account,
            self.max_margin_per_trade_percent,
        );
        if signal.position_size <= 0.0 {
            return PolicyCheck::reject(format!(
                "No margin available ({:.2} free)",
                account.available_margin
            ));
        }
        PositionSizer::can_afford(signal.position_size, account)
    }

    fn deliver(&self, signal: &Signal) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(signal) {
                warn!("Sink '{}' failed for {}: {}", sink.name(), signal.symbol, e);
            }
        }
    }

    /// Run one cycle over `ticks` at the current time.
    pub fn run_cycle(&self, ticks: &[PriceData], options: CycleOptions) -> CycleReport {
        self.run_cycle_at(ticks, options, Utc::now())
    }

    pub fn run_cycle_at(
        &self,
        ticks: &[PriceData],
        options: CycleOptions,
        now: DateTime<Utc>,
    ) -> CycleReport {
        let mut report = CycleReport::default();

        self.risk_manager
            .cleanup_expired_positions(now, self.position_expiry_minutes);

        let mut valid = Vec::with_capacity(ticks.len());
        for tick in ticks {
            report.symbols_seen += 1;
            if self.history.record(tick) {
                valid.push(tick);
            } else {
                report.invalid_ticks += 1;
            }
        }

        let mut candidates = Vec::new();
        for tick in valid {
            if !self
                .history
                .has_sufficient_history(&tick.symbol, self.config.min_history_periods)
            {
                debug!(
                    "{}: waiting for history ({}/{})",
                    tick.symbol,
                    self.history.len(&tick.symbol),
                    self.config.min_history_periods
                );
                continue;
            }
            report.with_history += 1;

            match self.evaluate_symbol(tick, options.min_confidence, now) {
                Ok(outcome) => {
                    report.analyzed += 1;
                    match outcome {
                        SignalOutcome::Emitted(signal) => candidates.push(*signal),
                        SignalOutcome::Rejected(reason) => {
                            debug!("{}: no signal ({})", tick.symbol, reason);
                        }
                    }
                }
                Err(e) => {
                    report.errors += 1;
                    if e.is_fatal() {
                        error!("Could not analyse {}: {}", tick.symbol, e);
                    } else {
                        warn!("Could not analyse {}: {}", tick.symbol, e);
                    }
                }
            }
        }

        report.candidates = candidates.len();
        let max_alerts = options
            .max_alerts
            .unwrap_or(self.generator.max_alerts_per_scan());

        let account = options
            .account
            .or_else(|| self.account_source.as_ref().and_then(|s| s.account()));

        for mut signal in filter_top_signals(candidates, max_alerts) {
            if let Some(account) = &account {
                if let PolicyCheck::Rejected(reason) = self.fit_to_account(&mut signal, account) {
                    report.blocked += 1;
                    warn!("{}: {} blocked - {}", signal.symbol, signal.direction, reason);
                    continue;
                }
            }

            match self.risk_manager.try_open(&signal) {
                PolicyCheck::Accepted => {
                    self.deliver(&signal);
                    report.emitted.push(signal);
                }
                PolicyCheck::Rejected(reason) => {
                    report.blocked += 1;
                    info!("{}: {} blocked - {}", signal.symbol, signal.direction, reason);
                }
            }
        }

        info!(
            "Scan complete: {} symbols ({} invalid), {} analysed, {} candidates, {} emitted, {} blocked, {} errors",
            report.symbols_seen,
            report.invalid_ticks,
            report.analyzed,
            report.candidates,
            report.emitted.len(),
            report.blocked,
            report.errors
        );

        report
    }

    /// Drop price points older than `max_age`.
    pub fn prune_history(&self, now: DateTime<Utc>, max_age: ChronoDuration) -> usize {
        self.history.clear_older_than(now - max_age)
    }

    /// Run cycles on a fixed interval until [`Scanner::shutdown`] is called.
    ///
    /// `next_ticks` supplies the latest tick for every symbol each cycle.
    pub async fn run<F>(&self, mut next_ticks: F)
    where
        F: FnMut() -> Vec<PriceData>,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.config.interval_seconds.max(1);
        info!("Scanner tick interval: {}s", period);
        let mut ticker = interval(Duration::from_secs(period));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let ticks = next_ticks();
                    if ticks.is_empty() {
                        error!("Price feed returned no ticks");
                        continue;
                    }
                    self.run_cycle(&ticks, CycleOptions::default());
                }
                _ = shutdown_rx.recv() => {
                    info!("Scanner received shutdown signal");
                    break;
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tick(symbol: &str, price: f64, at: DateTime<Utc>) -> PriceData {
        PriceData::new(symbol, "USDT", price, 100.0, at)
    }

    #[test]
    fn test_cycle_waits_for_history() {
        let scanner = Scanner::new(&Config::default());
        let report = scanner.run_cycle(&[tick("BTC", 100.0, Utc::now())], CycleOptions::default());
        assert_eq!(report.symbols_seen, 1);
        assert_eq!(report.with_history, 0);
        assert_eq!(report.analyzed, 0);
        assert!(report.emitted.is_empty());
    }

    #[test]
    fn test_cycle_analyses_after_warmup() {
        let scanner = Scanner::new(&Config::default());
        let now = Utc::now();
        let mut report = CycleReport::default();
        for i in 0..25 {
            report = scanner.run_cycle_at(
                &[tick("BTC", 100.0 + (i % 3) as f64, now)],
                CycleOptions::default(),
                now,
            );
        }
        assert_eq!(report.with_history, 1);
        assert_eq!(report.analyzed, 1);
        assert_eq!(report.errors, 0);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let mut config = Config::default();
        config.scanner.interval_seconds = 1;
        let scanner = Arc::new(Scanner::new(&config));
        let calls = Arc::new(AtomicUsize::new(0));

        let runner = {
            let scanner = scanner.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                scanner
                    .run(move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        vec![tick("BTC", 100.0, Utc::now())]
                    })
                    .await;
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        scanner.shutdown();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("scanner stopped")
            .expect("task joined");

        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(scanner.history().len("BTC"), calls.load(Ordering::SeqCst));
    }
}
