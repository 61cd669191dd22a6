use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use spectre::config::Config;
use spectre::services::{LogSink, Scanner};
use spectre::types::PriceData;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Random-walk ticker standing in for a live exchange feed.
struct SimulatedFeed {
    prices: HashMap<String, f64>,
}

impl SimulatedFeed {
    fn new(symbols: &[String]) -> Self {
        let prices = symbols
            .iter()
            .map(|s| {
                let start = match s.as_str() {
                    "BTC" => 65_000.0,
                    "ETH" => 3_200.0,
                    "SOL" => 150.0,
                    "BNB" => 580.0,
                    "XRP" => 0.55,
                    _ => 100.0,
                };
                (s.clone(), start)
            })
            .collect();
        Self { prices }
    }

    fn next_ticks(&mut self) -> Vec<PriceData> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let mut ticks: Vec<PriceData> = self
            .prices
            .iter_mut()
            .map(|(symbol, price)| {
                let step: f64 = rng.gen_range(-0.004..0.004);
                let open = *price;
                *price = (open * (1.0 + step)).max(f64::EPSILON);
                let spread = *price * rng.gen_range(0.0..0.002);
                let volume = rng.gen_range(50.0..150.0) * if rng.gen_bool(0.05) { 3.0 } else { 1.0 };
                PriceData::new(symbol, "USDT", *price, volume, now)
                    .with_range(price.max(open) + spread, price.min(open) - spread)
            })
            .collect();
        ticks.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        ticks
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spectre=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting Spectre scanner for {} symbols every {}s",
        config.scanner.symbols.len(),
        config.scanner.interval_seconds
    );

    let mut scanner = Scanner::new(&config);
    scanner.add_sink(Arc::new(LogSink));
    let scanner = Arc::new(scanner);

    let shutdown = {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
            scanner.shutdown();
        })
    };

    let mut feed = SimulatedFeed::new(&config.scanner.symbols);
    scanner.run(|| feed.next_ticks()).await;
    shutdown.abort();

    info!(
        "Scanner stopped with {} open positions",
        scanner.risk_manager().active_count()
    );
    Ok(())
}
