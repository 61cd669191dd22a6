use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded observation of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Latest ticker data for a symbol as delivered by the price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceData {
    /// Base symbol (e.g., "BTC").
    pub symbol: String,
    /// Exchange market identifier (e.g., "BTCINR").
    pub market: String,
    pub price: f64,
    pub volume: f64,
    pub high: f64,
    pub low: f64,
    /// 24h change percentage as reported by the exchange.
    pub change_24h: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceData {
    /// Build a tick whose market is the symbol quoted in `quote`.
    pub fn new(symbol: &str, quote: &str, price: f64, volume: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            market: format!("{}{}", symbol, quote),
            price,
            volume,
            high: price,
            low: price,
            change_24h: 0.0,
            timestamp,
        }
    }

    /// Override the bar high/low.
    pub fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = high;
        self.low = low;
        self
    }

    pub fn to_point(&self) -> PricePoint {
        PricePoint {
            price: self.price,
            high: self.high,
            low: self.low,
            volume: self.volume,
            timestamp: self.timestamp,
        }
    }
}

/// Column-wise copy of a symbol's history, oldest first.
///
/// The indicator engine only ever reads these lists; the history itself is
/// owned by the price source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    pub prices: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl HistorySnapshot {
    /// Build a snapshot from closes only; highs and lows mirror the closes
    /// and volume is flat.
    pub fn from_prices(prices: &[f64]) -> Self {
        Self {
            prices: prices.to_vec(),
            highs: prices.to_vec(),
            lows: prices.to_vec(),
            volumes: vec![1.0; prices.len()],
        }
    }

    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a PricePoint>,
    {
        let mut snapshot = Self::default();
        for point in points {
            snapshot.prices.push(point.price);
            snapshot.highs.push(point.high);
            snapshot.lows.push(point.low);
            snapshot.volumes.push(point.volume);
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn current_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    pub fn current_volume(&self) -> Option<f64> {
        self.volumes.last().copied()
    }
}
