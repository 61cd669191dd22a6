//! Bounded per-symbol price history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::types::{HistorySnapshot, PriceData, PricePoint};

/// Read access to per-symbol history for the scan cycle.
pub trait PriceSource: Send + Sync {
    /// Column-wise copy of the symbol's history, oldest first.
    fn snapshot(&self, symbol: &str) -> Option<HistorySnapshot>;

    /// Whether the symbol has at least `min_periods` points.
    fn has_sufficient_history(&self, symbol: &str, min_periods: usize) -> bool;
}

/// Fixed-capacity FIFO of price points.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full.
    pub fn push(&mut self, point: PricePoint) {
        if self.capacity == 0 {
            return;
        }
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::from_points(self.points.iter())
    }

    /// Drop points recorded before `cutoff`. Returns how many were dropped.
    pub fn clear_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.points.len();
        self.points.retain(|p| p.timestamp >= cutoff);
        before - self.points.len()
    }
}

/// Price histories keyed by symbol.
pub struct HistoryStore {
    capacity: usize,
    histories: DashMap<String, PriceHistory>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            histories: DashMap::new(),
        }
    }

    /// Record a tick. Ticks with a non-positive or non-finite price are dropped.
    pub fn record(&self, tick: &PriceData) -> bool {
        if !tick.price.is_finite() || tick.price <= 0.0 {
            warn!("Ignoring invalid price {} for {}", tick.price, tick.symbol);
            return false;
        }

        self.histories
            .entry(tick.symbol.clone())
            .or_insert_with(|| PriceHistory::new(self.capacity))
            .push(tick.to_point());
        true
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.histories.get(symbol).map(|h| h.len()).unwrap_or(0)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.histories.iter().map(|e| e.key().clone()).collect()
    }

    pub fn latest(&self, symbol: &str) -> Option<PricePoint> {
        self.histories.get(symbol).and_then(|h| h.latest().copied())
    }

    /// Drop stale points from every symbol and forget empty histories.
    pub fn clear_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for mut entry in self.histories.iter_mut() {
            removed += entry.value_mut().clear_older_than(cutoff);
        }
        self.histories.retain(|_, h| !h.is_empty());
        if removed > 0 {
            debug!("Cleared {} stale price points", removed);
        }
        removed
    }
}

impl PriceSource for HistoryStore {
    fn snapshot(&self, symbol: &str) -> Option<HistorySnapshot> {
        self.histories.get(symbol).map(|h| h.snapshot())
    }

    fn has_sufficient_history(&self, symbol: &str, min_periods: usize) -> bool {
        self.len(symbol) >= min_periods
    }
}
