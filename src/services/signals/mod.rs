//! Trading signals service module.
//!
//! Provides technical indicator calculations, multi-factor confidence
//! scoring and the policy layer that turns a score into a trade proposal.

pub mod cooldown;
pub mod generator;
pub mod indicators;
pub mod scorer;

pub use cooldown::CooldownTracker;
pub use generator::{SignalGenerator, SignalOutcome};
pub use indicators::IndicatorEngine;
pub use scorer::{calibrate_confidence, ConfidenceScorer, Evaluation, Evidence};

use crate::types::HistorySnapshot;

/// Trait for implementing technical indicators.
pub trait Indicator: Send + Sync {
    /// Value produced by a successful calculation.
    type Output;

    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Minimum number of history points required for calculation.
    fn min_periods(&self) -> usize;

    /// Calculate the indicator from a history snapshot.
    /// Returns None if there is insufficient data.
    fn calculate(&self, history: &HistorySnapshot) -> Option<Self::Output>;
}

/// Round to two decimal places, as reported to users.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
