//! Volume surge and volume trend.

use super::ema::sma;
use crate::services::signals::Indicator;
use crate::types::{HistorySnapshot, VolumeResult, VolumeTrend};

const MIN_VOLUMES: usize = 5;
const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 20;

/// Volume surge detector.
///
/// The volume history ends with the current bar. The surge multiplier
/// compares the current volume with the mean of every earlier entry.
pub struct VolumeSurge {
    surge_multiplier: f64,
}

impl Default for VolumeSurge {
    fn default() -> Self {
        Self {
            surge_multiplier: 2.0,
        }
    }
}

impl VolumeSurge {
    pub fn new(surge_multiplier: f64) -> Self {
        Self { surge_multiplier }
    }

    fn trend(volumes: &[f64]) -> VolumeTrend {
        let window = LONG_WINDOW.min(volumes.len());
        let (Some(short), Some(long)) = (sma(volumes, SHORT_WINDOW), sma(volumes, window)) else {
            return VolumeTrend::Neutral;
        };
        if long <= 0.0 {
            return VolumeTrend::Neutral;
        }

        let ratio = short / long;
        if ratio > 1.1 {
            VolumeTrend::Increasing
        } else if ratio < 0.9 {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Neutral
        }
    }
}

impl Indicator for VolumeSurge {
    type Output = VolumeResult;

    fn id(&self) -> &str {
        "volume"
    }

    fn min_periods(&self) -> usize {
        MIN_VOLUMES
    }

    fn calculate(&self, history: &HistorySnapshot) -> Option<VolumeResult> {
        let volumes = &history.volumes;
        let current = history.current_volume()?;

        if volumes.len() < MIN_VOLUMES {
            return Some(VolumeResult {
                average: current,
                ..VolumeResult::default()
            });
        }

        let prior = &volumes[..volumes.len() - 1];
        let average = prior.iter().sum::<f64>() / prior.len() as f64;
        if average <= 0.0 {
            return Some(VolumeResult::default());
        }

        let multiplier = current / average;
        let long = sma(volumes, LONG_WINDOW.min(volumes.len())).unwrap_or(average);
        let relative_volume = if long > 0.0 { current / long } else { 1.0 };

        Some(VolumeResult {
            is_surge: multiplier >= self.surge_multiplier,
            multiplier,
            average,
            relative_volume,
            trend: Self::trend(volumes),
        })
    }
}
