//! Interference labelling policies.
//!
//! Three rules exist and are kept apart on purpose:
//!
//! - [`ThresholdPolicy`]: caller-configurable power threshold (default
//!   -10 dBm) used to filter monitored band readings.
//! - [`TrainingLabelPolicy`]: fixed 30 dBm rule that builds ground truth for
//!   model training.
//! - [`SpikeOverlapDetector`]: rule-based fallback that also flags adjacent
//!   readings with a large power jump.
//!
//! The first two look alike but use different thresholds and share no trait,
//! so one cannot be passed where the other is expected.

use crate::models::{Band, RawReading, Reading};

/// Monitoring rule: `power > threshold_dbm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub threshold_dbm: f64,
}

impl ThresholdPolicy {
    pub const DEFAULT_THRESHOLD_DBM: f64 = -10.0;

    pub fn new(threshold_dbm: f64) -> Self {
        Self { threshold_dbm }
    }

    pub fn is_interference(&self, power_dbm: f64) -> bool {
        power_dbm > self.threshold_dbm
    }

    /// A reading without power is never interfering.
    pub fn classify(&self, reading: &Reading) -> bool {
        reading.power.is_some_and(|p| self.is_interference(p))
    }

    /// Readings above the threshold. Order is preserved.
    pub fn detect(&self, readings: &[Reading]) -> Vec<Reading> {
        readings
            .iter()
            .filter(|r| self.classify(r))
            .cloned()
            .collect()
    }

    /// Copy of `readings` with the interference column set by this rule.
    pub fn label(&self, readings: &[Reading]) -> Vec<Reading> {
        readings
            .iter()
            .map(|r| r.with_interference(self.classify(r)))
            .collect()
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD_DBM)
    }
}

/// Ground-truth rule for training sets: `power > 30 dBm`. Not configurable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingLabelPolicy;

impl TrainingLabelPolicy {
    pub const THRESHOLD_DBM: f64 = 30.0;

    pub fn is_interference(&self, power_dbm: f64) -> bool {
        power_dbm > Self::THRESHOLD_DBM
    }

    /// Training label for one reading; missing power labels it negative.
    pub fn label(&self, reading: &Reading) -> bool {
        reading.power.is_some_and(|p| self.is_interference(p))
    }
}

/// Readings whose frequency lies inside `band`. Order is preserved.
pub fn filter_band(readings: &[Reading], band: Band) -> Vec<Reading> {
    readings
        .iter()
        .filter(|r| r.frequency.is_some_and(|f| band.contains(f)))
        .cloned()
        .collect()
}

/// Rule-based detector over a frequency-ordered sweep.
///
/// A reading is flagged when its power exceeds `power_threshold_dbm`, or
/// when the next reading sits within `proximity_mhz` of it and their powers
/// differ by more than [`Self::POWER_JUMP_DB`]. The last reading has no
/// successor and is never flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeOverlapDetector {
    pub power_threshold_dbm: f64,
    pub proximity_mhz: f64,
}

impl SpikeOverlapDetector {
    pub const POWER_JUMP_DB: f64 = 10.0;

    pub fn detect(&self, sweep: &[RawReading]) -> Vec<RawReading> {
        sweep
            .windows(2)
            .filter(|pair| self.flags(&pair[0], &pair[1]))
            .map(|pair| pair[0].clone())
            .collect()
    }

    fn flags(&self, a: &RawReading, b: &RawReading) -> bool {
        let Some(pa) = a.power else {
            return false;
        };
        if pa > self.power_threshold_dbm {
            return true;
        }
        match (a.frequency, b.frequency, b.power) {
            (Some(fa), Some(fb), Some(pb)) => {
                (fa - fb).abs() < self.proximity_mhz && (pa - pb).abs() > Self::POWER_JUMP_DB
            }
            _ => false,
        }
    }
}

impl Default for SpikeOverlapDetector {
    fn default() -> Self {
        Self {
            power_threshold_dbm: 30.0,
            proximity_mhz: 1.0,
        }
    }
}
