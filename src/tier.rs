//! Quality tiers: an ordered partition of the composite score range.
//!
//! Tier assignment is a pure threshold function. Thresholds are configuration,
//! not constants, so recalibration never needs a code change; the partition is
//! validated once at configuration load.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered quality buckets. `Poor < Fair < Good < Excellent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Poor, Tier::Fair, Tier::Good, Tier::Excellent];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Poor => "Poor",
            Tier::Fair => "Fair",
            Tier::Good => "Good",
            Tier::Excellent => "Excellent",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum TierConfigError {
    #[error("Tier thresholds must be strictly increasing: fair={fair}, good={good}, excellent={excellent}")]
    NotIncreasing { fair: f32, good: f32, excellent: f32 },
    #[error("Tier threshold {0} is outside (0, 1]")]
    OutOfRange(f32),
}

/// Lower bounds of the Fair, Good, and Excellent tiers. Everything below
/// `fair` is Poor, so the four tiers partition [0, 1] with no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub fair: f32,
    pub good: f32,
    pub excellent: f32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            fair: 0.4,
            good: 0.6,
            excellent: 0.8,
        }
    }
}

impl TierThresholds {
    /// Must be called before any scoring runs. Invalid thresholds are fatal.
    pub fn validate(&self) -> Result<(), TierConfigError> {
        for t in [self.fair, self.good, self.excellent] {
            if !(t > 0.0 && t <= 1.0) || !t.is_finite() {
                return Err(TierConfigError::OutOfRange(t));
            }
        }
        if !(self.fair < self.good && self.good < self.excellent) {
            return Err(TierConfigError::NotIncreasing {
                fair: self.fair,
                good: self.good,
                excellent: self.excellent,
            });
        }
        Ok(())
    }

    /// Pure, monotonic threshold lookup.
    pub fn assign(&self, composite: f32) -> Tier {
        debug_assert!(
            (0.0..=1.0).contains(&composite),
            "composite {composite} out of range [0.0, 1.0]"
        );
        if composite >= self.excellent {
            Tier::Excellent
        } else if composite >= self.good {
            Tier::Good
        } else if composite >= self.fair {
            Tier::Fair
        } else {
            Tier::Poor
        }
    }
}

/// Aggregate tier counts for corpus-health monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub poor: usize,
    pub fair: usize,
    pub good: usize,
    pub excellent: usize,
}

impl TierCounts {
    pub fn increment(&mut self, tier: Tier) {
        match tier {
            Tier::Poor => self.poor += 1,
            Tier::Fair => self.fair += 1,
            Tier::Good => self.good += 1,
            Tier::Excellent => self.excellent += 1,
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Poor => self.poor,
            Tier::Fair => self.fair,
            Tier::Good => self.good,
            Tier::Excellent => self.excellent,
        }
    }

    pub fn total(&self) -> usize {
        self.poor + self.fair + self.good + self.excellent
    }

    /// Per-tier deltas against an earlier count, e.g. to detect corpus-wide
    /// quality drift after a rerank.
    pub fn drift(&self, before: &TierCounts) -> [(Tier, i64); 4] {
        Tier::ALL.map(|t| (t, self.get(t) as i64 - before.get(t) as i64))
    }
}
