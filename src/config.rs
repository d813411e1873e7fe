//! Engine configuration: scoring weights, tier thresholds, scoring parameters,
//! and the domain-authority table.
//!
//! A configuration value is immutable once constructed and is validated before
//! any scoring runs. A recalibration produces a new value with a bumped
//! [`AlgorithmVersion`]; prior scores then read as stale and a rerank brings
//! the corpus back to current.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tier::{TierConfigError, TierThresholds};
use crate::types::identifiers::AlgorithmVersion;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Scoring weights must sum to 1.0, got {0}")]
    WeightsDoNotSumToOne(f32),
    #[error("Scoring weight {0} is negative or not finite")]
    InvalidWeight(f32),
    #[error(transparent)]
    Tier(#[from] TierConfigError),
    #[error("Recency half-life must be positive, got {0}")]
    InvalidHalfLife(f32),
    #[error("Recency floor must be in [0, 1), got {0}")]
    InvalidRecencyFloor(f32),
    #[error("Curated boost must be in [0, 1], got {0}")]
    InvalidCuratedBoost(f32),
    #[error("Worker pool size must be at least 1")]
    ZeroWorkers,
}

/// Weights of the four sub-scores in the composite. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub content_depth: f32,
    pub source_authority: f32,
    pub relevance: f32,
    pub completeness: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            content_depth: 0.25,
            source_authority: 0.30,
            relevance: 0.25,
            completeness: 0.20,
        }
    }
}

impl ScoringWeights {
    const SUM_TOLERANCE: f32 = 1e-4;

    pub fn validate(&self) -> Result<(), ConfigError> {
        for w in [
            self.content_depth,
            self.source_authority,
            self.relevance,
            self.completeness,
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::InvalidWeight(w));
            }
        }
        let sum = self.content_depth + self.source_authority + self.relevance + self.completeness;
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne(sum));
        }
        Ok(())
    }
}

/// Tiered authority levels for the domain-reputation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorityLevel {
    High,
    Medium,
    Low,
}

/// Domain-reputation table. Unknown domains get `unknown_default` and a
/// low-confidence flag rather than a zero score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityTable {
    pub domains: BTreeMap<String, AuthorityLevel>,
    pub high: f32,
    pub medium: f32,
    pub low: f32,
    pub unknown_default: f32,
}

impl Default for AuthorityTable {
    fn default() -> Self {
        Self {
            domains: BTreeMap::new(),
            high: 0.9,
            medium: 0.7,
            low: 0.4,
            unknown_default: 0.5,
        }
    }
}

impl AuthorityTable {
    pub fn with_domain(mut self, domain: impl Into<String>, level: AuthorityLevel) -> Self {
        let domain: String = domain.into();
        self.domains.insert(domain.to_lowercase(), level);
        self
    }

    /// Returns (authority value, known). Lookup is case-insensitive.
    pub fn lookup(&self, domain: &str) -> (f32, bool) {
        match self.domains.get(&domain.to_lowercase()) {
            Some(AuthorityLevel::High) => (self.high, true),
            Some(AuthorityLevel::Medium) => (self.medium, true),
            Some(AuthorityLevel::Low) => (self.low, true),
            None => (self.unknown_default, false),
        }
    }
}

/// Feature-extraction parameters for the four sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Documents below this word count get a depth penalty proportional to the
    /// shortfall.
    pub min_content_words: usize,
    pub recency_half_life_days: f32,
    /// Old documents decay toward this floor, never to zero.
    pub recency_floor: f32,
    /// Authority bonus for manually curated sources.
    pub curated_boost: f32,
    /// Technical terms of the platform's domain, for depth density.
    pub domain_vocabulary: Vec<String>,
    /// Subject keywords of the platform, for relevance overlap.
    pub subject_vocabulary: Vec<String>,
    /// Impact-category labels aligned with the target domain.
    pub target_categories: Vec<String>,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            min_content_words: 120,
            recency_half_life_days: 180.0,
            recency_floor: 0.2,
            curated_boost: 0.1,
            domain_vocabulary: Vec::new(),
            subject_vocabulary: Vec::new(),
            target_categories: Vec::new(),
        }
    }
}

impl ScoringParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.recency_half_life_days > 0.0) || !self.recency_half_life_days.is_finite() {
            return Err(ConfigError::InvalidHalfLife(self.recency_half_life_days));
        }
        if !(0.0..1.0).contains(&self.recency_floor) {
            return Err(ConfigError::InvalidRecencyFloor(self.recency_floor));
        }
        if !(0.0..=1.0).contains(&self.curated_boost) {
            return Err(ConfigError::InvalidCuratedBoost(self.curated_boost));
        }
        Ok(())
    }
}

/// The full, versioned engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: AlgorithmVersion,
    pub weights: ScoringWeights,
    pub tiers: TierThresholds,
    pub scoring: ScoringParams,
    pub authority: AuthorityTable,
    pub worker_threads: usize,
    /// Persist the score store every N completed documents during a rerank
    /// when a checkpoint directory is configured.
    pub checkpoint_interval: usize,
}

impl EngineConfig {
    pub fn v1() -> Self {
        Self {
            version: AlgorithmVersion::new(1),
            weights: ScoringWeights::default(),
            tiers: TierThresholds::default(),
            scoring: ScoringParams::default(),
            authority: AuthorityTable::default(),
            worker_threads: 4,
            checkpoint_interval: 64,
        }
    }

    /// A recalibration is a new value, never an in-place mutation.
    pub fn with_version(mut self, version: AlgorithmVersion) -> Self {
        self.version = version;
        self
    }

    /// Fatal on any malformed section; must pass before any processing begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.tiers.validate()?;
        self.scoring.validate()?;
        if self.worker_threads == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}
