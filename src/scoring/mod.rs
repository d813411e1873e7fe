//! Composite quality scoring.
//!
//! `score_document` is pure with respect to the document's content and
//! metadata, the scoring context, and the configuration: identical inputs
//! yield bit-identical output. Wall-clock time never enters a scoring call;
//! the batch fixes one [`ScoringContext::reference_time`] up front.

pub mod features;
pub mod subscores;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::document::Document;
use crate::types::identifiers::AlgorithmVersion;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Corrupt content: {0}")]
    CorruptContent(String),
}

/// Four independent sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySubScores {
    pub content_depth: f32,
    pub source_authority: f32,
    pub relevance: f32,
    pub completeness: f32,
}

impl QualitySubScores {
    pub const ZERO: QualitySubScores = QualitySubScores {
        content_depth: 0.0,
        source_authority: 0.0,
        relevance: 0.0,
        completeness: 0.0,
    };
}

/// Data-quality markers. These degrade a score, they never fail a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFlags {
    pub empty_content: bool,
    pub short_content: bool,
    pub low_confidence_authority: bool,
}

/// A versioned composite quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub subscores: QualitySubScores,
    pub composite: f32,
    pub algorithm_version: AlgorithmVersion,
    pub computed_at: DateTime<Utc>,
    pub flags: ScoreFlags,
}

impl QualityScore {
    /// Floor score for empty or unparseable content.
    pub fn floor(version: AlgorithmVersion, computed_at: DateTime<Utc>) -> Self {
        QualityScore {
            subscores: QualitySubScores::ZERO,
            composite: 0.0,
            algorithm_version: version,
            computed_at,
            flags: ScoreFlags {
                empty_content: true,
                ..ScoreFlags::default()
            },
        }
    }

    pub fn is_stale(&self, current: AlgorithmVersion) -> bool {
        self.algorithm_version != current
    }
}

/// Per-batch inputs that keep scoring pure: a fixed reference instant and the
/// corpus median length for the proportional-length signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    pub reference_time: DateTime<Utc>,
    pub corpus_median_chars: usize,
}

/// Score a single document under the given configuration.
///
/// Empty content is a floor score, never an error; only corrupt content fails,
/// and that failure is meant to be caught per document inside a batch.
pub fn score_document(
    doc: &Document,
    ctx: &ScoringContext,
    config: &EngineConfig,
) -> Result<QualityScore, ScoreError> {
    if doc.content.trim().is_empty() {
        return Ok(QualityScore::floor(config.version, ctx.reference_time));
    }

    if let Some(reason) = features::corruption_reason(&doc.content) {
        return Err(ScoreError::CorruptContent(reason));
    }

    let feats = features::extract(&doc.content);

    let (content_depth, short_content) = subscores::content_depth(&feats, &config.scoring);
    let (source_authority, unknown_domain) = subscores::source_authority(
        &doc.domain,
        doc.provenance,
        &config.authority,
        &config.scoring,
    );
    let relevance = subscores::relevance(
        &doc.category,
        &feats,
        doc.collected_at,
        ctx.reference_time,
        &config.scoring,
    );
    let completeness = subscores::completeness(&feats, ctx.corpus_median_chars);

    let subscores = QualitySubScores {
        content_depth,
        source_authority,
        relevance,
        completeness,
    };

    Ok(QualityScore {
        subscores,
        composite: composite(&subscores, config),
        algorithm_version: config.version,
        computed_at: ctx.reference_time,
        flags: ScoreFlags {
            empty_content: false,
            short_content,
            low_confidence_authority: unknown_domain,
        },
    })
}

/// Fixed weighted sum of the four sub-scores, clamped to [0, 1].
pub fn composite(subscores: &QualitySubScores, config: &EngineConfig) -> f32 {
    let w = &config.weights;
    let value = subscores.content_depth * w.content_depth
        + subscores.source_authority * w.source_authority
        + subscores.relevance * w.relevance
        + subscores.completeness * w.completeness;
    let clamped = value.clamp(0.0, 1.0);
    debug_assert!((0.0..=1.0).contains(&clamped));
    clamped
}

/// Median character length across a corpus, used as the proportional-length
/// reference. Even-sized corpora take the mean of the two middle values.
pub fn corpus_median_chars<'a>(docs: impl IntoIterator<Item = &'a Document>) -> usize {
    let mut lens: Vec<usize> = docs.into_iter().map(Document::char_len).collect();
    if lens.is_empty() {
        return 0;
    }
    lens.sort_unstable();
    let mid = lens.len() / 2;
    if lens.len() % 2 == 1 {
        lens[mid]
    } else {
        (lens[mid - 1] + lens[mid]) / 2
    }
}
