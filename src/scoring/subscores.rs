//! The four quality sub-scores, each a value in [0, 1].
//!
//! Inner feature mixes are implementation detail; the 25/30/25/20 composite
//! weighting lives in [`crate::config::ScoringWeights`] and is independent of
//! the choices made here.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::config::{AuthorityTable, ScoringParams};
use crate::document::Provenance;
use crate::scoring::features::TextFeatures;

/// Neutral value used when a vocabulary or table gives no signal either way.
const NEUTRAL: f32 = 0.5;

/// Evidence points that saturate the evidence component.
const EVIDENCE_SATURATION: f32 = 12.0;

/// Occurrence ratio of domain-vocabulary terms that saturates term density.
const DENSITY_SATURATION: f32 = 0.05;

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Vocabulary diversity, technical-term density, and evidence markers.
/// Returns the depth score and whether the short-content penalty applied.
pub fn content_depth(features: &TextFeatures, params: &ScoringParams) -> (f32, bool) {
    if features.total_words == 0 {
        return (0.0, true);
    }

    let diversity = features.distinct_words as f32 / features.total_words as f32;

    let density = if params.domain_vocabulary.is_empty() {
        NEUTRAL
    } else {
        let vocab: BTreeSet<String> = params
            .domain_vocabulary
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        let occurrences = features.words.iter().filter(|w| vocab.contains(*w)).count();
        let ratio = occurrences as f32 / features.total_words as f32;
        (ratio / DENSITY_SATURATION).min(1.0)
    };

    let evidence_points = features.digit_tokens
        + 2 * features.example_markers
        + features.list_lines
        + features.link_count;
    let evidence = (evidence_points as f32 / EVIDENCE_SATURATION).min(1.0);

    let mut depth = (diversity + density + evidence) / 3.0;

    // Depth penalty proportional to the shortfall below the minimum length.
    let short = features.total_words < params.min_content_words;
    if short && params.min_content_words > 0 {
        depth *= features.total_words as f32 / params.min_content_words as f32;
    }

    debug_assert!((0.0..=1.0).contains(&depth));
    (depth, short)
}

/// Domain-reputation lookup plus the curated-source boost.
/// Returns the authority score and whether the domain was unknown.
pub fn source_authority(
    domain: &str,
    provenance: Provenance,
    table: &AuthorityTable,
    params: &ScoringParams,
) -> (f32, bool) {
    let (base, known) = table.lookup(domain);
    let boosted = match provenance {
        Provenance::Curated => (base + params.curated_boost).min(1.0),
        Provenance::Collected => base,
    };
    debug_assert!((0.0..=1.0).contains(&boosted));
    (boosted, !known)
}

/// Category alignment, subject-keyword overlap, and recency decay.
pub fn relevance(
    category: &str,
    features: &TextFeatures,
    collected_at: DateTime<Utc>,
    reference_time: DateTime<Utc>,
    params: &ScoringParams,
) -> f32 {
    let alignment = if params.target_categories.is_empty() {
        NEUTRAL
    } else if params
        .target_categories
        .iter()
        .any(|c| c.eq_ignore_ascii_case(category))
    {
        1.0
    } else {
        0.4
    };

    let overlap = if params.subject_vocabulary.is_empty() {
        NEUTRAL
    } else {
        let present: BTreeSet<&String> = features.words.iter().collect();
        let matched = params
            .subject_vocabulary
            .iter()
            .filter(|t| present.contains(&t.to_lowercase()))
            .count();
        matched as f32 / params.subject_vocabulary.len() as f32
    };

    let recency = recency_decay(collected_at, reference_time, params);

    let score = 0.4 * alignment + 0.3 * overlap + 0.3 * recency;
    debug_assert!((0.0..=1.0).contains(&score));
    score
}

/// Half-life decay toward a configured floor. Never reaches zero.
fn recency_decay(
    collected_at: DateTime<Utc>,
    reference_time: DateTime<Utc>,
    params: &ScoringParams,
) -> f32 {
    let age_seconds = (reference_time - collected_at).num_seconds().max(0) as f32;
    let age_days = age_seconds / SECONDS_PER_DAY;
    let half_lives = age_days / params.recency_half_life_days;
    params.recency_floor + (1.0 - params.recency_floor) * 0.5f32.powf(half_lives)
}

/// Structural completeness: intro/conclusion shape, sections, references, and
/// length proportional to the corpus median.
pub fn completeness(features: &TextFeatures, corpus_median_chars: usize) -> f32 {
    if features.total_words == 0 {
        return 0.0;
    }

    // Intro, body, conclusion need at least three paragraphs.
    let structure = (features.paragraph_count as f32 / 3.0).min(1.0);
    let sections = (features.heading_lines as f32 / 4.0).min(1.0);
    let references = (features.link_count as f32 / 5.0).min(1.0);
    let length = if corpus_median_chars == 0 {
        NEUTRAL
    } else {
        (features.char_len as f32 / corpus_median_chars as f32).min(1.0)
    };

    let score = 0.3 * structure + 0.25 * sections + 0.2 * references + 0.25 * length;
    debug_assert!((0.0..=1.0).contains(&score));
    score
}
