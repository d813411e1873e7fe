use chrono::{TimeZone, Utc};
use quality_core::document::Provenance;
use quality_core::scoring::{QualityScore, QualitySubScores, ScoreFlags};
use quality_core::selection::SelectionPlanner;
use quality_core::store::{ScoreRecord, ScoreStore};
use quality_core::tier::TierThresholds;
use quality_core::types::identifiers::{AlgorithmVersion, DocumentId};
use quality_core::types::selection_set::{CategoryBalance, SelectionRequest};
use serde_json::json;

/// Record with exactly representable floats so the golden values are stable.
fn make_record(id: &str, category: &str, composite: f32, tokens: usize, day: u32) -> ScoreRecord {
    ScoreRecord {
        id: DocumentId::new(id).unwrap(),
        category: category.to_string(),
        domain: "example.org".to_string(),
        provenance: Provenance::Collected,
        collected_at: Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
        tokens,
        char_len: tokens * 4,
        keywords: Vec::new(),
        score: QualityScore {
            subscores: QualitySubScores {
                content_depth: composite,
                source_authority: 0.5,
                relevance: composite,
                completeness: composite,
            },
            composite,
            algorithm_version: AlgorithmVersion::new(1),
            computed_at: Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap(),
            flags: ScoreFlags::default(),
        },
        tier: TierThresholds::default().assign(composite),
    }
}

#[test]
fn golden_selection_set_serialization() {
    let store = ScoreStore::new();
    store.upsert(make_record("energy-01", "energy", 0.75, 12, 10));
    store.upsert(make_record("climate-01", "climate", 0.5, 8, 12));

    let snapshot = store.snapshot();
    let planner = SelectionPlanner::default();
    let request = SelectionRequest {
        target_count: 2,
        budget_tokens: 100,
        balance: CategoryBalance::Equal,
        query: None,
    };
    let result = planner.plan(&snapshot, &request);

    let json_str = serde_json::to_string_pretty(&result).unwrap();

    // Key order is part of the contract.
    let entries_pos = json_str.find("\"entries\":").unwrap();
    let tokens_pos = json_str.find("\"tokens_used\":").unwrap();
    let per_category_pos = json_str.find("\"per_category\":").unwrap();
    let flags_pos = json_str.find("\"flags\":").unwrap();
    let fingerprint_pos = json_str.find("\"snapshot_fingerprint\":").unwrap();
    assert!(entries_pos < tokens_pos);
    assert!(tokens_pos < per_category_pos);
    assert!(per_category_pos < flags_pos);
    assert!(flags_pos < fingerprint_pos);

    // Value snapshot. The fingerprint is content-derived, so it is read from
    // the snapshot rather than written out by hand.
    let expected = json!({
        "entries": [
            {
                "id": "energy-01",
                "category": "energy",
                "tier": "Good",
                "composite": 0.75,
                "ranking_key": 0.75,
                "tokens": 12
            },
            {
                "id": "climate-01",
                "category": "climate",
                "tier": "Fair",
                "composite": 0.5,
                "ranking_key": 0.5,
                "tokens": 8
            }
        ],
        "tokens_used": 20,
        "budget_tokens": 100,
        "per_category": { "climate": 1, "energy": 1 },
        "flags": { "degraded_balance": false, "budget_exhausted": false },
        "candidates_considered": 2,
        "excluded_by_budget": 0,
        "snapshot_fingerprint": snapshot.fingerprint()
    });

    let actual: serde_json::Value = serde_json::from_str(&json_str).unwrap();
    assert_eq!(actual, expected, "golden snapshot mismatch");

    // Roundtrip check
    let deserialized: quality_core::types::selection_set::SelectionSet =
        serde_json::from_str(&json_str).unwrap();
    assert_eq!(deserialized.entries.len(), 2);
    assert_eq!(deserialized.tokens_used, 20);
    assert_eq!(deserialized.entries[0].id.as_str(), "energy-01");
}

#[test]
fn golden_rerank_job_serialization_shape() {
    // The job record is part of the exposed surface; its fields must keep
    // their names for pollers.
    let store = ScoreStore::new();
    let scheduler = quality_core::rerank::RerankScheduler::new(
        std::sync::Arc::new(quality_core::config::EngineConfig::v1()),
        std::sync::Arc::new(store),
    );
    let job = scheduler
        .run(
            &[],
            &quality_core::rerank::RerankFilter::default(),
            false,
            &quality_core::rerank::CancelFlag::new(),
        )
        .unwrap();

    let value = serde_json::to_value(&job).unwrap();
    for key in [
        "id",
        "status",
        "target_version",
        "total",
        "succeeded",
        "failed",
        "skipped",
        "cancelled_remaining",
        "failures",
        "started_at",
        "finished_at",
    ] {
        assert!(value.get(key).is_some(), "missing job field {key}");
    }
    assert_eq!(value["status"], json!("Completed"));
    assert_eq!(value["total"], json!(0));
}
