use std::sync::Arc;

use chrono::{TimeZone, Utc};
use quality_core::config::EngineConfig;
use quality_core::document::{Document, DocumentId, Metadata, Provenance};
use quality_core::rerank::{CancelFlag, JobStatus, RerankError, RerankFilter, RerankScheduler};
use quality_core::store::ScoreStore;
use quality_core::types::identifiers::AlgorithmVersion;
use tempfile::tempdir;

fn make_doc(id: &str, category: &str, content: &str) -> Document {
    Document::ingest(
        DocumentId::new(id).unwrap(),
        format!("https://example.org/{id}"),
        "example.org".to_string(),
        category.to_string(),
        Provenance::Collected,
        Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(),
        content.as_bytes().to_vec(),
        Metadata::default(),
    )
    .unwrap()
}

fn corpus(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            make_doc(
                &format!("doc-{i:02}"),
                if i % 2 == 0 { "energy" } else { "climate" },
                &format!(
                    "Report {i} covers grid output, emissions data, and policy changes.\n\
                     \n\
                     For example, output rose {i}% in the last quarter across the region.",
                ),
            )
        })
        .collect()
}

fn scheduler_with(
    config: EngineConfig,
    store: &Arc<ScoreStore>,
) -> RerankScheduler {
    RerankScheduler::new(Arc::new(config), Arc::clone(store))
}

#[test]
fn run_scores_every_document_once() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = corpus(6);

    let job = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total, 6);
    assert_eq!(job.succeeded, 6);
    assert_eq!(job.failed, 0);
    assert_eq!(job.skipped, 0);
    assert!(job.finished_at.is_some());
    assert_eq!(store.len(), 6);

    for doc in &docs {
        let record = store.get(&doc.id).expect("every document must be scored");
        assert_eq!(record.score.algorithm_version, AlgorithmVersion::new(1));
        assert!((0.0..=1.0).contains(&record.score.composite));
    }
}

#[test]
fn rerank_is_idempotent_per_document() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = corpus(5);

    let first = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    assert_eq!(first.succeeded, 5);

    // Immediately re-running processes zero documents.
    let second = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 5);
    assert_eq!(second.total, 5);
}

#[test]
fn version_bump_marks_scores_stale_until_reranked() {
    let store = Arc::new(ScoreStore::new());
    let docs = corpus(4);

    let v1 = scheduler_with(EngineConfig::v1(), &store);
    v1.run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();

    let v2_version = AlgorithmVersion::new(2);
    assert_eq!(store.stale_count(v2_version), 4);

    let v2 = scheduler_with(EngineConfig::v1().with_version(v2_version), &store);
    let job = v2
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    assert_eq!(job.succeeded, 4);
    assert_eq!(store.stale_count(v2_version), 0);
    for doc in &docs {
        assert_eq!(
            store.get(&doc.id).unwrap().score.algorithm_version,
            v2_version
        );
    }

    // And the new version is idempotent in turn.
    let again = v2
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    assert_eq!(again.succeeded, 0);
    assert_eq!(again.skipped, 4);
}

#[test]
fn corrupt_document_is_recorded_without_aborting_the_batch() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);

    let mut docs = corpus(5);
    docs.push(make_doc("doc-corrupt", "energy", "garbled\u{0}bytes"));

    let job = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();

    assert_eq!(job.status, JobStatus::CompletedWithErrors);
    assert_eq!(job.succeeded, 5);
    assert_eq!(job.failed, 1);
    assert_eq!(job.failures.len(), 1);
    assert_eq!(job.failures[0].id.as_str(), "doc-corrupt");
    assert!(store.get(&docs[5].id).is_none());
    assert_eq!(store.len(), 5);
}

#[test]
fn empty_document_floors_instead_of_failing() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = vec![make_doc("doc-empty", "energy", "")];

    let job = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.succeeded, 1);
    let record = store.get(&docs[0].id).unwrap();
    assert_eq!(record.score.composite, 0.0);
    assert!(record.score.flags.empty_content);
    assert_eq!(record.tier, quality_core::tier::Tier::Poor);
}

#[test]
fn category_filter_and_limit_scope_the_batch() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = corpus(8); // 4 energy, 4 climate

    let filter = RerankFilter {
        category: Some("energy".to_string()),
        limit: None,
    };
    let job = scheduler
        .run(&docs, &filter, false, &CancelFlag::new())
        .unwrap();
    assert_eq!(job.succeeded, 4);
    assert_eq!(store.len(), 4);
    for doc in &docs {
        assert_eq!(store.get(&doc.id).is_some(), doc.category == "energy");
    }

    let limited = RerankFilter {
        category: Some("climate".to_string()),
        limit: Some(2),
    };
    let job = scheduler
        .run(&docs, &limited, false, &CancelFlag::new())
        .unwrap();
    assert_eq!(job.succeeded, 2);
    assert_eq!(job.total, 2);
    assert_eq!(store.len(), 6);
}

#[test]
fn force_rescoring_ignores_the_idempotence_skip() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = corpus(3);

    scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    let forced = scheduler
        .run(&docs, &RerankFilter::default(), true, &CancelFlag::new())
        .unwrap();
    assert_eq!(forced.succeeded, 3);
    assert_eq!(forced.skipped, 0);
}

#[test]
fn cancelled_run_leaves_documents_at_their_pre_job_state() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = corpus(6);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let job = scheduler
        .run(&docs, &RerankFilter::default(), false, &cancel)
        .unwrap();

    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.succeeded, 0);
    assert_eq!(job.cancelled_remaining, 6);
    assert!(store.is_empty());
}

#[test]
fn concurrent_runs_are_rejected_not_coalesced() {
    let store = Arc::new(ScoreStore::new());
    let scheduler = scheduler_with(EngineConfig::v1(), &store);
    let docs = corpus(2);

    let permit = scheduler.begin().unwrap();
    let result = scheduler.run(&docs, &RerankFilter::default(), false, &CancelFlag::new());
    assert!(matches!(result, Err(RerankError::AlreadyRunning)));

    drop(permit);
    let job = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    assert_eq!(job.succeeded, 2);
}

#[test]
fn checkpointed_run_resumes_after_restart() {
    let dir = tempdir().unwrap();
    let checkpoint = dir.path().join("scores");
    let docs = corpus(5);

    {
        let store = Arc::new(ScoreStore::new());
        let scheduler = scheduler_with(EngineConfig::v1(), &store)
            .with_checkpoint_dir(checkpoint.clone());
        let job = scheduler
            .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
            .unwrap();
        assert_eq!(job.succeeded, 5);
        assert!(ScoreStore::checkpoint_exists(&checkpoint));
    }

    // A fresh process restores the store and the idempotence check makes the
    // re-invocation a no-op.
    let restored = Arc::new(ScoreStore::load(&checkpoint).unwrap());
    assert_eq!(restored.len(), 5);

    let scheduler =
        scheduler_with(EngineConfig::v1(), &restored).with_checkpoint_dir(checkpoint.clone());
    let job = scheduler
        .run(&docs, &RerankFilter::default(), false, &CancelFlag::new())
        .unwrap();
    assert_eq!(job.succeeded, 0);
    assert_eq!(job.skipped, 5);
}
