//! Batch (re)scoring across the corpus.
//!
//! A job fans scoring out over a bounded worker pool and streams completions
//! back to the scheduler, which applies per-record atomic replaces to the
//! store. Already-current documents are skipped (idempotence), per-document
//! failures are recorded without aborting the batch, and cancellation is
//! checked between documents so a stopped run never leaves a half-scored
//! document behind.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::document::Document;
use crate::scoring::{self, ScoreError, ScoringContext};
use crate::store::{ScoreRecord, ScoreStore};
use crate::types::identifiers::{AlgorithmVersion, DocumentId, JobId};

#[derive(Debug, Error)]
pub enum RerankError {
    #[error("A rerank job is already running on this scheduler")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub id: DocumentId,
    pub reason: String,
}

/// A batch-processing record. Created by the scheduler, mutated only by it,
/// terminal once completed, completed-with-errors, or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankJob {
    pub id: JobId,
    pub status: JobStatus,
    pub target_version: AlgorithmVersion,
    /// Documents matched by the filter, including idempotent skips.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Already current at the target version; not reprocessed.
    pub skipped: usize,
    /// Left at their pre-job state by a cancellation.
    pub cancelled_remaining: usize,
    pub failures: Vec<JobFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RerankJob {
    pub(crate) fn pending(id: JobId, target_version: AlgorithmVersion) -> Self {
        RerankJob {
            id,
            status: JobStatus::Pending,
            target_version,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            cancelled_remaining: 0,
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RerankFilter {
    pub category: Option<String>,
    /// Cap on the number of documents to (re)score, applied after skips.
    pub limit: Option<usize>,
}

/// Cooperative cancellation, checked between documents.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exclusive right to run one job; released on drop.
pub struct RunPermit {
    active: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

enum Outcome {
    Scored(Box<ScoreRecord>),
    Failed(DocumentId, String),
    Cancelled,
}

pub struct RerankScheduler {
    config: Arc<EngineConfig>,
    store: Arc<ScoreStore>,
    active: Arc<AtomicBool>,
    next_job: AtomicU64,
    checkpoint_dir: Option<PathBuf>,
}

impl RerankScheduler {
    pub fn new(config: Arc<EngineConfig>, store: Arc<ScoreStore>) -> Self {
        RerankScheduler {
            config,
            store,
            active: Arc::new(AtomicBool::new(false)),
            next_job: AtomicU64::new(0),
            checkpoint_dir: None,
        }
    }

    /// Persist the store under `dir` as the job progresses, so an interrupted
    /// run resumes from its last checkpoint.
    pub fn with_checkpoint_dir(mut self, dir: PathBuf) -> Self {
        self.checkpoint_dir = Some(dir);
        self
    }

    /// Single-flight admission: one active job per scheduler. Concurrent
    /// invocations are rejected, not coalesced.
    pub fn begin(&self) -> Result<RunPermit, RerankError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RerankError::AlreadyRunning);
        }
        Ok(RunPermit {
            active: Arc::clone(&self.active),
        })
    }

    pub(crate) fn reserve_id(&self) -> JobId {
        JobId::new(self.next_job.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn run(
        &self,
        corpus: &[Document],
        filter: &RerankFilter,
        force: bool,
        cancel: &CancelFlag,
    ) -> Result<RerankJob, RerankError> {
        let permit = self.begin()?;
        let id = self.reserve_id();
        Ok(self.execute(permit, id, corpus, filter, force, cancel))
    }

    pub(crate) fn execute(
        &self,
        _permit: RunPermit,
        id: JobId,
        corpus: &[Document],
        filter: &RerankFilter,
        force: bool,
        cancel: &CancelFlag,
    ) -> RerankJob {
        let started_at = Utc::now();
        let target = self.config.version;

        // Filter, then drop already-current documents unless forced.
        let mut skipped = 0usize;
        let mut worklist: Vec<&Document> = Vec::new();
        for doc in corpus {
            if let Some(category) = &filter.category {
                if &doc.category != category {
                    continue;
                }
            }
            if !force && self.store.current_version(&doc.id) == Some(target) {
                tracing::debug!(document = %doc.id, version = %target, "already current, skipping");
                skipped += 1;
                continue;
            }
            worklist.push(doc);
        }
        if let Some(limit) = filter.limit {
            worklist.truncate(limit);
        }
        let total = worklist.len() + skipped;

        // One reference instant and one median for the whole batch keeps every
        // score in the job mutually comparable and the batch re-runnable.
        let ctx = ScoringContext {
            reference_time: started_at,
            corpus_median_chars: scoring::corpus_median_chars(corpus),
        };

        tracing::info!(
            job = %id,
            version = %target,
            total,
            skipped,
            workers = self.config.worker_threads,
            "rerank started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build();

        let (tx, rx) = crossbeam_channel::unbounded::<Outcome>();

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut cancelled_remaining = 0usize;
        let mut failures: Vec<JobFailure> = Vec::new();
        let mut since_checkpoint = 0usize;

        std::thread::scope(|s| {
            let config = self.config.as_ref();
            let cancel_worker = cancel.clone();
            let worklist = &worklist;
            let ctx = &ctx;
            s.spawn(move || match pool {
                Ok(pool) => pool.install(|| {
                    worklist.par_iter().for_each_with(tx, |tx, doc| {
                        let _ = tx.send(score_outcome(doc, &cancel_worker, ctx, config));
                    });
                }),
                Err(err) => {
                    tracing::warn!(%err, "worker pool unavailable, scoring serially");
                    for doc in worklist.iter().copied() {
                        let _ = tx.send(score_outcome(doc, &cancel_worker, ctx, config));
                    }
                }
            });

            // Apply completions as they stream in: one whole-record replace
            // per document, checkpointing along the way.
            for outcome in rx.iter() {
                match outcome {
                    Outcome::Scored(record) => {
                        self.store.upsert(*record);
                        succeeded += 1;
                        since_checkpoint += 1;
                        if let Some(dir) = &self.checkpoint_dir {
                            if since_checkpoint >= self.config.checkpoint_interval {
                                since_checkpoint = 0;
                                if let Err(err) = self.store.persist(dir) {
                                    tracing::warn!(%err, "checkpoint write failed");
                                }
                            }
                        }
                    }
                    Outcome::Failed(doc_id, reason) => {
                        tracing::warn!(document = %doc_id, %reason, "scoring failed");
                        failed += 1;
                        failures.push(JobFailure { id: doc_id, reason });
                    }
                    Outcome::Cancelled => {
                        cancelled_remaining += 1;
                    }
                }
            }
        });

        // Stream arrival order is nondeterministic; the record is not.
        failures.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(dir) = &self.checkpoint_dir {
            if let Err(err) = self.store.persist(dir) {
                tracing::warn!(%err, "final checkpoint write failed");
            }
        }

        let status = if cancel.is_cancelled() {
            JobStatus::Cancelled
        } else if failed > 0 {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        };
        let finished_at = Utc::now();

        tracing::info!(
            job = %id,
            status = ?status,
            succeeded,
            failed,
            skipped,
            cancelled_remaining,
            "rerank finished"
        );

        RerankJob {
            id,
            status,
            target_version: target,
            total,
            succeeded,
            failed,
            skipped,
            cancelled_remaining,
            failures,
            started_at,
            finished_at: Some(finished_at),
        }
    }
}

fn score_outcome(
    doc: &Document,
    cancel: &CancelFlag,
    ctx: &ScoringContext,
    config: &EngineConfig,
) -> Outcome {
    // Checked between documents, never mid-document: a cancelled document
    // keeps its pre-job record.
    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }
    match scoring::score_document(doc, ctx, config) {
        Ok(score) => {
            let tier = config.tiers.assign(score.composite);
            Outcome::Scored(Box::new(ScoreRecord::new(doc, score, tier)))
        }
        Err(ScoreError::CorruptContent(reason)) => Outcome::Failed(doc.id.clone(), reason),
    }
}
