//! The engine facade: the surface the browse UI and the RAG answer stage call.
//!
//! Construction validates the configuration before any processing; reranks run
//! on a background thread and are polled through a job registry; selection
//! always plans against a snapshot taken at call start.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::document::Document;
use crate::rerank::{
    CancelFlag, JobStatus, RerankError, RerankFilter, RerankJob, RerankScheduler,
};
use crate::scoring::{self, QualityScore, ScoreError, ScoringContext};
use crate::selection::{KeywordOverlapReweighter, SelectionPlanner};
use crate::store::{ScoreRecord, ScoreStore, StoreError};
use crate::tier::{Tier, TierCounts};
use crate::types::identifiers::{DocumentId, JobId};
use crate::types::selection_set::{SelectionRequest, SelectionSet};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handle to a background rerank: poll with [`QualityEngine::job`], stop with
/// the cancel flag.
pub struct JobHandle {
    pub id: JobId,
    pub cancel: CancelFlag,
}

pub struct QualityEngine {
    config: Arc<EngineConfig>,
    corpus: RwLock<BTreeMap<DocumentId, Document>>,
    store: Arc<ScoreStore>,
    scheduler: Arc<RerankScheduler>,
    jobs: Arc<RwLock<BTreeMap<JobId, RerankJob>>>,
    cancels: RwLock<BTreeMap<JobId, CancelFlag>>,
    planner: SelectionPlanner<KeywordOverlapReweighter>,
}

impl QualityEngine {
    /// Validates the configuration up front; malformed weights or tier
    /// thresholds never reach a scoring run.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let config = Arc::new(config);
        let store = Arc::new(ScoreStore::new());
        let scheduler = Arc::new(RerankScheduler::new(
            Arc::clone(&config),
            Arc::clone(&store),
        ));
        Ok(QualityEngine {
            config,
            corpus: RwLock::new(BTreeMap::new()),
            store,
            scheduler,
            jobs: Arc::new(RwLock::new(BTreeMap::new())),
            cancels: RwLock::new(BTreeMap::new()),
            planner: SelectionPlanner::default(),
        })
    }

    /// Like [`QualityEngine::new`], resuming score state from `dir` when a
    /// checkpoint exists there; reranks checkpoint back into the same place.
    pub fn with_checkpoint(config: EngineConfig, dir: PathBuf) -> Result<Self, EngineError> {
        config.validate()?;
        let config = Arc::new(config);
        let store = if ScoreStore::checkpoint_exists(&dir) {
            Arc::new(ScoreStore::load(&dir)?)
        } else {
            Arc::new(ScoreStore::new())
        };
        let scheduler = Arc::new(
            RerankScheduler::new(Arc::clone(&config), Arc::clone(&store))
                .with_checkpoint_dir(dir),
        );
        Ok(QualityEngine {
            config,
            corpus: RwLock::new(BTreeMap::new()),
            store,
            scheduler,
            jobs: Arc::new(RwLock::new(BTreeMap::new())),
            cancels: RwLock::new(BTreeMap::new()),
            planner: SelectionPlanner::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingest trigger: register the document and score it immediately at the
    /// current algorithm version. A scoring failure leaves the document in the
    /// corpus unscored; a later rerank will retry it.
    pub fn admit(&self, doc: Document) -> Result<(), ScoreError> {
        self.corpus
            .write()
            .expect("corpus lock poisoned")
            .insert(doc.id.clone(), doc.clone());

        let ctx = self.scoring_context();
        match scoring::score_document(&doc, &ctx, &self.config) {
            Ok(score) => {
                let tier = self.config.tiers.assign(score.composite);
                self.store.upsert(ScoreRecord::new(&doc, score, tier));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(document = %doc.id, %err, "scoring on ingest failed");
                Err(err)
            }
        }
    }

    fn scoring_context(&self) -> ScoringContext {
        let corpus = self.corpus.read().expect("corpus lock poisoned");
        ScoringContext {
            reference_time: Utc::now(),
            corpus_median_chars: scoring::corpus_median_chars(corpus.values()),
        }
    }

    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        self.corpus
            .read()
            .expect("corpus lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus.read().expect("corpus lock poisoned").len()
    }

    pub fn score(&self, id: &DocumentId) -> Option<QualityScore> {
        self.store.get(id).map(|r| r.score)
    }

    pub fn tier(&self, id: &DocumentId) -> Option<Tier> {
        self.store.get(id).map(|r| r.tier)
    }

    pub fn tier_counts(&self) -> TierCounts {
        self.store.tier_counts()
    }

    pub fn stale_count(&self) -> usize {
        self.store.stale_count(self.config.version)
    }

    /// Plan against a snapshot taken now; a concurrent rerank cannot mix pre-
    /// and post-rerank scores into the result.
    pub fn select(&self, request: &SelectionRequest) -> SelectionSet {
        let snapshot = self.store.snapshot();
        self.planner.plan(&snapshot, request)
    }

    /// Start a background rerank. Admission is single-flight: a second call
    /// while one is running returns `AlreadyRunning` immediately.
    pub fn rerank(&self, filter: RerankFilter, force: bool) -> Result<JobHandle, RerankError> {
        let permit = self.scheduler.begin()?;
        let id = self.scheduler.reserve_id();
        let cancel = CancelFlag::new();

        self.jobs
            .write()
            .expect("job registry lock poisoned")
            .insert(id, RerankJob::pending(id, self.config.version));
        self.cancels
            .write()
            .expect("cancel registry lock poisoned")
            .insert(id, cancel.clone());

        let corpus: Vec<Document> = self
            .corpus
            .read()
            .expect("corpus lock poisoned")
            .values()
            .cloned()
            .collect();
        let scheduler = Arc::clone(&self.scheduler);
        let jobs = Arc::clone(&self.jobs);
        let cancel_bg = cancel.clone();

        std::thread::spawn(move || {
            if let Some(job) = jobs
                .write()
                .expect("job registry lock poisoned")
                .get_mut(&id)
            {
                job.status = JobStatus::Running;
            }
            let finished = scheduler.execute(permit, id, &corpus, &filter, force, &cancel_bg);
            jobs.write()
                .expect("job registry lock poisoned")
                .insert(id, finished);
        });

        Ok(JobHandle { id, cancel })
    }

    pub fn job(&self, id: &JobId) -> Option<RerankJob> {
        self.jobs
            .read()
            .expect("job registry lock poisoned")
            .get(id)
            .cloned()
    }

    /// Request cancellation of a running job. Returns false for unknown or
    /// already-terminal jobs.
    pub fn cancel(&self, id: &JobId) -> bool {
        let terminal = self
            .job(id)
            .map(|j| j.status.is_terminal())
            .unwrap_or(true);
        if terminal {
            return false;
        }
        match self
            .cancels
            .read()
            .expect("cancel registry lock poisoned")
            .get(id)
        {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    /// Poll until the job is terminal or the timeout elapses; returns the last
    /// observed job record either way.
    pub fn wait_for(&self, id: &JobId, timeout: Duration) -> Option<RerankJob> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.job(id) {
                Some(job) if job.status.is_terminal() => return Some(job),
                Some(job) => {
                    if Instant::now() >= deadline {
                        return Some(job);
                    }
                }
                None => return None,
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
