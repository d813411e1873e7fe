//! On-disk persistence for the score arena.
//!
//! Used as the rerank checkpoint target: an interrupted run restarts from the
//! last persisted state and the idempotence check skips everything already
//! current. Each file is written to a temp path and atomically renamed into
//! place; the manifest's store version is recomputed and verified on load.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{fingerprint_records, ScoreRecord, ScoreStore};

const RECORDS_FILE: &str = "records.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store integrity mismatch: manifest says {expected}, records hash to {actual}")]
    IntegrityMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreManifest {
    pub store_version: String,
    pub record_count: usize,
    pub written_at: DateTime<Utc>, // informational only
}

impl ScoreStore {
    /// Persist the current state under `dir`, creating it if needed.
    pub fn persist(&self, dir: &Path) -> Result<(), StoreError> {
        let snapshot = self.snapshot();
        fs::create_dir_all(dir)?;

        let records_json = serde_json::to_vec_pretty(snapshot.records())?;
        write_atomic(&dir.join(RECORDS_FILE), &records_json)?;

        let manifest = StoreManifest {
            store_version: snapshot.fingerprint().to_string(),
            record_count: snapshot.len(),
            written_at: Utc::now(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(&dir.join(MANIFEST_FILE), &manifest_json)?;

        Ok(())
    }

    /// Load a persisted store, verifying the manifest hash against the
    /// recomputed record fingerprint.
    pub fn load(dir: &Path) -> Result<ScoreStore, StoreError> {
        let manifest_bytes = fs::read(dir.join(MANIFEST_FILE))?;
        let manifest: StoreManifest = serde_json::from_slice(&manifest_bytes)?;

        let records_bytes = fs::read(dir.join(RECORDS_FILE))?;
        let mut records: Vec<ScoreRecord> = serde_json::from_slice(&records_bytes)?;
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let actual = fingerprint_records(&records);
        if actual != manifest.store_version {
            return Err(StoreError::IntegrityMismatch {
                expected: manifest.store_version,
                actual,
            });
        }

        let store = ScoreStore::new();
        store.replace_all(records);
        Ok(store)
    }

    /// Whether `dir` holds a persisted store.
    pub fn checkpoint_exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file() && dir.join(RECORDS_FILE).is_file()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}
