//! Deterministic document quality scoring and tiered retrieval selection.
//!
//! `quality-core` converts heterogeneous documents into a versioned composite
//! quality score, partitions the corpus into quality tiers, recomputes scores
//! in resumable, failure-tolerant batches, and plans bounded,
//! category-balanced retrieval sets under a hard token budget. All operations
//! are deterministic — identical inputs always produce identical outputs.
//!
//! See <https://github.com/contextenginehq/context-engine> for the full platform.

pub mod config;
pub mod document;
pub mod engine;
pub mod rerank;
pub mod scoring;
pub mod selection;
pub mod store;
pub mod tier;
pub mod types;
