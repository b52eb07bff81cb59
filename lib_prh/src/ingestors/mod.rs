//! # Ingestors Module
//!
//! Moves company data from the registry into the output store. The pieces are
//! kept separate so each can be driven on its own:
//!
//! ## Contained Modules:
//! - **`sources`**: the `Fetcher` and `CandidateSource` seams the orchestrator
//!   pulls from.
//! - **`sync_engine`**: transactional `insert` and `upsert` of one aggregate.
//! - **`batch`**: the sequential orchestrator with per-item failure isolation.
//! - **`outcome`**: the per-company result records it returns.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Sequential fetch, decompose and sync over a candidate list.
pub mod batch;
/// Per-company results.
pub mod outcome;
/// Fetcher and candidate source traits.
pub mod sources;
/// Transactional writes of one aggregate.
pub mod sync_engine;

// --- Public API Re-exports ---
pub use batch::{BatchError, Orchestrator, SingleRun, SyncMode};
pub use outcome::{ItemResult, Outcome, RunSummary, SkipReason};
pub use sources::{Candidate, CandidateSource, FetchError, Fetcher, SourceError, StaticCandidates};
pub use sync_engine::{SyncEngine, SyncError};
