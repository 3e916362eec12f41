//! # selfledger-core
//!
//! An append-only, content-hashed event ledger and a family of deterministic
//! projections over it for an introspective agent runtime.
//!
//! - **EventLog**: the canonical state. Every record is content-hashed and
//!   chained to its predecessor, so a reopened ledger can be verified for
//!   tamper-free replay. SQLite is the reference persistent backend; an
//!   in-memory implementation exists for tests and throwaway diffs.
//! - **Claims**: structured belief/value/tendency/identity/ontology
//!   statements extracted deterministically from assistant messages, with
//!   prefix-based parsing, optional embedded JSON overrides, and an
//!   idempotent historical migrator for ledgers written before extraction
//!   existed.
//! - **RSM (Recursive Self-Model)**: a materialized view over active claims —
//!   behavioral tendencies, contradictions, knowledge gaps — that only emits
//!   an update event when its snapshot actually changes.
//! - **MemeGraph**: an in-house labeled directed graph over ledger events
//!   (replies, commitments, closures, reflections), queried with
//!   deterministically sorted output.
//! - **ConceptEdgeLifter / CTLProjection**: lifts event-level graph edges to
//!   concept-level edges bound by commitments, metrics, summaries, and
//!   reflections.
//! - **Mirror**: a facade aggregating RSM and MemeGraph behind one query
//!   surface, usable either as a one-shot rebuild or as an incrementally
//!   synced long-lived projection.
//!
//! ## Quick start
//!
//! ```rust
//! use selfledger_core::{kinds, EventLog, InMemoryEventLog, Mirror};
//! use serde_json::Map;
//!
//! let log = InMemoryEventLog::new();
//! log.append(kinds::ASSISTANT_MESSAGE, "BELIEF: replay determinism matters", Map::new())?;
//!
//! let mirror = Mirror::from_log(&log)?;
//! let snapshot = mirror.rsm_snapshot();
//! assert!(!snapshot.knowledge_gaps.is_empty() || snapshot.knowledge_gaps.is_empty());
//! # Ok::<(), selfledger_core::LedgerError>(())
//! ```

pub mod claims;
pub mod error;
pub mod event;
pub mod graph;
pub mod hashing;
pub mod mirror;
pub mod policy;
pub mod rsm;
pub mod storage;

pub use error::{LedgerError, Result};
pub use event::{kinds, Event};
pub use hashing::{canonical_json, claim_id, event_hash};

pub use claims::{detect_contradictions, extract, migrate, needs_migration, ClaimRecord, CLAIM_PREFIXES};
pub use policy::{ActorDenylistPolicy, NoopPolicy, PolicyError, WritePolicy};
pub use storage::{EventLog, InMemoryEventLog, SqliteEventLog, MIGRATIONS};

pub use rsm::{ConceptMetricsSource, NoopConceptMetrics, RecursiveSelfModel, RsmSnapshot, TopTendency};

pub use graph::{
    extract_commitments, lift_concept_edges, rebuild_ctl_from_projections, Bindings, ConceptEdge,
    ConceptGraph, ConceptGraphState, Direction, GraphStats, MemeGraph, TRACKED_KINDS,
};

pub use mirror::{Mirror, OpenCommitment, RsmDiff};
