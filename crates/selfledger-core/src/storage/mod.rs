//! Storage Module
//!
//! The append-only event ledger:
//! - SQLite-backed persistent implementation with WAL journaling and a
//!   versioned migration table
//! - an in-memory implementation for tests and throwaway projection diffs
//! - content hash chaining so a reopened ledger can be verified for tamper-free replay

mod memory;
mod migrations;
mod sqlite;

pub use memory::InMemoryEventLog;
pub use migrations::MIGRATIONS;
pub use sqlite::SqliteEventLog;

use crate::error::Result;
use crate::event::Event;
use crate::policy::WritePolicy;
use serde_json::{Map, Value};

/// The append-only ledger interface the projection layer depends on.
pub trait EventLog: Send + Sync {
    /// Appends a new event, assigning the next id and chaining its hash to
    /// the current tail. Returns the stored event, including its assigned
    /// fields, so the caller never has to re-read it.
    fn append(&self, kind: &str, content: &str, meta: Map<String, Value>) -> Result<Event>;

    /// The full ordered event sequence.
    fn read_all(&self) -> Result<Vec<Event>>;

    /// A single event by id.
    fn get(&self, id: i64) -> Result<Event>;

    /// Every event with `id > after_id`, in ascending order.
    fn read_from(&self, after_id: i64) -> Result<Vec<Event>>;

    /// Installs (or replaces) the write policy consulted by `append`.
    fn set_policy(&self, policy: std::sync::Arc<dyn WritePolicy>);
}
