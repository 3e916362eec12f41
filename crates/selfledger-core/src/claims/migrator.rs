//! Always-correct historical backfill of `claim_register` events.
//!
//! Unconditionally rescans the full ledger and emits any missing claim, which
//! keeps it correct even after a prior run aborted partway through. A
//! precondition-gated fast path is provided separately as a pure optimization;
//! it must never be used as a substitute for this scan when correctness after
//! partial failure matters.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::event::kinds;
use crate::storage::EventLog;

use super::extractor::extract;

/// Scans `log` and appends a `claim_register` event for every claim whose id
/// is not already present. Returns the number of events emitted.
pub fn migrate(log: &dyn EventLog) -> Result<usize> {
    let events = log.read_all()?;
    let mut seen = existing_claim_ids(&events);
    let mut emitted = 0;

    for event in &events {
        for claim in extract(event) {
            if seen.contains(&claim.claim_id) {
                continue;
            }
            let mut meta = Map::new();
            meta.insert("source".to_string(), Value::String("claim_migration".to_string()));
            meta.insert("migration_version".to_string(), Value::String("1".to_string()));
            log.append(kinds::CLAIM_REGISTER, &claim.to_canonical_json(), meta)?;
            seen.insert(claim.claim_id);
            emitted += 1;
        }
    }

    Ok(emitted)
}

/// Pure optimization: true iff the ledger has assistant messages but no
/// `claim_register` events at all. A `false` result does not mean migration
/// is unnecessary — it only means the cheap "definitely nothing registered
/// yet" shortcut does not apply, and callers wanting correctness should still
/// call [`migrate`] unconditionally.
pub fn needs_migration(events: &[crate::event::Event]) -> bool {
    let has_assistant_messages = events.iter().any(|e| e.kind == kinds::ASSISTANT_MESSAGE);
    let has_claim_registers = events.iter().any(|e| e.kind == kinds::CLAIM_REGISTER);
    has_assistant_messages && !has_claim_registers
}

fn existing_claim_ids(events: &[crate::event::Event]) -> HashSet<String> {
    events
        .iter()
        .filter(|e| e.kind == kinds::CLAIM_REGISTER)
        .filter_map(|e| e.content_as_object())
        .filter_map(|obj| obj.get("claim_id").and_then(Value::as_str).map(str::to_string))
        .collect()
}
