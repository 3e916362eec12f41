//! The canonical ledger record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event kinds the projection layer inspects by name. Any other string is a
/// valid `kind` too; these are just the ones that drive behavior.
pub mod kinds {
    pub const USER_MESSAGE: &str = "user_message";
    pub const ASSISTANT_MESSAGE: &str = "assistant_message";
    pub const REFLECTION: &str = "reflection";
    pub const COMMITMENT_OPEN: &str = "commitment_open";
    pub const COMMITMENT_CLOSE: &str = "commitment_close";
    pub const SUMMARY_UPDATE: &str = "summary_update";
    pub const CLAIM_REGISTER: &str = "claim_register";
    pub const RSM_UPDATE: &str = "rsm_update";
    pub const STABILITY_METRICS: &str = "stability_metrics";
    pub const COHERENCE_CHECK: &str = "coherence_check";
    pub const CONFIG: &str = "config";
}

/// An append-only ledger record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub prev_hash: Option<String>,
    pub hash: String,
}

impl Event {
    /// Parses `content` as a JSON object. Returns `None` on parse failure or
    /// if the top-level value is not an object — callers treat both cases as
    /// "nothing usable here" rather than propagating an error, since malformed
    /// derived content must never abort a projection.
    pub fn content_as_object(&self) -> Option<Map<String, Value>> {
        match serde_json::from_str::<Value>(&self.content) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}
