use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::{LedgerError, Result};
use crate::event::Event;
use crate::hashing::event_hash;
use crate::policy::{NoopPolicy, WritePolicy};

/// An in-memory [`super::EventLog`] used by tests and by diff operations that
/// rebuild throwaway projections over a ledger prefix without SQLite overhead.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<Event>>,
    policy: Mutex<Option<Arc<dyn WritePolicy>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn policy_or_noop(&self) -> Arc<dyn WritePolicy> {
        self.policy
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Arc::new(NoopPolicy))
    }
}

impl super::EventLog for InMemoryEventLog {
    fn append(&self, kind: &str, content: &str, meta: Map<String, Value>) -> Result<Event> {
        self.policy_or_noop().check(kind, &meta)?;

        let mut events = self.events.lock().unwrap();
        let prev_hash = events.last().map(|e| e.hash.clone());
        let id = events.last().map(|e| e.id + 1).unwrap_or(1);
        let meta_value = Value::Object(meta.clone());
        let hash = event_hash(prev_hash.as_deref(), kind, content, &meta_value);

        let event = Event {
            id,
            ts: Utc::now(),
            kind: kind.to_string(),
            content: content.to_string(),
            meta,
            prev_hash,
            hash,
        };
        events.push(event.clone());
        Ok(event)
    }

    fn read_all(&self) -> Result<Vec<Event>> {
        Ok(self.events.lock().unwrap().clone())
    }

    fn get(&self, id: i64) -> Result<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    fn read_from(&self, after_id: i64) -> Result<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.id > after_id)
            .cloned()
            .collect())
    }

    fn set_policy(&self, policy: Arc<dyn WritePolicy>) {
        *self.policy.lock().unwrap() = Some(policy);
    }
}
