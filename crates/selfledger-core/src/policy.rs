//! Pluggable write-gate for sensitive event kinds.
//!
//! `EventLog::append` consults an optional [`WritePolicy`] before persisting.
//! The core ships two reference implementations; a real enforcement engine
//! (which actor is "the CLI", what counts as sensitive in a given deployment)
//! is an external concern and is deliberately not hard-coded here.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("append of kind '{kind}' denied for actor '{actor}'")]
pub struct PolicyError {
    pub kind: String,
    pub actor: String,
}

pub trait WritePolicy: Send + Sync {
    /// Returns `Ok(())` if an append of `kind` with `meta` may proceed.
    fn check(&self, kind: &str, meta: &Map<String, Value>) -> Result<(), PolicyError>;
}

/// Permits every append. The default when no policy is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPolicy;

impl WritePolicy for NoopPolicy {
    fn check(&self, _kind: &str, _meta: &Map<String, Value>) -> Result<(), PolicyError> {
        Ok(())
    }
}

/// Denies a fixed set of sensitive kinds when `meta.source` matches a denied actor.
#[derive(Debug, Clone)]
pub struct ActorDenylistPolicy {
    pub sensitive_kinds: Vec<String>,
    pub denied_actors: Vec<String>,
}

impl ActorDenylistPolicy {
    /// The sensitive kinds named by the runtime's policy collaborator:
    /// config, checkpoint manifests, embedding additions, retrieval selections.
    pub fn default_sensitive_kinds() -> Vec<String> {
        vec![
            "config".to_string(),
            "checkpoint_manifest".to_string(),
            "embedding_add".to_string(),
            "retrieval_selection".to_string(),
        ]
    }

    pub fn new(denied_actors: Vec<String>) -> Self {
        Self {
            sensitive_kinds: Self::default_sensitive_kinds(),
            denied_actors,
        }
    }
}

impl WritePolicy for ActorDenylistPolicy {
    fn check(&self, kind: &str, meta: &Map<String, Value>) -> Result<(), PolicyError> {
        if !self.sensitive_kinds.iter().any(|k| k == kind) {
            return Ok(());
        }
        let actor = meta.get("source").and_then(Value::as_str).unwrap_or("");
        if self.denied_actors.iter().any(|a| a == actor) {
            return Err(PolicyError {
                kind: kind.to_string(),
                actor: actor.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_allows_everything() {
        let p = NoopPolicy;
        assert!(p.check("config", &Map::new()).is_ok());
    }

    #[test]
    fn denylist_blocks_sensitive_kind_for_denied_actor() {
        let p = ActorDenylistPolicy::new(vec!["cli".to_string()]);
        let mut meta = Map::new();
        meta.insert("source".to_string(), Value::String("cli".to_string()));
        assert!(p.check("config", &meta).is_err());

        let mut meta2 = Map::new();
        meta2.insert("source".to_string(), Value::String("system".to_string()));
        assert!(p.check("config", &meta2).is_ok());
    }

    #[test]
    fn denylist_ignores_non_sensitive_kinds() {
        let p = ActorDenylistPolicy::new(vec!["cli".to_string()]);
        let mut meta = Map::new();
        meta.insert("source".to_string(), Value::String("cli".to_string()));
        assert!(p.check("user_message", &meta).is_ok());
    }
}
