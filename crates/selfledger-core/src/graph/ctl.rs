//! Orchestrator combining Mirror's concept snapshots with ConceptEdgeLifter's
//! edges into a full ConceptGraph rebuild.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::event::kinds;
use crate::mirror::Mirror;
use crate::storage::EventLog;

use super::concept::{lift_concept_edges, Bindings, ConceptEdge};

/// Minimal reference sink consuming Mirror + ConceptEdgeLifter output.
/// A richer persistence layer is an external collaborator; this one exists
/// so CTLProjection is independently testable.
#[derive(Default)]
pub struct ConceptGraph {
    state: Mutex<ConceptGraphState>,
}

#[derive(Default, Debug, Clone)]
pub struct ConceptGraphState {
    pub concepts: Vec<String>,
    pub edges: Vec<ConceptEdge>,
    pub projection_version: i64,
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild_from_projections(
        &self,
        concepts: Vec<String>,
        edges: Vec<ConceptEdge>,
        projection_version: i64,
    ) {
        *self.state.lock().unwrap() = ConceptGraphState {
            concepts,
            edges,
            projection_version,
        };
    }

    pub fn snapshot(&self) -> ConceptGraphState {
        self.state.lock().unwrap().clone()
    }
}

/// Rebuilds `concept_graph` from a fresh Mirror over `log` combined with
/// bindings derived from open commitments, stability/coherence metrics,
/// summary updates, and reflections.
pub fn rebuild_ctl_from_projections(log: &dyn EventLog, concept_graph: &ConceptGraph) -> Result<()> {
    let mirror = Mirror::from_log(log)?;
    let concepts = mirror.get_concept_snapshots();

    let mut bindings: Bindings = HashMap::new();

    for commitment in mirror.open_commitments().values() {
        bindings
            .entry(commitment.event_id)
            .or_default()
            .push(format!("commitment:{}", commitment.cid));
    }

    let events = log.read_all()?;
    for event in &events {
        match event.kind.as_str() {
            k if k == kinds::STABILITY_METRICS => {
                bindings.entry(event.id).or_default().push("metric:stability_score".to_string());
            }
            k if k == kinds::COHERENCE_CHECK => {
                bindings.entry(event.id).or_default().push("metric:coherence_score".to_string());
            }
            k if k == kinds::SUMMARY_UPDATE => {
                bindings.entry(event.id).or_default().push("topic:summary_state".to_string());
            }
            k if k == kinds::REFLECTION => {
                let source = event.meta_str("source").unwrap_or("user");
                bindings
                    .entry(event.id)
                    .or_default()
                    .push(format!("reflection_source:{source}"));
            }
            _ => {}
        }
    }

    let edges = lift_concept_edges(log, &bindings)?;
    let projection_version = mirror.last_event_id().unwrap_or(0);
    concept_graph.rebuild_from_projections(concepts, edges, projection_version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryEventLog;
    use serde_json::Map;

    #[test]
    fn rebuild_populates_concepts_edges_and_version() {
        let log = InMemoryEventLog::new();
        log.append(kinds::USER_MESSAGE, "please commit", Map::new()).unwrap();
        log.append(kinds::ASSISTANT_MESSAGE, "ok\nCOMMIT: ship it", Map::new())
            .unwrap();

        let mut open_meta = Map::new();
        open_meta.insert("cid".to_string(), serde_json::Value::String("t1".to_string()));
        open_meta.insert("text".to_string(), serde_json::Value::String("ship it".to_string()));
        log.append(kinds::COMMITMENT_OPEN, "", open_meta).unwrap();

        let concept_graph = ConceptGraph::new();
        rebuild_ctl_from_projections(&log, &concept_graph).unwrap();
        let snap = concept_graph.snapshot();
        assert!(snap.concepts.contains(&"commitment:t1".to_string()));
        assert_eq!(snap.projection_version, 3);
    }
}
