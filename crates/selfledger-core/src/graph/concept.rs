//! Binds events to concept ids and lifts MemeGraph edges into concept-level
//! edges for the concept graph.

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::storage::EventLog;

use super::meme::{Direction, MemeGraph};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConceptEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation: String,
}

impl ConceptEdge {
    pub const WEIGHT: f64 = 1.0;
}

/// Maps an event id to the (possibly empty) set of concept ids bound to it.
pub type Bindings = HashMap<i64, Vec<String>>;

/// Rebuilds a fresh MemeGraph over `log` and lifts its edges into
/// concept-to-concept edges using `bindings`.
pub fn lift_concept_edges(log: &dyn EventLog, bindings: &Bindings) -> Result<Vec<ConceptEdge>> {
    let events = log.read_all()?;
    let graph = MemeGraph::new();
    graph.rebuild(&events);

    let concepts_for = |eid: i64| -> Vec<String> {
        let set: BTreeSet<String> = bindings
            .get(&eid)
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        set.into_iter().collect()
    };

    let mut node_ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    node_ids.sort();

    let mut edges: BTreeSet<ConceptEdge> = BTreeSet::new();
    for &u in &node_ids {
        let src_concepts = concepts_for(u);
        if src_concepts.is_empty() {
            continue;
        }
        for v in graph.neighbors(u, Direction::Both, None) {
            let tgt_concepts = concepts_for(v);
            if tgt_concepts.is_empty() {
                continue;
            }
            let label = graph
                .edge_label(u, v)
                .or_else(|| graph.edge_label(v, u))
                .unwrap_or_else(|| "related".to_string());

            for c1 in &src_concepts {
                for c2 in &tgt_concepts {
                    if c1 == c2 {
                        continue;
                    }
                    edges.insert(ConceptEdge {
                        source_id: c1.clone(),
                        target_id: c2.clone(),
                        relation: label.clone(),
                    });
                }
            }
        }
    }

    Ok(edges.into_iter().collect())
}
