//! Long-lived facade aggregating RSM + MemeGraph with a query surface and
//! incremental `sync(event)`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::event::{kinds, Event};
use crate::graph::MemeGraph;
use crate::rsm::RecursiveSelfModel;
use crate::storage::EventLog;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenCommitment {
    pub event_id: i64,
    pub cid: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RsmDiff {
    pub tendencies_delta: HashMap<String, f64>,
    pub gaps_added: Vec<String>,
    pub gaps_resolved: Vec<String>,
}

pub struct Mirror<'a> {
    log: &'a dyn EventLog,
    rsm: Mutex<RecursiveSelfModel>,
    graph: MemeGraph,
    last_event_id: Mutex<Option<i64>>,
    listen: bool,
}

impl<'a> Mirror<'a> {
    /// Builds a Mirror over the full current contents of `log`, in
    /// non-listening (pure, on-demand rebuild) mode.
    pub fn from_log(log: &'a dyn EventLog) -> Result<Self> {
        let events = log.read_all()?;
        let mirror = Self {
            log,
            rsm: Mutex::new(RecursiveSelfModel::new()),
            graph: MemeGraph::new(),
            last_event_id: Mutex::new(None),
            listen: false,
        };
        mirror.rsm.lock().unwrap().rebuild(&events);
        mirror.graph.rebuild(&events);
        *mirror.last_event_id.lock().unwrap() = events.last().map(|e| e.id);
        Ok(mirror)
    }

    /// Builds a Mirror that incrementally tracks appends via [`Self::sync`].
    pub fn listening(log: &'a dyn EventLog) -> Result<Self> {
        let mut mirror = Self::from_log(log)?;
        mirror.listen = true;
        Ok(mirror)
    }

    pub fn is_listening(&self) -> bool {
        self.listen
    }

    /// Applies one newly-appended event incrementally. In listening mode,
    /// prefer calling this for each event read via `read_from(last_event_id)`
    /// rather than rebuilding from scratch.
    pub fn sync(&self, event: &Event) -> Result<()> {
        self.rsm.lock().unwrap().observe(event, Some(self.log))?;
        self.graph.add_event(event);
        let mut last = self.last_event_id.lock().unwrap();
        if last.map(|l| event.id > l).unwrap_or(true) {
            *last = Some(event.id);
        }
        Ok(())
    }

    pub fn last_event_id(&self) -> Option<i64> {
        *self.last_event_id.lock().unwrap()
    }

    pub fn rsm_snapshot(&self) -> crate::rsm::RsmSnapshot {
        self.rsm.lock().unwrap().snapshot()
    }

    pub fn rsm_knowledge_gaps(&self) -> usize {
        self.rsm.lock().unwrap().knowledge_gap_count()
    }

    pub fn get_claims(&self) -> Vec<crate::claims::ClaimRecord> {
        self.rsm.lock().unwrap().get_claims().into_iter().cloned().collect()
    }

    pub fn get_claim_by_id(&self, claim_id: &str) -> Option<crate::claims::ClaimRecord> {
        self.rsm.lock().unwrap().get_claim_by_id(claim_id).cloned()
    }

    /// Rebuilds two throwaway RSM projections over the ledger prefixes
    /// `<= a` and `<= b` and diffs their snapshots. `diff_rsm(a, a)` is
    /// always the empty diff.
    pub fn diff_rsm(&self, a: i64, b: i64) -> Result<RsmDiff> {
        if a == b {
            return Ok(RsmDiff::default());
        }

        let events = self.log.read_all()?;
        let prefix = |upto: i64| -> Vec<Event> {
            events.iter().filter(|e| e.id <= upto).cloned().collect()
        };

        let mut rsm_a = RecursiveSelfModel::new();
        rsm_a.rebuild(&prefix(a));
        let snap_a = rsm_a.snapshot();

        let mut rsm_b = RecursiveSelfModel::new();
        rsm_b.rebuild(&prefix(b));
        let snap_b = rsm_b.snapshot();

        let mut tendencies_delta = HashMap::new();
        let mut keys: std::collections::BTreeSet<&String> = snap_a.behavioral_tendencies.keys().collect();
        keys.extend(snap_b.behavioral_tendencies.keys());
        for key in keys {
            let va = snap_a.behavioral_tendencies.get(key).copied().unwrap_or(0.0);
            let vb = snap_b.behavioral_tendencies.get(key).copied().unwrap_or(0.0);
            let delta = vb - va;
            if delta != 0.0 {
                tendencies_delta.insert(key.clone(), delta);
            }
        }

        let gaps_a: std::collections::HashSet<&String> = snap_a.knowledge_gaps.iter().collect();
        let gaps_b: std::collections::HashSet<&String> = snap_b.knowledge_gaps.iter().collect();
        let mut gaps_added: Vec<String> = gaps_b.difference(&gaps_a).map(|s| s.to_string()).collect();
        let mut gaps_resolved: Vec<String> = gaps_a.difference(&gaps_b).map(|s| s.to_string()).collect();
        gaps_added.sort();
        gaps_resolved.sort();

        Ok(RsmDiff {
            tendencies_delta,
            gaps_added,
            gaps_resolved,
        })
    }

    /// Every `commitment_open` node without a corresponding `closes`
    /// predecessor.
    pub fn open_commitments(&self) -> HashMap<String, OpenCommitment> {
        let mut result = HashMap::new();
        for id in self.graph.nodes_of_kind(kinds::COMMITMENT_OPEN) {
            if self.graph.has_incoming_label(id, "closes") {
                continue;
            }
            let Some(meta) = self.graph.node_meta(id) else { continue };
            let Some(cid) = meta.get("cid").and_then(|v| v.as_str()) else { continue };
            let text = meta.get("text").and_then(|v| v.as_str()).map(str::to_string);
            result.insert(
                cid.to_string(),
                OpenCommitment {
                    event_id: id,
                    cid: cid.to_string(),
                    text,
                },
            );
        }
        result
    }

    /// One entry per concept id appearing in `open_commitments`
    /// (`commitment:<cid>`). Richer concept sources (embeddings, retrieval)
    /// are external collaborators and are not represented here.
    pub fn get_concept_snapshots(&self) -> Vec<String> {
        let mut concepts: Vec<String> = self
            .open_commitments()
            .keys()
            .map(|cid| format!("commitment:{cid}"))
            .collect();
        concepts.sort();
        concepts.dedup();
        concepts
    }

    pub fn graph(&self) -> &MemeGraph {
        &self.graph
    }
}
