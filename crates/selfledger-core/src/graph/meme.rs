//! Event-level causal projection: a labeled directed graph lifted from
//! tracked ledger event kinds. Built on in-house forward/reverse adjacency
//! maps rather than a third-party graph library, since query determinism
//! depends on controlling iteration order ourselves — every read sorts its
//! output before returning.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use super::commitments::extract_commitments;
use crate::event::{kinds, Event};

pub const TRACKED_KINDS: &[&str] = &[
    kinds::USER_MESSAGE,
    kinds::ASSISTANT_MESSAGE,
    kinds::COMMITMENT_OPEN,
    kinds::COMMITMENT_CLOSE,
    kinds::REFLECTION,
    kinds::SUMMARY_UPDATE,
];

#[derive(Debug, Clone)]
struct NodeInfo {
    kind: String,
    content: String,
    meta: serde_json::Map<String, Value>,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<i64, NodeInfo>,
    forward: HashMap<i64, Vec<(i64, String)>>,
    reverse: HashMap<i64, Vec<(i64, String)>>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub counts_by_kind: HashMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Both,
}

pub struct MemeGraph {
    inner: Mutex<Inner>,
}

impl Default for MemeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemeGraph {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn rebuild(&self, events: &[Event]) {
        let mut inner = self.inner.lock().unwrap();
        *inner = Inner::default();
        for event in events {
            Self::add_event_locked(&mut inner, event);
        }
    }

    pub fn add_event(&self, event: &Event) {
        let mut inner = self.inner.lock().unwrap();
        if inner.nodes.contains_key(&event.id) {
            return;
        }
        if !TRACKED_KINDS.contains(&event.kind.as_str()) {
            return;
        }
        Self::add_event_locked(&mut inner, event);
    }

    fn add_event_locked(inner: &mut Inner, event: &Event) {
        if !TRACKED_KINDS.contains(&event.kind.as_str()) {
            return;
        }
        inner.nodes.insert(
            event.id,
            NodeInfo {
                kind: event.kind.clone(),
                content: event.content.clone(),
                meta: event.meta.clone(),
            },
        );

        match event.kind.as_str() {
            k if k == kinds::ASSISTANT_MESSAGE => {
                if let Some(last_user) = Self::find_last_of_kind(inner, kinds::USER_MESSAGE) {
                    Self::add_edge(inner, event.id, last_user, "replies_to");
                }
            }
            k if k == kinds::COMMITMENT_OPEN => {
                if let Some(text) = event.meta.get("text").and_then(Value::as_str) {
                    if !text.is_empty() {
                        if let Some(assistant_node) = Self::find_assistant_with_commit_text(inner, text) {
                            Self::add_edge(inner, event.id, assistant_node, "commits_to");
                        }
                    }
                }
            }
            k if k == kinds::COMMITMENT_CLOSE => {
                if let Some(cid) = event.meta.get("cid").and_then(Value::as_str) {
                    if !cid.is_empty() {
                        if let Some(open_node) = Self::find_commitment_open_by_cid(inner, cid) {
                            Self::add_edge(inner, event.id, open_node, "closes");
                        }
                    }
                }
            }
            k if k == kinds::REFLECTION => {
                if let Some(about_event) = event.meta.get("about_event").and_then(Value::as_i64) {
                    if inner.nodes.contains_key(&about_event) {
                        Self::add_edge(inner, event.id, about_event, "reflects_on");
                    }
                }
            }
            _ => {}
        }
    }

    fn add_edge(inner: &mut Inner, source: i64, target: i64, label: &str) {
        inner.forward.entry(source).or_default().push((target, label.to_string()));
        inner.reverse.entry(target).or_default().push((source, label.to_string()));
    }

    fn find_last_of_kind(inner: &Inner, kind: &str) -> Option<i64> {
        inner
            .nodes
            .iter()
            .filter(|(_, info)| info.kind == kind)
            .map(|(id, _)| *id)
            .max()
    }

    fn find_assistant_with_commit_text(inner: &Inner, text: &str) -> Option<i64> {
        let target = text.trim();
        let mut candidates: Vec<i64> = inner
            .nodes
            .iter()
            .filter(|(_, info)| info.kind == kinds::ASSISTANT_MESSAGE)
            .filter(|(_, info)| extract_commitments(&info.content).iter().any(|c| c == target))
            .map(|(id, _)| *id)
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    fn find_commitment_open_by_cid(inner: &Inner, cid: &str) -> Option<i64> {
        let mut candidates: Vec<i64> = inner
            .nodes
            .iter()
            .filter(|(_, info)| info.kind == kinds::COMMITMENT_OPEN)
            .filter(|(_, info)| info.meta.get("cid").and_then(Value::as_str) == Some(cid))
            .map(|(id, _)| *id)
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Every node id whose kind equals `kind`, unsorted.
    pub fn nodes_of_kind(&self, kind: &str) -> Vec<i64> {
        let inner = self.inner.lock().unwrap();
        inner
            .nodes
            .iter()
            .filter(|(_, info)| info.kind == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    /// The stored `meta` object for a node, if present.
    pub fn node_meta(&self, id: i64) -> Option<serde_json::Map<String, Value>> {
        let inner = self.inner.lock().unwrap();
        inner.nodes.get(&id).map(|info| info.meta.clone())
    }

    /// Whether any edge labeled `label` points into `target`.
    pub fn has_incoming_label(&self, target: i64, label: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .reverse
            .get(&target)
            .map(|edges| edges.iter().any(|(_, l)| l == label))
            .unwrap_or(false)
    }

    /// The label of the edge `source -> target`, if one exists.
    pub fn edge_label(&self, source: i64, target: i64) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .forward
            .get(&source)?
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, label)| label.clone())
    }

    pub fn graph_stats(&self) -> GraphStats {
        let inner = self.inner.lock().unwrap();
        let mut counts_by_kind: HashMap<String, usize> = HashMap::new();
        for info in inner.nodes.values() {
            *counts_by_kind.entry(info.kind.clone()).or_insert(0) += 1;
        }
        let edges = inner.forward.values().map(Vec::len).sum();
        GraphStats {
            nodes: inner.nodes.len(),
            edges,
            counts_by_kind,
        }
    }

    pub fn neighbors(&self, event_id: i64, direction: Direction, kind: Option<&str>) -> Vec<i64> {
        let inner = self.inner.lock().unwrap();
        if !inner.nodes.contains_key(&event_id) {
            return Vec::new();
        }
        let mut neigh: HashSet<i64> = HashSet::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(edges) = inner.forward.get(&event_id) {
                neigh.extend(edges.iter().map(|(t, _)| *t));
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(edges) = inner.reverse.get(&event_id) {
                neigh.extend(edges.iter().map(|(s, _)| *s));
            }
        }
        let mut result: Vec<i64> = match kind {
            Some(k) => neigh
                .into_iter()
                .filter(|n| inner.nodes.get(n).map(|i| i.kind == k).unwrap_or(false))
                .collect(),
            None => neigh.into_iter().collect(),
        };
        result.sort();
        result
    }

    pub fn subgraph_for_cid(&self, cid: &str) -> Vec<i64> {
        let cid = cid.trim();
        if cid.is_empty() {
            return Vec::new();
        }
        let base = self.thread_for_cid(cid);
        if base.is_empty() {
            return Vec::new();
        }
        let mut included: HashSet<i64> = base.iter().copied().collect();
        for eid in &base {
            for n in self.neighbors(*eid, Direction::Both, None) {
                included.insert(n);
            }
        }
        let mut result: Vec<i64> = included.into_iter().collect();
        result.sort();
        result
    }

    pub fn recent_frontier(&self, limit: usize, kinds_filter: Option<&[&str]>) -> Vec<i64> {
        let limit = limit.max(1);
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<i64> = inner.nodes.keys().copied().collect();
        ids.sort_by(|a, b| b.cmp(a));
        let mut candidates = Vec::new();
        for id in ids {
            if let Some(kinds_filter) = kinds_filter {
                let k = &inner.nodes[&id].kind;
                if !kinds_filter.contains(&k.as_str()) {
                    continue;
                }
            }
            candidates.push(id);
            if candidates.len() == limit {
                break;
            }
        }
        candidates.sort();
        candidates
    }

    pub fn thread_for_cid(&self, cid: &str) -> Vec<i64> {
        let cid = cid.trim();
        if cid.is_empty() {
            return Vec::new();
        }
        let inner = self.inner.lock().unwrap();
        let Some(open_node) = Self::find_commitment_open_by_cid(&inner, cid) else {
            return Vec::new();
        };

        let mut assistant_nodes: Vec<i64> = inner
            .forward
            .get(&open_node)
            .into_iter()
            .flatten()
            .filter(|(_, label)| label == "commits_to")
            .map(|(t, _)| *t)
            .collect();
        assistant_nodes.sort();

        let mut close_nodes: Vec<i64> = inner
            .reverse
            .get(&open_node)
            .into_iter()
            .flatten()
            .filter(|(_, label)| label == "closes")
            .map(|(s, _)| *s)
            .collect();
        close_nodes.sort();

        let mut reflection_nodes: Vec<i64> = assistant_nodes
            .iter()
            .flat_map(|an| {
                inner
                    .reverse
                    .get(an)
                    .into_iter()
                    .flatten()
                    .filter(|(_, label)| label == "reflects_on")
                    .map(|(s, _)| *s)
            })
            .collect();
        reflection_nodes.sort();
        reflection_nodes.dedup();

        let mut ordered = Vec::new();
        ordered.extend(assistant_nodes);
        ordered.push(open_node);
        ordered.extend(close_nodes);
        ordered.extend(reflection_nodes);
        ordered
    }
}
