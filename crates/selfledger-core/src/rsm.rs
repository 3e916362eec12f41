//! Recursive Self-Model: aggregates active claims into behavioral tendencies,
//! knowledge gaps, and contradiction sets. A pure materialized view — same
//! ledger prefix in, same snapshot out — that optionally emits a delta-triggered
//! `rsm_update` event each time its snapshot changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::claims::ClaimRecord;
use crate::error::Result;
use crate::event::{kinds, Event};
use crate::hashing::canonical_json;
use crate::storage::EventLog;

/// Supplies `concept_metrics` for the snapshot. A concrete computation over
/// embeddings/retrieval indexes is an external collaborator; the default used
/// when none is configured yields an empty map unconditionally.
pub trait ConceptMetricsSource: Send + Sync {
    fn compute(&self) -> Result<Map<String, Value>>;
}

pub struct NoopConceptMetrics;

impl ConceptMetricsSource for NoopConceptMetrics {
    fn compute(&self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

/// Predicate synonym groups mapped to their exposed tendency key.
const TENDENCY_PREDICATE_GROUPS: &[(&str, &[&str])] = &[
    ("determinism_emphasis", &["is_deterministic", "deterministic"]),
    ("replay_centricity", &["is_replay_centric", "replay"]),
    ("stability_emphasis", &["prioritizes_stability", "stability"]),
    ("support_awareness", &["support_aware", "support_awareness"]),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RsmSnapshot {
    pub behavioral_tendencies: BTreeMap<String, f64>,
    pub knowledge_gaps: Vec<String>,
    pub interaction_meta_patterns: Vec<String>,
    pub reflections: Vec<String>,
    pub concept_metrics: Map<String, Value>,
    pub active_claim_count: usize,
    pub contradiction_events: Vec<String>,
    pub top_tendencies: Vec<TopTendency>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopTendency {
    pub predicate: String,
    pub strength: f64,
    pub sources: usize,
}

impl RsmSnapshot {
    pub fn to_value(&self) -> Value {
        let tendencies: Map<String, Value> = self
            .behavioral_tendencies
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();
        let top_tendencies: Vec<Value> = self
            .top_tendencies
            .iter()
            .map(|t| {
                serde_json::json!({
                    "predicate": t.predicate,
                    "strength": t.strength,
                    "sources": t.sources,
                })
            })
            .collect();
        let reflections: Vec<Value> = self
            .reflections
            .iter()
            .map(|i| serde_json::json!({"intent": i}))
            .collect();

        serde_json::json!({
            "behavioral_tendencies": Value::Object(tendencies),
            "knowledge_gaps": self.knowledge_gaps,
            "interaction_meta_patterns": self.interaction_meta_patterns,
            "intents": Value::Object(Map::new()),
            "reflections": reflections,
            "concept_metrics": Value::Object(self.concept_metrics.clone()),
            "active_claim_count": self.active_claim_count,
            "contradiction_events": self.contradiction_events,
            "top_tendencies": top_tendencies,
        })
    }
}

/// Deterministic aggregation over `claim_register` events.
pub struct RecursiveSelfModel {
    claims: HashMap<String, ClaimRecord>,
    last_processed_event_id: Option<i64>,
    reflection_intents: Vec<String>,
    contradiction_events: Vec<String>,
    last_snapshot: Option<RsmSnapshot>,
    concept_metrics: Arc<dyn ConceptMetricsSource>,
    pending_tendencies: BTreeMap<String, f64>,
    pending_gaps: Vec<String>,
    pending_patterns: Vec<String>,
}

impl Default for RecursiveSelfModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveSelfModel {
    pub fn new() -> Self {
        Self {
            claims: HashMap::new(),
            last_processed_event_id: None,
            reflection_intents: Vec::new(),
            contradiction_events: Vec::new(),
            last_snapshot: None,
            concept_metrics: Arc::new(NoopConceptMetrics),
            pending_tendencies: BTreeMap::new(),
            pending_gaps: Vec::new(),
            pending_patterns: Vec::new(),
        }
    }

    pub fn with_concept_metrics(concept_metrics: Arc<dyn ConceptMetricsSource>) -> Self {
        Self {
            concept_metrics,
            ..Self::new()
        }
    }

    pub fn reset(&mut self) {
        self.claims.clear();
        self.last_processed_event_id = None;
        self.reflection_intents.clear();
        self.contradiction_events.clear();
        self.last_snapshot = None;
        self.pending_tendencies.clear();
        self.pending_gaps.clear();
        self.pending_patterns.clear();
    }

    /// Rebuilds from scratch over an ordered event sequence. Does not emit
    /// `rsm_update` events; use [`Self::observe`] in a loop with a configured
    /// sink for that.
    pub fn rebuild(&mut self, events: &[Event]) {
        self.reset();
        for event in events {
            self.observe_without_emit(event);
        }
        self.recompute_aggregates();
    }

    /// Processes one event incrementally, optionally appending `rsm_update`
    /// to `sink` when the resulting snapshot differs from the last one.
    pub fn observe(&mut self, event: &Event, sink: Option<&dyn EventLog>) -> Result<()> {
        if !self.observe_without_emit(event) {
            return Ok(());
        }
        self.recompute_aggregates();
        self.maybe_emit_rsm_update(sink)
    }

    /// Returns `true` if the event advanced the watermark (i.e. wasn't dropped
    /// as stale or ignored as an `rsm_update`).
    fn observe_without_emit(&mut self, event: &Event) -> bool {
        if event.kind == kinds::RSM_UPDATE {
            return false;
        }
        if let Some(last) = self.last_processed_event_id {
            if event.id <= last {
                return false;
            }
        }
        self.last_processed_event_id = Some(event.id);

        if event.kind == kinds::CLAIM_REGISTER {
            if let Some(obj) = event.content_as_object() {
                if let Some(record) = ClaimRecord::from_json_value(&Value::Object(obj)) {
                    if !record.claim_id.is_empty() {
                        self.claims.insert(record.claim_id.clone(), record);
                    }
                }
            }
        } else if event.kind == kinds::REFLECTION {
            if let Ok(Value::Object(data)) = serde_json::from_str::<Value>(&event.content) {
                if let Some(intent) = data.get("intent").and_then(Value::as_str) {
                    self.reflection_intents.push(intent.to_string());
                }
            }
        }

        true
    }

    fn active_claims(&self) -> Vec<&ClaimRecord> {
        self.claims.values().filter(|c| c.is_active()).collect()
    }

    fn recompute_aggregates(&mut self) {
        let active = self.active_claims();

        let mut type_counts: HashMap<String, usize> = HashMap::new();
        let mut predicate_strengths: HashMap<String, f64> = HashMap::new();

        for claim in &active {
            if !claim.claim_type.is_empty() {
                *type_counts.entry(claim.claim_type.to_lowercase()).or_insert(0) += 1;
            }
            if !claim.predicate.is_empty() {
                *predicate_strengths.entry(claim.predicate.clone()).or_insert(0.0) += claim.strength;
            }
        }

        let mut tendencies: BTreeMap<String, f64> = BTreeMap::new();
        for (type_key, tendency_key) in [
            ("belief", "belief_count"),
            ("value", "value_count"),
            ("tendency", "tendency_count"),
            ("identity", "identity_count"),
        ] {
            if let Some(count) = type_counts.get(type_key) {
                if *count > 0 {
                    tendencies.insert(tendency_key.to_string(), *count as f64);
                }
            }
        }

        for (tendency_key, synonyms) in TENDENCY_PREDICATE_GROUPS {
            let any_present = synonyms.iter().any(|p| predicate_strengths.contains_key(*p));
            if any_present {
                let total: f64 = synonyms
                    .iter()
                    .map(|p| predicate_strengths.get(*p).copied().unwrap_or(0.0))
                    .sum();
                let normalized = (total / (active.len().max(1) as f64)).min(1.0);
                tendencies.insert(tendency_key.to_string(), normalized);
            }
        }

        tendencies.insert("active_claim_count".to_string(), active.len() as f64);

        let mut gaps: Vec<String> = active
            .iter()
            .filter(|c| {
                let p = c.predicate.to_lowercase();
                p.contains("unknown") || p.contains("gap")
            })
            .filter_map(|c| c.object.clone())
            .collect();
        gaps.sort();
        gaps.dedup();

        self.contradiction_events = Self::detect_contradictions(&active);

        let mut patterns = Vec::new();
        if !self.contradiction_events.is_empty() {
            patterns.push(format!("contradictions_detected:{}", self.contradiction_events.len()));
        }
        patterns.sort();

        self.pending_tendencies = tendencies;
        self.pending_gaps = gaps;
        self.pending_patterns = patterns;
    }

    fn detect_contradictions(active: &[&ClaimRecord]) -> Vec<String> {
        let mut groups: HashMap<(String, String), Vec<&ClaimRecord>> = HashMap::new();
        for claim in active {
            groups
                .entry((claim.subject.clone(), claim.predicate.clone()))
                .or_default()
                .push(claim);
        }

        let mut contradictions = Vec::new();
        for claims in groups.values() {
            if claims.len() < 2 {
                continue;
            }
            let distinct: std::collections::HashSet<(Option<String>, bool)> = claims
                .iter()
                .map(|c| (c.object.clone(), c.negated))
                .collect();
            if distinct.len() > 1 {
                contradictions.extend(claims.iter().map(|c| c.claim_id.clone()));
            }
        }
        contradictions.sort();
        contradictions.dedup();
        contradictions
    }

    fn predicate_strengths(&self) -> HashMap<String, f64> {
        let mut strengths: HashMap<String, f64> = HashMap::new();
        for claim in self.claims.values().filter(|c| c.is_active()) {
            if !claim.predicate.is_empty() {
                *strengths.entry(claim.predicate.clone()).or_insert(0.0) += claim.strength;
            }
        }
        strengths
    }

    pub fn snapshot(&self) -> RsmSnapshot {
        let concept_metrics = self.concept_metrics.compute().unwrap_or_default();

        let mut ranked: Vec<(String, f64)> = self.predicate_strengths().into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        let top_tendencies = ranked
            .into_iter()
            .take(10)
            .map(|(predicate, strength)| {
                let sources = self
                    .claims
                    .values()
                    .filter(|c| c.is_active() && c.predicate == predicate)
                    .count();
                TopTendency {
                    predicate,
                    strength: (strength * 100.0).round() / 100.0,
                    sources,
                }
            })
            .collect();

        RsmSnapshot {
            behavioral_tendencies: self.pending_tendencies.clone(),
            knowledge_gaps: self.pending_gaps.clone(),
            interaction_meta_patterns: self.pending_patterns.clone(),
            reflections: self.reflection_intents.clone(),
            concept_metrics,
            active_claim_count: self.active_claims().len(),
            contradiction_events: self.contradiction_events.clone(),
            top_tendencies,
        }
    }

    fn maybe_emit_rsm_update(&mut self, sink: Option<&dyn EventLog>) -> Result<()> {
        let Some(sink) = sink else { return Ok(()) };
        let current = self.snapshot();
        if self.last_snapshot.as_ref() == Some(&current) {
            return Ok(());
        }
        let mut meta = Map::new();
        meta.insert("source".to_string(), Value::String("rsm".to_string()));
        sink.append(kinds::RSM_UPDATE, &canonical_json(&current.to_value()), meta)?;
        self.last_snapshot = Some(current);
        Ok(())
    }

    pub fn knowledge_gap_count(&self) -> usize {
        self.pending_gaps.len()
    }

    pub fn get_claims(&self) -> Vec<&ClaimRecord> {
        self.active_claims()
    }

    pub fn get_claim_by_id(&self, claim_id: &str) -> Option<&ClaimRecord> {
        self.claims.get(claim_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims;
    use crate::storage::{EventLog, InMemoryEventLog};

    fn assistant(log: &InMemoryEventLog, content: &str) -> Event {
        log.append(kinds::ASSISTANT_MESSAGE, content, Map::new()).unwrap()
    }

    #[test]
    fn rebuild_is_deterministic_across_runs() {
        let log = InMemoryEventLog::new();
        assistant(&log, "BELIEF: I am replay-centric");
        assistant(&log, "VALUE: I prioritize stability");
        claims::migrate(&log).unwrap();

        let events = log.read_all().unwrap();
        let mut a = RecursiveSelfModel::new();
        a.rebuild(&events);
        let mut b = RecursiveSelfModel::new();
        b.rebuild(&events);

        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn contradictory_claims_are_flagged() {
        let log = InMemoryEventLog::new();
        let mut meta = Map::new();
        meta.insert("source".to_string(), Value::String("claim_migration".to_string()));

        let claim_a = claims::ClaimRecord {
            claim_id: "a".to_string(),
            source_event_id: 1,
            claim_type: "VALUE".to_string(),
            subject: "self".to_string(),
            predicate: "prioritizes".to_string(),
            object: Some("stability".to_string()),
            raw_text: "x".to_string(),
            negated: false,
            strength: 1.0,
            status: "active".to_string(),
        };
        let mut claim_b = claim_a.clone();
        claim_b.claim_id = "b".to_string();
        claim_b.object = Some("novelty".to_string());

        log.append(kinds::CLAIM_REGISTER, &claim_a.to_canonical_json(), meta.clone())
            .unwrap();
        log.append(kinds::CLAIM_REGISTER, &claim_b.to_canonical_json(), meta)
            .unwrap();

        let mut rsm = RecursiveSelfModel::new();
        rsm.rebuild(&log.read_all().unwrap());
        let snap = rsm.snapshot();
        assert_eq!(snap.contradiction_events, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            snap.interaction_meta_patterns,
            vec!["contradictions_detected:2".to_string()]
        );
    }

    #[test]
    fn emits_rsm_update_only_on_semantic_change() {
        let log = InMemoryEventLog::new();
        let mut rsm = RecursiveSelfModel::new();

        let e1 = assistant(&log, "BELIEF: a");
        rsm.observe(&e1, Some(&log)).unwrap();
        claims::migrate(&log).unwrap();
        for e in log.read_from(e1.id).unwrap() {
            rsm.observe(&e, Some(&log)).unwrap();
        }

        let count_updates = |log: &InMemoryEventLog| {
            log.read_all()
                .unwrap()
                .iter()
                .filter(|e| e.kind == kinds::RSM_UPDATE)
                .count()
        };

        let before = count_updates(&log);
        let stable_event = log.append(kinds::USER_MESSAGE, "hi", Map::new()).unwrap();
        rsm.observe(&stable_event, Some(&log)).unwrap();
        let after = count_updates(&log);

        assert_eq!(before, after, "observing an untracked event emits no rsm_update");
    }

    #[test]
    fn empty_ledger_yields_zero_active_claims() {
        let mut rsm = RecursiveSelfModel::new();
        rsm.rebuild(&[]);
        assert_eq!(rsm.snapshot().active_claim_count, 0);
    }

    #[test]
    fn determinism_emphasis_averages_synonym_strengths() {
        let log = InMemoryEventLog::new();
        let base = claims::ClaimRecord {
            claim_id: "a".to_string(),
            source_event_id: 1,
            claim_type: "TENDENCY".to_string(),
            subject: "self".to_string(),
            predicate: "is_deterministic".to_string(),
            object: None,
            raw_text: "x".to_string(),
            negated: false,
            strength: 1.0,
            status: "active".to_string(),
        };
        let mut second = base.clone();
        second.claim_id = "b".to_string();
        second.strength = 0.5;

        log.append(kinds::CLAIM_REGISTER, &base.to_canonical_json(), Map::new())
            .unwrap();
        log.append(kinds::CLAIM_REGISTER, &second.to_canonical_json(), Map::new())
            .unwrap();

        let mut rsm = RecursiveSelfModel::new();
        rsm.rebuild(&log.read_all().unwrap());
        let snap = rsm.snapshot();
        assert_eq!(snap.behavioral_tendencies.get("determinism_emphasis"), Some(&0.75));
        assert_eq!(snap.top_tendencies[0].predicate, "is_deterministic");
        assert_eq!(snap.top_tendencies[0].strength, 1.5);
        assert_eq!(snap.top_tendencies[0].sources, 2);
    }
}
