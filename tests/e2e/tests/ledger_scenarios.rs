use selfledger_core::{
    claim_id, kinds, ActorDenylistPolicy, ClaimRecord, EventLog, InMemoryEventLog, LedgerError,
    Mirror, RecursiveSelfModel, SqliteEventLog,
};
use serde_json::Map;
use std::sync::Arc;

fn claim_fixture(claim_id: &str, predicate: &str, object: Option<&str>, strength: f64) -> ClaimRecord {
    ClaimRecord {
        claim_id: claim_id.to_string(),
        source_event_id: 0,
        claim_type: "VALUE".to_string(),
        subject: "self".to_string(),
        predicate: predicate.to_string(),
        object: object.map(str::to_string),
        raw_text: format!("{predicate} {object:?}"),
        negated: false,
        strength,
        status: "active".to_string(),
    }
}

#[test]
fn scenario_1_single_belief_claim_extraction() {
    let log = InMemoryEventLog::new();
    let event = log
        .append(kinds::ASSISTANT_MESSAGE, "BELIEF: I am replay-centric", Map::new())
        .unwrap();

    let claims = selfledger_core::extract(&event);
    assert_eq!(claims.len(), 1);
    let claim = &claims[0];
    assert_eq!(claim.claim_type, "BELIEF");
    assert_eq!(claim.subject, "self");
    assert_eq!(claim.predicate, "I am replay-centric");
    assert!(claim.object.is_none());
    assert_eq!(claim.strength, 1.0);
    assert_eq!(claim.claim_id, claim_id(event.id, "BELIEF: I am replay-centric"));
    assert_eq!(claim.claim_id.len(), 16);
}

#[test]
fn scenario_2_contradiction_detection_via_rsm() {
    let log = InMemoryEventLog::new();

    let claim_a = claim_fixture("claim-a", "prioritizes", Some("stability"), 1.0);
    let claim_b = claim_fixture("claim-b", "prioritizes", Some("novelty"), 1.0);
    log.append(kinds::CLAIM_REGISTER, &claim_a.to_canonical_json(), Map::new())
        .unwrap();
    log.append(kinds::CLAIM_REGISTER, &claim_b.to_canonical_json(), Map::new())
        .unwrap();

    let mut rsm = RecursiveSelfModel::new();
    rsm.rebuild(&log.read_all().unwrap());
    let snapshot = rsm.snapshot();

    assert_eq!(snapshot.contradiction_events.len(), 2);
    assert!(snapshot
        .interaction_meta_patterns
        .contains(&"contradictions_detected:2".to_string()));
}

#[test]
fn scenario_3_migration_is_idempotent_under_duplicate_injection() {
    let log = InMemoryEventLog::new();
    for i in 0..50 {
        log.append(
            kinds::ASSISTANT_MESSAGE,
            &format!("BELIEF: fact number {i}"),
            Map::new(),
        )
        .unwrap();
    }

    let migrated = selfledger_core::migrate(&log).unwrap();
    assert_eq!(migrated, 50);

    let all = log.read_all().unwrap();
    let first_register = all
        .iter()
        .find(|e| e.kind == kinds::CLAIM_REGISTER)
        .unwrap()
        .clone();
    log.append(kinds::CLAIM_REGISTER, &first_register.content, Map::new())
        .unwrap();

    let migrated_again = selfledger_core::migrate(&log).unwrap();
    assert_eq!(migrated_again, 0);

    let distinct_ids: std::collections::HashSet<String> = log
        .read_all()
        .unwrap()
        .iter()
        .filter(|e| e.kind == kinds::CLAIM_REGISTER)
        .filter_map(|e| e.content_as_object())
        .filter_map(|obj| obj.get("claim_id").and_then(|v| v.as_str()).map(str::to_string))
        .collect();
    assert_eq!(distinct_ids.len(), 50);
}

#[test]
fn scenario_4_commitment_thread_ordering() {
    let log = InMemoryEventLog::new();
    log.append(kinds::USER_MESSAGE, "please ship this", Map::new()).unwrap();
    let assistant = log
        .append(kinds::ASSISTANT_MESSAGE, "ok\nCOMMIT: ship it", Map::new())
        .unwrap();

    let mut open_meta = Map::new();
    open_meta.insert("cid".into(), "task1".into());
    open_meta.insert("text".into(), "ship it".into());
    let open = log.append(kinds::COMMITMENT_OPEN, "", open_meta).unwrap();

    let mut close_meta = Map::new();
    close_meta.insert("cid".into(), "task1".into());
    let close = log.append(kinds::COMMITMENT_CLOSE, "", close_meta).unwrap();

    let graph = selfledger_core::MemeGraph::new();
    graph.rebuild(&log.read_all().unwrap());
    let thread = graph.thread_for_cid("task1");
    assert_eq!(thread, vec![assistant.id, open.id, close.id]);
}

#[test]
fn scenario_5_tendency_averaging_and_top_tendencies() {
    let log = InMemoryEventLog::new();

    for (i, strength) in [1.0, 0.5].into_iter().enumerate() {
        let claim = claim_fixture(&format!("claim-{i}"), "is_deterministic", None, strength);
        log.append(kinds::CLAIM_REGISTER, &claim.to_canonical_json(), Map::new())
            .unwrap();
    }

    let mut rsm = RecursiveSelfModel::new();
    rsm.rebuild(&log.read_all().unwrap());
    let snapshot = rsm.snapshot();
    let top = &snapshot.top_tendencies[0];
    assert_eq!(top.predicate, "is_deterministic");
    assert!((top.strength - 1.5).abs() < 1e-9);
    assert_eq!(top.sources, 2);
    assert!(
        (snapshot.behavioral_tendencies.get("determinism_emphasis").copied().unwrap() - 0.75).abs()
            < 1e-9
    );
}

#[test]
fn scenario_6_rsm_update_emitted_only_on_semantic_change() {
    let log = InMemoryEventLog::new();
    let mut rsm = RecursiveSelfModel::new();

    let event = log
        .append(kinds::ASSISTANT_MESSAGE, "BELIEF: something new", Map::new())
        .unwrap();
    rsm.observe(&event, Some(&log)).unwrap();
    let after_first = log.read_all().unwrap();
    let updates_after_first = after_first.iter().filter(|e| e.kind == kinds::RSM_UPDATE).count();
    assert_eq!(updates_after_first, 1);

    let stable_event = log.append(kinds::USER_MESSAGE, "just chatting", Map::new()).unwrap();
    rsm.observe(&stable_event, Some(&log)).unwrap();
    let after_second = log.read_all().unwrap();
    let updates_after_second = after_second.iter().filter(|e| e.kind == kinds::RSM_UPDATE).count();
    assert_eq!(updates_after_second, 1);
}

#[test]
fn scenario_7_sqlite_round_trip_verifies_hash_chain() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger.db");

    let appended = {
        let log = SqliteEventLog::new(Some(db_path.clone())).unwrap();
        let mut events = Vec::new();
        for i in 0..5 {
            events.push(log.append(kinds::USER_MESSAGE, &format!("msg {i}"), Map::new()).unwrap());
        }
        events
    };

    let reopened = SqliteEventLog::new(Some(db_path)).unwrap();
    let replayed = reopened.read_all().unwrap();

    assert_eq!(replayed, appended);

    let mut prev_hash: Option<String> = None;
    for event in &replayed {
        assert_eq!(event.prev_hash, prev_hash);
        prev_hash = Some(event.hash.clone());
    }
}

#[test]
fn scenario_8_write_policy_denies_then_allows() {
    let log = InMemoryEventLog::new();
    let policy = ActorDenylistPolicy::new(vec!["cli".to_string()]);
    log.set_policy(Arc::new(policy));

    let mut denied_meta = Map::new();
    denied_meta.insert("source".into(), "cli".into());
    let result = log.append(kinds::CONFIG, "{}", denied_meta);
    assert!(matches!(result, Err(LedgerError::Policy(_))));
    assert!(log.read_all().unwrap().is_empty());

    let mut allowed_meta = Map::new();
    allowed_meta.insert("source".into(), "system".into());
    let result = log.append(kinds::CONFIG, "{}", allowed_meta);
    assert!(result.is_ok());
    assert_eq!(log.read_all().unwrap().len(), 1);
}

#[test]
fn mirror_from_log_matches_rsm_rebuild() {
    let log = InMemoryEventLog::new();
    log.append(kinds::ASSISTANT_MESSAGE, "BELIEF: consistency matters", Map::new())
        .unwrap();

    let mirror = Mirror::from_log(&log).unwrap();
    let mut rsm = RecursiveSelfModel::new();
    rsm.rebuild(&log.read_all().unwrap());

    assert_eq!(mirror.rsm_snapshot(), rsm.snapshot());
}
