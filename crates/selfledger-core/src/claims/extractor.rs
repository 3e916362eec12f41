//! Deterministic structured claim extraction from `assistant_message` events.
//!
//! Pure function, no state, no randomness, no model calls. A line is a claim
//! iff it starts with one of [`super::record::CLAIM_PREFIXES`]; the remainder
//! is either a structured JSON object or stored verbatim as the predicate. No
//! keyword heuristics are ever applied to free text.

use serde_json::Value;

use crate::event::{kinds, Event};
use crate::hashing::claim_id;

use super::record::{ClaimRecord, CLAIM_PREFIXES};

/// Extracts every claim line in `event.content`, in order. Empty unless
/// `event.kind == "assistant_message"`.
pub fn extract(event: &Event) -> Vec<ClaimRecord> {
    if event.kind != kinds::ASSISTANT_MESSAGE {
        return Vec::new();
    }

    event
        .content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| parse_claim_line(line, event.id))
        .collect()
}

fn parse_claim_line(line: &str, source_event_id: i64) -> Option<ClaimRecord> {
    let (claim_type, remainder) = CLAIM_PREFIXES
        .iter()
        .find_map(|(prefix, ctype)| line.strip_prefix(prefix).map(|rest| (*ctype, rest.trim())))?;

    if remainder.is_empty() {
        return None;
    }

    if remainder.starts_with('{') {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(remainder) {
            return Some(build_from_json(&obj, line, source_event_id, claim_type));
        }
    }

    Some(build_from_text(remainder, line, source_event_id, claim_type))
}

fn build_from_json(
    obj: &serde_json::Map<String, Value>,
    raw_text: &str,
    source_event_id: i64,
    default_type: &str,
) -> ClaimRecord {
    let claim_type = obj
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(default_type)
        .to_string();
    let subject = obj
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or("self")
        .to_string();
    let predicate = obj
        .get("predicate")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let object = obj.get("object").and_then(Value::as_str).map(str::to_string);
    let negated = obj.get("negated").and_then(Value::as_bool).unwrap_or(false);
    let strength = normalize_strength(obj.get("strength"));

    ClaimRecord {
        claim_id: claim_id(source_event_id, raw_text),
        source_event_id,
        claim_type,
        subject,
        predicate,
        object,
        raw_text: raw_text.to_string(),
        negated,
        strength,
        status: "active".to_string(),
    }
}

fn build_from_text(text: &str, raw_text: &str, source_event_id: i64, claim_type: &str) -> ClaimRecord {
    ClaimRecord {
        claim_id: claim_id(source_event_id, raw_text),
        source_event_id,
        claim_type: claim_type.to_string(),
        subject: "self".to_string(),
        predicate: text.to_string(),
        object: None,
        raw_text: raw_text.to_string(),
        negated: false,
        strength: 1.0,
        status: "active".to_string(),
    }
}

pub(super) fn normalize_strength(value: Option<&Value>) -> f64 {
    let parsed = value.and_then(|v| {
        if let Some(n) = v.as_f64() {
            Some(n)
        } else {
            v.as_str().and_then(|s| s.parse::<f64>().ok())
        }
    });
    match parsed {
        Some(n) => n.clamp(0.0, 1.0),
        None => 1.0,
    }
}

/// Returns the ids of `claims` that contradict `new_claim`: same
/// `(subject, predicate)`, differing `(object, negated)`. Only active claims
/// are considered; an empty subject or predicate on `new_claim` yields no
/// contradictions.
pub fn detect_contradictions<'a>(
    claims: impl IntoIterator<Item = &'a ClaimRecord>,
    new_claim: &ClaimRecord,
) -> Vec<String> {
    if new_claim.subject.is_empty() || new_claim.predicate.is_empty() {
        return Vec::new();
    }

    claims
        .into_iter()
        .filter(|c| c.is_active())
        .filter(|c| c.subject == new_claim.subject && c.predicate == new_claim.predicate)
        .filter(|c| c.object != new_claim.object || c.negated != new_claim.negated)
        .map(|c| c.claim_id.clone())
        .collect()
}
