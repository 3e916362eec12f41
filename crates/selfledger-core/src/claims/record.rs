use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The recognized claim-line prefixes, in the order they are checked.
pub const CLAIM_PREFIXES: &[(&str, &str)] = &[
    ("CLAIM:", "CLAIM"),
    ("BELIEF:", "BELIEF"),
    ("VALUE:", "VALUE"),
    ("TENDENCY:", "TENDENCY"),
    ("IDENTITY:", "IDENTITY"),
    ("ONTOLOGY:", "ONTOLOGY"),
];

/// A structured self-model assertion extracted from an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claim_id: String,
    pub source_event_id: i64,
    #[serde(rename = "type")]
    pub claim_type: String,
    pub subject: String,
    pub predicate: String,
    pub object: Option<String>,
    pub raw_text: String,
    #[serde(default)]
    pub negated: bool,
    pub strength: f64,
    pub status: String,
}

impl ClaimRecord {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// Serializes the record through the canonical encoder (sorted keys,
    /// minimal separators) so it can be written as `claim_register` content.
    pub fn to_canonical_json(&self) -> String {
        let value = serde_json::to_value(self).expect("ClaimRecord always serializes");
        crate::hashing::canonical_json(&value)
    }

    /// Parses a `claim_register` event's content back into a record. Every
    /// field but `claim_id` and `source_event_id` degrades to a default
    /// rather than failing the whole record, matching the tolerance
    /// `extract` applies when building a record from scratch. Returns `None`
    /// only when the value isn't an object or is missing its identity
    /// fields; callers treat that the same as "no claim here" rather than
    /// an error.
    pub fn from_json_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let claim_id = obj.get("claim_id").and_then(Value::as_str)?.to_string();
        let source_event_id = obj.get("source_event_id").and_then(Value::as_i64)?;

        let claim_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("CLAIM")
            .to_string();
        let subject = obj.get("subject").and_then(Value::as_str).unwrap_or("self").to_string();
        let predicate = obj.get("predicate").and_then(Value::as_str).unwrap_or("").to_string();
        let object = obj.get("object").and_then(Value::as_str).map(str::to_string);
        let raw_text = obj.get("raw_text").and_then(Value::as_str).unwrap_or("").to_string();
        let negated = obj.get("negated").and_then(Value::as_bool).unwrap_or(false);
        let strength = super::extractor::normalize_strength(obj.get("strength"));
        let status = obj.get("status").and_then(Value::as_str).unwrap_or("active").to_string();

        Some(Self {
            claim_id,
            source_event_id,
            claim_type,
            subject,
            predicate,
            object,
            raw_text,
            negated,
            strength,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_canonical_json() {
        let record = ClaimRecord {
            claim_id: "abc123".to_string(),
            source_event_id: 1,
            claim_type: "BELIEF".to_string(),
            subject: "self".to_string(),
            predicate: "is".to_string(),
            object: Some("replay-centric".to_string()),
            raw_text: "BELIEF: is replay-centric".to_string(),
            negated: false,
            strength: 1.0,
            status: "active".to_string(),
        };
        let json = record.to_canonical_json();
        let value: Value = serde_json::from_str(&json).unwrap();
        let restored = ClaimRecord::from_json_value(&value).unwrap();
        assert_eq!(record, restored);
    }

    #[test]
    fn missing_non_identity_fields_fall_back_to_defaults() {
        let value = serde_json::json!({
            "claim_id": "abc123",
            "source_event_id": 7,
            "strength": "not-a-number",
        });
        let record = ClaimRecord::from_json_value(&value).unwrap();
        assert_eq!(record.claim_type, "CLAIM");
        assert_eq!(record.subject, "self");
        assert_eq!(record.predicate, "");
        assert_eq!(record.object, None);
        assert!(!record.negated);
        assert_eq!(record.strength, 1.0);
        assert_eq!(record.status, "active");
    }

    #[test]
    fn missing_identity_fields_yield_none() {
        assert!(ClaimRecord::from_json_value(&serde_json::json!({"subject": "self"})).is_none());
        assert!(ClaimRecord::from_json_value(&serde_json::json!("not an object")).is_none());
    }
}
