//! Intent and entity extraction
//!
//! Flattens the `parameters` tree of a query result into dotted entity
//! names: nested objects join keys with `.`, list items use their index.

use parley::{Nlp, NlpEntity, NlpIntent};
use serde_json::{Map, Value};

use crate::wire::QueryResult;

/// Intent annotation for a query result
pub fn extract_intent(result: &QueryResult, fallback_intents: &[String]) -> NlpIntent {
    match &result.intent {
        Some(intent) => NlpIntent {
            name: Some(intent.display_name.clone()).filter(|n| !n.is_empty()),
            confidence: result.intent_detection_confidence,
            incomprehension: fallback_intents.iter().any(|f| *f == intent.display_name),
        },
        None => NlpIntent::default(),
    }
}

/// Entities for a query result, in response order
pub fn extract_entities(result: &QueryResult) -> Vec<NlpEntity> {
    match &result.parameters {
        Some(fields) => flatten_fields("", fields),
        None => Vec::new(),
    }
}

/// Intent and entities together
pub fn extract_nlp(result: &QueryResult, fallback_intents: &[String]) -> Nlp {
    Nlp {
        intent: extract_intent(result, fallback_intents),
        entities: extract_entities(result),
    }
}

fn flatten_fields(prefix: &str, fields: &Map<String, Value>) -> Vec<NlpEntity> {
    fields
        .iter()
        .flat_map(|(key, value)| flatten_value(join_key(prefix, key), value))
        .collect()
}

fn flatten_value(key: String, value: &Value) -> Vec<NlpEntity> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            vec![NlpEntity::new(key, value.clone())]
        }
        Value::Object(fields) => flatten_fields(&key, fields),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| flatten_value(join_key(&key, &i.to_string()), item))
            .collect(),
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
