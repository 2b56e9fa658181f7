//! NLP Annotations
//!
//! Intent and entity information reported alongside a bot message.

use serde::{Deserialize, Serialize};

/// Intent recognized for the user turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlpIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Set when the intent is a fallback ("didn't understand") intent
    #[serde(default)]
    pub incomprehension: bool,
}

/// A single extracted entity value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpEntity {
    /// Dotted path of the parameter (e.g. `address.city`, `colors.0`)
    pub name: String,
    pub value: serde_json::Value,
}

impl NlpEntity {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// NLP annotations for a bot message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nlp {
    pub intent: NlpIntent,
    #[serde(default)]
    pub entities: Vec<NlpEntity>,
}

impl Nlp {
    /// Look up an entity value by its dotted name
    pub fn entity(&self, name: &str) -> Option<&serde_json::Value> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }
}
