//! Capabilities - connector configuration supplied by the test harness
//!
//! Values may arrive as native JSON (from config files) or as strings
//! (from environment variables), so every typed accessor accepts both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::errors::ConnectorError;

/// String-keyed capability map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<String, Value>);

impl Capabilities {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Collect capabilities from `(key, value)` pairs whose key starts with `prefix`
    pub fn from_vars<I, K, V>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Self(map)
    }

    /// Collect capabilities from the process environment
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(std::env::vars(), prefix)
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Overlay `other` on top of `self`; keys in `other` win
    pub fn merge(&mut self, other: Capabilities) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys starting with `prefix`, in sorted order
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .range(prefix.to_string()..)
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    /// Non-empty string value; numbers are rendered as strings
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConnectorError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "" => Ok(None),
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                other => Err(ConnectorError::invalid_capability(
                    key,
                    format!("expected a boolean, got '{}'", other),
                )),
            },
            Some(other) => Err(ConnectorError::invalid_capability(
                key,
                format!("expected a boolean, got {}", other),
            )),
        }
    }

    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, ConnectorError> {
        let invalid = |got: &dyn std::fmt::Display| {
            ConnectorError::invalid_capability(
                key,
                format!("expected a non-negative integer, got '{}'", got),
            )
        };

        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| invalid(n)),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid(s)),
            Some(other) => Err(invalid(other)),
        }
    }

    /// JSON object value; strings are parsed as JSON
    pub fn get_object(&self, key: &str) -> Result<Option<Map<String, Value>>, ConnectorError> {
        let value = match self.0.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => serde_json::from_str::<Value>(s).map_err(|e| {
                ConnectorError::invalid_capability(key, format!("not valid JSON: {}", e))
            })?,
            Some(other) => other.clone(),
        };

        match value {
            Value::Object(map) => Ok(Some(map)),
            other => Err(ConnectorError::invalid_capability(
                key,
                format!("expected a JSON object, got {}", other),
            )),
        }
    }

    /// List of strings; strings are parsed as a JSON array or split on commas
    pub fn get_list(&self, key: &str) -> Result<Option<Vec<String>>, ConnectorError> {
        let to_strings = |items: Vec<Value>| -> Result<Vec<String>, ConnectorError> {
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(ConnectorError::invalid_capability(
                        key,
                        format!("expected a list of strings, found {}", other),
                    )),
                })
                .collect()
        };

        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => to_strings(items.clone()).map(Some),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Array(items)) => to_strings(items).map(Some),
                _ => Ok(Some(
                    s.split(',')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect(),
                )),
            },
            Some(other) => Err(ConnectorError::invalid_capability(
                key,
                format!("expected a list of strings, got {}", other),
            )),
        }
    }
}

impl FromIterator<(String, Value)> for Capabilities {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors_accept_strings() {
        let caps = Capabilities::new()
            .with("FLAG", "true")
            .with("COUNT", "5")
            .with("OBJ", r#"{"a": 1}"#)
            .with("LIST", "one, two");

        assert_eq!(caps.get_bool("FLAG").unwrap(), Some(true));
        assert_eq!(caps.get_u32("COUNT").unwrap(), Some(5));
        assert_eq!(caps.get_object("OBJ").unwrap().unwrap()["a"], 1);
        assert_eq!(
            caps.get_list("LIST").unwrap(),
            Some(vec!["one".to_string(), "two".to_string()])
        );
    }

    #[test]
    fn test_typed_accessors_accept_native_json() {
        let caps = Capabilities::new()
            .with("FLAG", false)
            .with("COUNT", 7)
            .with("OBJ", json!({ "b": true }))
            .with("LIST", json!(["x"]));

        assert_eq!(caps.get_bool("FLAG").unwrap(), Some(false));
        assert_eq!(caps.get_u32("COUNT").unwrap(), Some(7));
        assert_eq!(caps.get_object("OBJ").unwrap().unwrap()["b"], true);
        assert_eq!(caps.get_list("LIST").unwrap(), Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let caps = Capabilities::new()
            .with("FLAG", "maybe")
            .with("COUNT", -1)
            .with("OBJ", "[1, 2]");

        assert!(caps.get_bool("FLAG").is_err());
        assert!(caps.get_u32("COUNT").is_err());
        assert!(caps.get_object("OBJ").is_err());
    }

    #[test]
    fn test_missing_and_blank_values() {
        let caps = Capabilities::new().with("BLANK", "  ");

        assert_eq!(caps.get_str("BLANK"), None);
        assert_eq!(caps.get_str("MISSING"), None);
        assert_eq!(caps.get_bool("BLANK").unwrap(), None);
        assert_eq!(caps.get_u32("MISSING").unwrap(), None);
    }

    #[test]
    fn test_keys_with_prefix() {
        let caps = Capabilities::new()
            .with("A_NAME", "x")
            .with("A_NAME_1", "y")
            .with("A_OTHER", "z")
            .with("B_NAME", "w");

        let keys: Vec<&str> = caps.keys_with_prefix("A_NAME").collect();
        assert_eq!(keys, vec!["A_NAME", "A_NAME_1"]);
    }

    #[test]
    fn test_from_vars_filters_prefix_and_merge_overrides() {
        let mut caps = Capabilities::new().with("DIALOGFLOW_PROJECT_ID", "from-file");
        let env = Capabilities::from_vars(
            vec![
                ("DIALOGFLOW_PROJECT_ID", "from-env"),
                ("HOME", "/root"),
            ],
            "DIALOGFLOW_",
        );
        caps.merge(env);

        assert_eq!(caps.len(), 1);
        assert_eq!(caps.get_str("DIALOGFLOW_PROJECT_ID").as_deref(), Some("from-env"));
    }
}
