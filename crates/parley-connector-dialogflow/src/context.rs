//! Dialogflow contexts
//!
//! Named, lifespan-bearing pieces of conversation state sent with every
//! query. The active set is ordered and keyed by short name.

use parley::ConnectorError;
use serde_json::{Map, Value};

use crate::wire::WireContext;

/// Lifespan Dialogflow assigns when none is given
pub const DEFAULT_LIFESPAN: u32 = 5;

/// A single context record
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Short name (the last segment of the resource name)
    pub name: String,
    /// Number of turns the context stays active
    pub lifespan: u32,
    pub parameters: Option<Map<String, Value>>,
}

impl Context {
    /// Create a context; full resource names are reduced to the short name
    pub fn new(name: impl AsRef<str>, lifespan: u32) -> Self {
        Self {
            name: short_name(name.as_ref()).to_string(),
            lifespan,
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Render with the full session-scoped resource name
    pub fn to_wire(&self, session_path: &str) -> WireContext {
        WireContext {
            name: format!("{}/contexts/{}", session_path, self.name),
            lifespan_count: Some(self.lifespan),
            parameters: self.parameters.clone(),
        }
    }
}

impl From<&WireContext> for Context {
    fn from(wire: &WireContext) -> Self {
        Self {
            name: short_name(&wire.name).to_string(),
            lifespan: wire.lifespan_count.unwrap_or(0),
            parameters: wire.parameters.clone(),
        }
    }
}

/// `projects/p/agent/sessions/s/contexts/booking` → `booking`
pub fn short_name(name: &str) -> &str {
    name.rsplit_once("/contexts/")
        .map(|(_, short)| short)
        .unwrap_or(name)
}

/// Ordered collection of contexts keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSet {
    contexts: Vec<Context>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the same-named context in place, or append a new one.
    /// Returns `true` when an existing context was replaced.
    pub fn upsert(&mut self, context: Context) -> bool {
        match self.contexts.iter_mut().find(|c| c.name == context.name) {
            Some(existing) => {
                *existing = context;
                true
            }
            None => {
                self.contexts.push(context);
                false
            }
        }
    }

    pub fn merge<I: IntoIterator<Item = Context>>(&mut self, contexts: I) {
        for context in contexts {
            self.upsert(context);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Context> {
        let name = short_name(name);
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn to_wire(&self, session_path: &str) -> Vec<WireContext> {
        self.contexts
            .iter()
            .map(|c| c.to_wire(session_path))
            .collect()
    }
}

impl FromIterator<Context> for ContextSet {
    fn from_iter<T: IntoIterator<Item = Context>>(iter: T) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

/// Parse a per-turn context update.
///
/// Accepts an object mapping context names to either a lifespan
/// (`{"booking": 3}`) or a record
/// (`{"booking": {"lifespan": 3, "parameters": {...}}}`).
pub fn parse_context_updates(value: &Value) -> Result<Vec<Context>, ConnectorError> {
    let invalid =
        |msg: String| ConnectorError::Validation(format!("Invalid context update: {msg}"));

    let entries = value
        .as_object()
        .ok_or_else(|| invalid(format!("expected an object, got {value}")))?;

    entries
        .iter()
        .map(|(name, spec)| {
            let (lifespan, parameters) = match spec {
                Value::Object(record) => {
                    let raw_lifespan =
                        record.get("lifespan").or_else(|| record.get("lifespanCount"));
                    let lifespan = match raw_lifespan {
                        None | Some(Value::Null) => DEFAULT_LIFESPAN,
                        Some(v) => parse_lifespan(v).ok_or_else(|| {
                            invalid(format!("lifespan of '{name}' is not a number"))
                        })?,
                    };
                    let parameters = match record.get("parameters") {
                        None | Some(Value::Null) => None,
                        Some(Value::Object(map)) => Some(map.clone()),
                        Some(_) => {
                            return Err(invalid(format!(
                                "parameters of '{name}' must be an object"
                            )))
                        }
                    };
                    (lifespan, parameters)
                }
                other => {
                    let lifespan = parse_lifespan(other)
                        .ok_or_else(|| invalid(format!("lifespan of '{name}' is not a number")))?;
                    (lifespan, None)
                }
            };

            let mut context = Context::new(name, lifespan);
            context.parameters = parameters;
            Ok(context)
        })
        .collect()
}

fn parse_lifespan(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_replaces_same_name_and_appends_new() {
        let mut set: ContextSet = vec![Context::new("a", 1), Context::new("b", 2)]
            .into_iter()
            .collect();

        assert!(set.upsert(Context::new("a", 9)));
        assert!(!set.upsert(Context::new("c", 3)));

        let names: Vec<(&str, u32)> = set.iter().map(|c| (c.name.as_str(), c.lifespan)).collect();
        assert_eq!(names, vec![("a", 9), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn test_full_and_short_names_address_same_context() {
        let mut set = ContextSet::new();
        set.upsert(Context::new("booking", 1));
        set.upsert(Context::new("projects/p/agent/sessions/s/contexts/booking", 4));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("booking").map(|c| c.lifespan), Some(4));
    }

    #[test]
    fn test_to_wire_uses_session_path() {
        let params = json!({ "guests": 4 }).as_object().cloned().unwrap();
        let context = Context::new("booking", 2).with_parameters(params);

        let wire = context.to_wire("projects/p/agent/sessions/s1");
        assert_eq!(wire.name, "projects/p/agent/sessions/s1/contexts/booking");
        assert_eq!(wire.lifespan_count, Some(2));
        assert_eq!(wire.parameters.unwrap()["guests"], 4);

        assert_eq!(Context::from(&context.to_wire("x")), context);
    }

    #[test]
    fn test_parse_context_updates() {
        let updates = parse_context_updates(&json!({
            "short": 2,
            "stringly": "3",
            "full": { "lifespan": 4, "parameters": { "city": "Vienna" } },
            "defaulted": {}
        }))
        .unwrap();

        let by_name = |n: &str| updates.iter().find(|c| c.name == n).unwrap();
        assert_eq!(by_name("short").lifespan, 2);
        assert_eq!(by_name("stringly").lifespan, 3);
        assert_eq!(by_name("full").parameters.as_ref().unwrap()["city"], "Vienna");
        assert_eq!(by_name("defaulted").lifespan, DEFAULT_LIFESPAN);
    }

    #[test]
    fn test_parse_context_updates_rejects_garbage() {
        assert!(parse_context_updates(&json!(["a"])).is_err());
        assert!(parse_context_updates(&json!({ "a": "soon" })).is_err());
        assert!(parse_context_updates(&json!({ "a": { "parameters": 1 } })).is_err());
    }
}
