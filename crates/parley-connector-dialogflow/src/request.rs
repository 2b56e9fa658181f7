//! Request building
//!
//! Assembles a `detectIntent` request from a user turn and the session's
//! active contexts.

use base64::Engine;
use parley::{ConnectorError, UserMessage};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{DialogflowConfig, SET_DIALOGFLOW_QUERYPARAMS};
use crate::context::{Context, ContextSet};
use crate::wire::{
    DetectIntentRequest, EventInput, InputAudioConfig, OutputAudioConfig, QueryInput,
    QueryParameters, TextInput, WireContext,
};

const OUTPUT_AUDIO_ENCODING: &str = "OUTPUT_AUDIO_ENCODING_LINEAR_16";

/// Session state a request is built against
#[derive(Debug, Clone, Copy)]
pub struct SessionState<'a> {
    pub session_path: &'a str,
    pub contexts: &'a ContextSet,
    pub knowledge_base_names: &'a [String],
}

/// Build the request for one user turn
pub fn build_request(
    config: &DialogflowConfig,
    session: SessionState<'_>,
    message: &UserMessage,
) -> Result<DetectIntentRequest, ConnectorError> {
    let (query_input, input_audio) = build_query_input(config, message)?;
    let query_params = build_query_params(config, session, message)?;

    Ok(DetectIntentRequest {
        query_input,
        query_params,
        input_audio,
        output_audio_config: config.output_audio.then(|| OutputAudioConfig {
            audio_encoding: OUTPUT_AUDIO_ENCODING.to_string(),
        }),
    })
}

/// Button event, then audio, then text
fn build_query_input(
    config: &DialogflowConfig,
    message: &UserMessage,
) -> Result<(QueryInput, Option<String>), ConnectorError> {
    if config.button_events {
        let clicked = message
            .buttons
            .first()
            .and_then(|b| b.payload.as_deref().or(b.text.as_deref()))
            .filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = clicked {
            let event = event_input(raw, &config.language_code)?;
            debug!(event = %event.name, "Sending button as event");
            return Ok((
                QueryInput {
                    event: Some(event),
                    ..Default::default()
                },
                None,
            ));
        }
    }

    let audio = message.media.iter().find(|m| {
        m.buffer.is_some()
            && m.mime_type
                .as_deref()
                .map_or(true, |mime| mime.starts_with("audio/"))
    });
    if let Some(buffer) = audio.and_then(|m| m.buffer.as_ref()) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(buffer);
        return Ok((
            QueryInput {
                audio_config: Some(InputAudioConfig {
                    audio_encoding: config.audio_input.encoding.clone(),
                    sample_rate_hertz: config.audio_input.sample_rate_hertz,
                    language_code: config.language_code.clone(),
                }),
                ..Default::default()
            },
            Some(encoded),
        ));
    }

    let text = message
        .message_text
        .clone()
        .or_else(|| message.buttons.first().and_then(|b| b.text.clone()))
        .ok_or_else(|| {
            ConnectorError::Validation(
                "User message has no text, button or audio to send".to_string(),
            )
        })?;

    Ok((
        QueryInput {
            text: Some(TextInput {
                text,
                language_code: config.language_code.clone(),
            }),
            ..Default::default()
        },
        None,
    ))
}

/// A button payload is either a JSON event object
/// (`{"name": "...", "parameters": {...}}`) or a plain event name
fn event_input(raw: &str, language_code: &str) -> Result<EventInput, ConnectorError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(event)) => {
            let name = event
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    ConnectorError::Validation(format!("Button event payload has no name: {raw}"))
                })?;

            Ok(EventInput {
                name: name.to_string(),
                parameters: event.get("parameters").and_then(Value::as_object).cloned(),
                language_code: event
                    .get("languageCode")
                    .and_then(Value::as_str)
                    .unwrap_or(language_code)
                    .to_string(),
            })
        }
        _ => Ok(EventInput {
            name: raw.trim().to_string(),
            parameters: None,
            language_code: language_code.to_string(),
        }),
    }
}

fn build_query_params(
    config: &DialogflowConfig,
    session: SessionState<'_>,
    message: &UserMessage,
) -> Result<Option<QueryParameters>, ConnectorError> {
    let mut extra = config.query_params.clone();
    match message.custom.get(SET_DIALOGFLOW_QUERYPARAMS) {
        None | Some(Value::Null) => {}
        Some(Value::Object(turn)) => merge_json(&mut extra, turn),
        Some(other) => {
            return Err(ConnectorError::Validation(format!(
                "{} must be an object, got {}",
                SET_DIALOGFLOW_QUERYPARAMS, other
            )))
        }
    }

    // Contexts given as raw query params form the base; active contexts win
    let mut contexts = ContextSet::new();
    if let Some(raw) = extra.remove("contexts") {
        let wire: Vec<WireContext> = serde_json::from_value(raw).map_err(|e| {
            ConnectorError::Validation(format!("Invalid contexts in query params: {e}"))
        })?;
        contexts.merge(wire.iter().map(Context::from));
    }
    contexts.merge(session.contexts.iter().cloned());

    let mut knowledge_base_names = session.knowledge_base_names.to_vec();
    if let Some(raw) = extra.remove("knowledgeBaseNames") {
        if knowledge_base_names.is_empty() {
            knowledge_base_names = serde_json::from_value(raw).map_err(|e| {
                ConnectorError::Validation(format!(
                    "Invalid knowledgeBaseNames in query params: {e}"
                ))
            })?;
        } else {
            warn!("Ignoring knowledgeBaseNames query param, knowledge bases are configured");
        }
    }

    let params = QueryParameters {
        contexts: contexts.to_wire(session.session_path),
        knowledge_base_names,
        extra,
    };

    if params == QueryParameters::default() {
        Ok(None)
    } else {
        Ok(Some(params))
    }
}

/// Deep-merge `source` into `target`; nested objects merge, everything else is replaced
pub fn merge_json(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_json(existing, incoming)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialsConfig;
    use parley::{Button, Media};
    use serde_json::json;

    const SESSION: &str = "projects/p/agent/sessions/s1";

    fn config() -> DialogflowConfig {
        DialogflowConfig::new("p", CredentialsConfig::AccessToken("t".into()))
            .with_language_code("de")
    }

    fn build(
        config: &DialogflowConfig,
        contexts: &ContextSet,
        message: &UserMessage,
    ) -> DetectIntentRequest {
        let session = SessionState {
            session_path: SESSION,
            contexts,
            knowledge_base_names: &[],
        };
        build_request(config, session, message).unwrap()
    }

    #[test]
    fn test_text_request() {
        let request = build(&config(), &ContextSet::new(), &UserMessage::text("Hallo"));

        assert_eq!(
            request.query_input.text,
            Some(TextInput {
                text: "Hallo".into(),
                language_code: "de".into()
            })
        );
        assert!(request.query_params.is_none());
        assert!(request.output_audio_config.is_none());
    }

    #[test]
    fn test_button_payload_as_event_name() {
        let message = UserMessage::empty().with_button(Button::text("Yes").with_payload("CONFIRM"));
        let request = build(&config(), &ContextSet::new(), &message);

        let event = request.query_input.event.unwrap();
        assert_eq!(event.name, "CONFIRM");
        assert_eq!(event.language_code, "de");
        assert!(request.query_input.text.is_none());
    }

    #[test]
    fn test_button_json_payload_as_event() {
        let payload = json!({
            "name": "ORDER",
            "parameters": { "size": "L" },
            "languageCode": "en"
        });
        let message = UserMessage::empty()
            .with_button(Button::text("Order").with_payload(payload.to_string()));
        let request = build(&config(), &ContextSet::new(), &message);

        let event = request.query_input.event.unwrap();
        assert_eq!(event.name, "ORDER");
        assert_eq!(event.parameters.unwrap()["size"], "L");
        assert_eq!(event.language_code, "en");
    }

    #[test]
    fn test_button_as_text_when_events_disabled() {
        let mut cfg = config();
        cfg.button_events = false;
        let message = UserMessage::empty().with_button(Button::text("Menu"));
        let request = build(&cfg, &ContextSet::new(), &message);

        assert!(request.query_input.event.is_none());
        assert_eq!(request.query_input.text.unwrap().text, "Menu");
    }

    #[test]
    fn test_event_object_without_name_is_rejected() {
        let message = UserMessage::empty()
            .with_button(Button::text("x").with_payload(r#"{"parameters":{}}"#));
        let session = SessionState {
            session_path: SESSION,
            contexts: &ContextSet::new(),
            knowledge_base_names: &[],
        };
        assert!(build_request(&config(), session, &message).is_err());
    }

    #[test]
    fn test_audio_request() {
        let message = UserMessage::empty().with_media(
            Media::uri("recording.wav")
                .with_mime_type("audio/wav")
                .with_buffer(vec![1, 2, 3]),
        );
        let request = build(&config(), &ContextSet::new(), &message);

        assert_eq!(request.input_audio.as_deref(), Some("AQID"));
        let audio = request.query_input.audio_config.unwrap();
        assert_eq!(audio.audio_encoding, "AUDIO_ENCODING_LINEAR_16");
        assert_eq!(audio.sample_rate_hertz, 16000);
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let session = SessionState {
            session_path: SESSION,
            contexts: &ContextSet::new(),
            knowledge_base_names: &[],
        };
        let err = build_request(&config(), session, &UserMessage::empty()).unwrap_err();
        assert!(matches!(err, ConnectorError::Validation(_)));
    }

    #[test]
    fn test_contexts_and_knowledge_bases() {
        let contexts: ContextSet = vec![Context::new("booking", 3)].into_iter().collect();
        let kbs = vec!["projects/p/knowledgeBases/kb1".to_string()];
        let session = SessionState {
            session_path: SESSION,
            contexts: &contexts,
            knowledge_base_names: &kbs,
        };

        let request = build_request(&config(), session, &UserMessage::text("hi")).unwrap();
        let params = request.query_params.unwrap();
        assert_eq!(params.contexts.len(), 1);
        assert_eq!(params.contexts[0].name, format!("{SESSION}/contexts/booking"));
        assert_eq!(params.contexts[0].lifespan_count, Some(3));
        assert_eq!(params.knowledge_base_names, kbs);
    }

    #[test]
    fn test_query_params_merge() {
        let mut cfg = config();
        cfg.query_params = json!({
            "timeZone": "Europe/Vienna",
            "payload": { "channel": "web", "user": { "id": 1 } },
            "contexts": [
                { "name": "raw", "lifespanCount": 1 },
                { "name": "booking", "lifespanCount": 1 }
            ]
        })
        .as_object()
        .cloned()
        .unwrap();
        cfg.output_audio = true;

        let contexts: ContextSet = vec![Context::new("booking", 3)].into_iter().collect();
        let message = UserMessage::text("hi").with_custom(
            SET_DIALOGFLOW_QUERYPARAMS,
            json!({ "payload": { "user": { "name": "Ada" } } }),
        );
        let request = build(&cfg, &contexts, &message);

        let params = request.query_params.unwrap();
        assert_eq!(params.extra["timeZone"], "Europe/Vienna");
        assert_eq!(params.extra["payload"]["channel"], "web");
        assert_eq!(params.extra["payload"]["user"]["id"], 1);
        assert_eq!(params.extra["payload"]["user"]["name"], "Ada");
        assert!(params.extra.get("contexts").is_none());

        let lifespans: Vec<(String, Option<u32>)> = params
            .contexts
            .into_iter()
            .map(|c| (c.name, c.lifespan_count))
            .collect();
        assert_eq!(
            lifespans,
            vec![
                (format!("{SESSION}/contexts/raw"), Some(1)),
                (format!("{SESSION}/contexts/booking"), Some(3)),
            ]
        );
        assert!(request.output_audio_config.is_some());
    }
}
