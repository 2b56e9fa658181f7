//! Message Entities
//!
//! A user turn sent to a chatbot and the normalized replies coming back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Attachment, Button, Card, Media, Nlp};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Me,
    Bot,
}

/// A normalized reply from the chatbot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotMessage {
    pub sender: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nlp: Option<Nlp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Raw platform response this message was derived from
    #[serde(default)]
    pub source_data: Value,
}

impl BotMessage {
    /// Create an empty bot message
    pub fn new() -> Self {
        Self {
            sender: Sender::Bot,
            message_text: None,
            buttons: Vec::new(),
            cards: Vec::new(),
            media: Vec::new(),
            nlp: None,
            attachments: Vec::new(),
            source_data: Value::Null,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.message_text = Some(text.into());
        self
    }

    pub fn with_nlp(mut self, nlp: Nlp) -> Self {
        self.nlp = Some(nlp);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_source_data(mut self, source_data: Value) -> Self {
        self.source_data = source_data;
        self
    }

    /// True when the message carries no visible content
    pub fn is_empty(&self) -> bool {
        self.message_text.is_none()
            && self.buttons.is_empty()
            && self.cards.is_empty()
            && self.media.is_empty()
    }
}

impl Default for BotMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// One user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub sender: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
    /// Buttons the user "clicked"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    /// Connector-specific per-turn instructions set by test scripts
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
    /// Request sent on behalf of this message, filled by the connector
    #[serde(default)]
    pub source_data: Value,
}

impl UserMessage {
    /// Create a text message
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message_text: Some(text.into()),
            ..Self::empty()
        }
    }

    /// Create a message with no content
    pub fn empty() -> Self {
        Self {
            sender: Sender::Me,
            message_text: None,
            buttons: Vec::new(),
            media: Vec::new(),
            custom: Map::new(),
            source_data: Value::Null,
        }
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media.push(media);
        self
    }

    /// Attach a connector-specific instruction (e.g. `SET_DIALOGFLOW_CONTEXT`)
    pub fn with_custom(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }
}

impl Default for UserMessage {
    fn default() -> Self {
        Self::empty()
    }
}
