//! Parley Domain Library
//!
//! Framework-neutral types and interfaces for driving chatbots from a
//! conversational-testing harness.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain/`): Pure message model
//!   - `entities/`: Bot and user messages, NLP annotations
//!   - `value_objects/`: Capability map
//!   - `errors/`: Connector error type
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `connector`: Lifecycle contract every chatbot connector implements
//!   - `sink`: Callback through which bot messages are delivered
//!
//! Connector implementations live in separate crates
//! (e.g., parley-connector-dialogflow).
//!
//! # Usage
//!
//! ```rust,ignore
//! use parley::{BotMessage, Capabilities, ChatConnector, UserMessage};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Attachment, BotMessage, Button, Capabilities, Card, ConnectorError, Media, Nlp, NlpEntity,
    NlpIntent, Sender, UserMessage,
};
pub use ports::{BotSink, ChatConnector, CollectingSink};
