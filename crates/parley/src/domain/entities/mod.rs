//! Domain Entities
//!
//! Framework-neutral message model.
//! - BotMessage: Normalized reply delivered to the test harness
//! - UserMessage: One user turn sent to a chatbot
//! - Rich content: Button, Card, Media, Attachment
//! - Nlp: Intent and entity annotations

mod content;
mod message;
mod nlp;

pub use content::*;
pub use message::*;
pub use nlp::*;
