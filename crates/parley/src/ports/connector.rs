//! Chat Connector Port
//!
//! Lifecycle contract between the test harness and a chatbot backend.
//!
//! Implementations of this trait should live in separate crates
//! (e.g., parley-connector-dialogflow).

use async_trait::async_trait;

use crate::domain::entities::UserMessage;
use crate::domain::errors::ConnectorError;

/// Chatbot connector interface
///
/// The harness drives a connector through a fixed lifecycle:
/// `validate` → `build` → `start` → `user_says`* → `stop` → `clean`.
/// A connector handles one conversation at a time; bot replies are
/// delivered through the [`BotSink`](crate::ports::BotSink) it was
/// constructed with.
///
/// # Example
///
/// ```rust,ignore
/// use parley::ChatConnector;
///
/// struct EchoConnector { /* ... */ }
///
/// #[async_trait]
/// impl ChatConnector for EchoConnector {
///     async fn user_says(&mut self, message: &mut UserMessage) -> Result<(), ConnectorError> {
///         self.sink.queue_bot_says(BotMessage::new().with_text(/* ... */));
///         Ok(())
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait ChatConnector: Send {
    /// Get the connector name (e.g., "dialogflow")
    fn name(&self) -> &str;

    /// Check the configuration
    ///
    /// Synchronous and side-effect free; fails fast with a descriptive
    /// error on the first problem found.
    fn validate(&self) -> Result<(), ConnectorError>;

    /// Construct credentials and clients
    async fn build(&mut self) -> Result<(), ConnectorError>;

    /// Open a new conversation session
    async fn start(&mut self) -> Result<(), ConnectorError>;

    /// Send one user turn
    ///
    /// Returns after all bot replies for this turn have been queued.
    /// The connector may record the outgoing request in
    /// `message.source_data`.
    async fn user_says(&mut self, message: &mut UserMessage) -> Result<(), ConnectorError>;

    /// Close the conversation session
    async fn stop(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Release clients and credentials
    async fn clean(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }
}
