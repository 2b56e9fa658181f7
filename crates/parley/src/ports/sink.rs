//! Bot Message Sink
//!
//! Callback through which connectors hand normalized replies to the harness.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::domain::entities::BotMessage;

/// Receiver of bot messages
pub trait BotSink: Send + Sync {
    /// Queue a bot message for the harness
    fn queue_bot_says(&self, message: BotMessage);
}

impl BotSink for UnboundedSender<BotMessage> {
    fn queue_bot_says(&self, message: BotMessage) {
        if self.send(message).is_err() {
            warn!("Bot message receiver dropped, discarding message");
        }
    }
}

impl<T: BotSink + ?Sized> BotSink for Arc<T> {
    fn queue_bot_says(&self, message: BotMessage) {
        (**self).queue_bot_says(message)
    }
}

/// In-memory sink that keeps every message it receives
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    messages: Arc<Mutex<Vec<BotMessage>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return all collected messages
    pub fn drain(&self) -> Vec<BotMessage> {
        match self.messages.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BotSink for CollectingSink {
    fn queue_bot_says(&self, message: BotMessage) {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_drain() {
        let sink = CollectingSink::new();
        sink.queue_bot_says(BotMessage::new().with_text("one"));
        sink.queue_bot_says(BotMessage::new().with_text("two"));

        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained[1].message_text.as_deref(), Some("two"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink: Arc<dyn BotSink> = Arc::new(tx);

        sink.queue_bot_says(BotMessage::new().with_text("hello"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.message_text.as_deref(), Some("hello"));
    }
}
