//! Dialogflow Connector for Parley
//!
//! This crate drives a Dialogflow ES agent through the `ChatConnector`
//! lifecycle: each user turn becomes a `detectIntent` request, and the
//! response is normalized into bot messages with NLP annotations.
//!
//! # Usage
//!
//! ```rust,ignore
//! use parley::{Capabilities, ChatConnector, CollectingSink, UserMessage};
//! use parley_connector_dialogflow::DialogflowConnector;
//!
//! let caps = Capabilities::from_env("DIALOGFLOW_");
//! let sink = CollectingSink::new();
//! let mut connector = DialogflowConnector::new(caps, Arc::new(sink.clone()));
//! connector.validate()?;
//! connector.build().await?;
//! connector.start().await?;
//! connector.user_says(&mut UserMessage::text("hello")).await?;
//! ```

pub mod client;
pub mod config;
mod connector;
pub mod context;
mod credentials;
pub mod normalize;
pub mod parameters;
pub mod request;
pub mod wire;

#[cfg(test)]
mod test_support;

pub use client::{DialogflowApi, DialogflowClient};
pub use config::{CredentialsConfig, DialogflowConfig, KnowledgeBaseScope};
pub use connector::DialogflowConnector;
pub use context::{Context, ContextSet};
