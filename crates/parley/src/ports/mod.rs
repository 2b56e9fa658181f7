//! Ports (Interfaces)
//!
//! Abstract interfaces between the test harness and chatbot connectors.
//!
//! Implementations of `ChatConnector` live in connector crates.

pub mod connector;
pub mod sink;

// Re-exports
pub use connector::*;
pub use sink::*;
