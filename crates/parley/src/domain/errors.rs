//! Connector Errors
//!
//! Error type shared by all connector implementations.

use thiserror::Error;

/// Errors raised by connector lifecycle operations
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl ConnectorError {
    pub fn missing_capability<T: AsRef<str>>(key: T) -> Self {
        Self::Validation(format!("{} capability required", key.as_ref()))
    }

    pub fn invalid_capability<T: AsRef<str>, R: AsRef<str>>(key: T, reason: R) -> Self {
        Self::Validation(format!(
            "{} capability invalid: {}",
            key.as_ref(),
            reason.as_ref()
        ))
    }

    /// Wrap an error with additional context, keeping its variant
    pub fn context<C: AsRef<str>>(self, context: C) -> Self {
        let context = context.as_ref();
        match self {
            Self::Validation(msg) => Self::Validation(format!("{context}: {msg}")),
            Self::Lifecycle(msg) => Self::Lifecycle(format!("{context}: {msg}")),
            Self::Credentials(msg) => Self::Credentials(format!("{context}: {msg}")),
            Self::ExternalService(msg) => Self::ExternalService(format!("{context}: {msg}")),
        }
    }
}
