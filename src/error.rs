//! Error types for the relay.

use thiserror::Error;

/// Main error type for broker operations.
#[derive(Debug, Error)]
pub enum HookbotError {
    #[error("Malformed topic {topic:?}: {reason}")]
    MalformedTopic { topic: String, reason: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Broker has been shut down")]
    ShutDown,
}

impl HookbotError {
    pub(crate) fn malformed(topic: &str, reason: impl Into<String>) -> Self {
        HookbotError::MalformedTopic {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for HookbotError {
    fn from(e: serde_json::Error) -> Self {
        HookbotError::Decode(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for HookbotError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        HookbotError::Encode(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for HookbotError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        HookbotError::Decode(e.to_string())
    }
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, HookbotError>;
