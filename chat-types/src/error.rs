//! Error taxonomy for driftchat.

use thiserror::Error;

/// Errors that can occur in driftchat operations.
///
/// None of these are fatal: managers convert every variant into a
/// user-facing notification and leave in-memory state at its
/// last-known-good value.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Bad credentials or expired session. Clears the local identity.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Malformed local input (empty message, unknown peer, wrong state).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Transport unreachable, timed out, or returned a malformed payload.
    #[error("network failure: {0}")]
    Network(String),

    /// The push connection failed or dropped.
    #[error("channel failure: {0}")]
    Channel(String),

    /// MessagePack serialization of a channel frame failed.
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization of a channel frame failed.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ChatError::Validation("message is empty".into());
        assert_eq!(err.to_string(), "invalid input: message is empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatError>();
    }
}
