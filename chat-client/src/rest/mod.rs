//! REST transport abstraction.
//!
//! A typed request/response seam over the remote service. Every payload is
//! decoded into an explicit DTO and validated before it reaches a manager;
//! a malformed body is an [`RestError::InvalidPayload`], never a struct
//! with undefined fields.

mod http;
mod mock;

pub use http::HttpRest;
pub use mock::{MockRest, RestCall};

use async_trait::async_trait;
use thiserror::Error;

use chat_types::{ChatError, Credentials, Draft, Identity, Message, ProfileUpdate, UserId};

/// REST transport errors.
#[derive(Debug, Error)]
pub enum RestError {
    /// Credentials rejected or session expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server rejected the request (4xx other than auth).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The service could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The response body failed to decode or validate.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,
}

impl From<RestError> for ChatError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Unauthorized(msg) => ChatError::Auth(msg),
            RestError::Rejected(msg) => ChatError::Validation(msg),
            RestError::Unreachable(msg) => ChatError::Network(msg),
            RestError::InvalidPayload(msg) => ChatError::Network(msg),
            RestError::Timeout => ChatError::Network("request timed out".into()),
        }
    }
}

/// Typed request/response calls against the remote chat service.
///
/// Implementations handle the underlying mechanism (reqwest HTTP, mock).
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// GET the current session; the server replies with the identity it
    /// has a session cookie for.
    async fn check_auth(&self) -> Result<Identity, RestError>;

    /// POST new-account credentials.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, RestError>;

    /// POST sign-in credentials.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, RestError>;

    /// POST a sign-out for the current session.
    async fn sign_out(&self) -> Result<(), RestError>;

    /// PUT a partial profile update; the reply is the whole new identity.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, RestError>;

    /// GET the roster of selectable peers.
    async fn list_peers(&self) -> Result<Vec<Identity>, RestError>;

    /// GET the message history with one peer.
    async fn fetch_messages(&self, peer: &UserId) -> Result<Vec<Message>, RestError>;

    /// POST a message to a peer; the reply is the server-assigned copy.
    async fn send_message(&self, peer: &UserId, draft: &Draft) -> Result<Message, RestError>;

    /// POST a friend request to a peer.
    async fn send_friend_request(&self, peer: &UserId) -> Result<(), RestError>;
}
