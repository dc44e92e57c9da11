//! HttpRest - real REST transport over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use chat_types::{ChatError, Credentials, Draft, Identity, Message, ProfileUpdate, UserId};

use super::{RestError, RestTransport};

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Error body shape the service uses for failed requests.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// REST transport over HTTP with a cookie-backed session.
pub struct HttpRest {
    base: String,
    http: reqwest::Client,
}

impl HttpRest {
    /// Create a transport against the given base address
    /// (e.g. `http://localhost:3000/api`).
    pub fn new(base: &str) -> Result<Self, RestError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(|e| RestError::Unreachable(format!("failed to build client: {e}")))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Map transport-level reqwest failures.
    fn send_error(err: reqwest::Error) -> RestError {
        if err.is_timeout() {
            RestError::Timeout
        } else {
            RestError::Unreachable(err.to_string())
        }
    }

    /// Turn a non-success status into the matching error, reading the
    /// service's `{ "message": ... }` body when present.
    async fn status_error(response: reqwest::Response) -> RestError {
        let status = response.status();
        let message = match response.json::<ApiError>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        match status.as_u16() {
            401 | 403 => RestError::Unauthorized(message),
            400..=499 => RestError::Rejected(message),
            _ => RestError::Unreachable(message),
        }
    }

    /// Decode a success body into a DTO.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RestError> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RestError::InvalidPayload(e.to_string()))
    }

    async fn decode_identity(response: reqwest::Response) -> Result<Identity, RestError> {
        let identity: Identity = Self::decode(response).await?;
        validated(identity, Identity::validate)
    }
}

/// Boundary validation: a DTO that decodes but fails its own invariants
/// is rejected as a malformed payload.
fn validated<T>(dto: T, check: impl Fn(&T) -> Result<(), ChatError>) -> Result<T, RestError> {
    match check(&dto) {
        Ok(()) => Ok(dto),
        Err(e) => Err(RestError::InvalidPayload(e.to_string())),
    }
}

#[async_trait]
impl RestTransport for HttpRest {
    async fn check_auth(&self) -> Result<Identity, RestError> {
        let response = self
            .http
            .get(self.url("auth/check"))
            .send()
            .await
            .map_err(Self::send_error)?;
        Self::decode_identity(response).await
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, RestError> {
        let response = self
            .http
            .post(self.url("auth/signup"))
            .json(credentials)
            .send()
            .await
            .map_err(Self::send_error)?;
        Self::decode_identity(response).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, RestError> {
        let response = self
            .http
            .post(self.url("auth/signin"))
            .json(credentials)
            .send()
            .await
            .map_err(Self::send_error)?;
        Self::decode_identity(response).await
    }

    async fn sign_out(&self) -> Result<(), RestError> {
        let response = self
            .http
            .post(self.url("auth/signout"))
            .send()
            .await
            .map_err(Self::send_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, RestError> {
        let response = self
            .http
            .put(self.url("auth/update-profile"))
            .json(update)
            .send()
            .await
            .map_err(Self::send_error)?;
        Self::decode_identity(response).await
    }

    async fn list_peers(&self) -> Result<Vec<Identity>, RestError> {
        let response = self
            .http
            .get(self.url("message/users"))
            .send()
            .await
            .map_err(Self::send_error)?;
        let peers: Vec<Identity> = Self::decode(response).await?;
        for peer in &peers {
            validated(peer, |p| p.validate())?;
        }
        Ok(peers)
    }

    async fn fetch_messages(&self, peer: &UserId) -> Result<Vec<Message>, RestError> {
        let response = self
            .http
            .get(self.url(&format!("messages/{peer}")))
            .send()
            .await
            .map_err(Self::send_error)?;
        let messages: Vec<Message> = Self::decode(response).await?;
        for message in &messages {
            validated(message, |m| m.validate())?;
        }
        Ok(messages)
    }

    async fn send_message(&self, peer: &UserId, draft: &Draft) -> Result<Message, RestError> {
        let response = self
            .http
            .post(self.url(&format!("messages/send/{peer}")))
            .json(draft)
            .send()
            .await
            .map_err(Self::send_error)?;
        let message: Message = Self::decode(response).await?;
        validated(message, Message::validate)
    }

    async fn send_friend_request(&self, peer: &UserId) -> Result<(), RestError> {
        let response = self
            .http
            .post(self.url(&format!("friends/add/{peer}")))
            .send()
            .await
            .map_err(Self::send_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_address_is_normalized() {
        let rest = HttpRest::new("http://localhost:3000/api/").unwrap();
        assert_eq!(rest.url("auth/check"), "http://localhost:3000/api/auth/check");
        assert_eq!(rest.url("/auth/check"), "http://localhost:3000/api/auth/check");
    }

    #[test]
    fn invalid_dto_is_rejected_at_the_boundary() {
        let identity = Identity {
            id: UserId::new("a"),
            display_name: "Ada".into(),
            avatar_url: None,
            friends: vec![UserId::new("b")],
            outgoing_requests: vec![UserId::new("b")],
            incoming_requests: vec![],
        };
        let err = validated(identity, Identity::validate).unwrap_err();
        assert!(matches!(err, RestError::InvalidPayload(_)));
    }
}
