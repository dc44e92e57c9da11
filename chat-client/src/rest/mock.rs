//! Mock REST transport for testing.
//!
//! Allows queueing typed responses per operation and capturing the calls
//! that were made, for verification.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use chat_types::{Credentials, Draft, Identity, Message, ProfileUpdate, UserId};

use super::{RestError, RestTransport};

/// A recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestCall {
    /// `check_auth` was called.
    CheckAuth,
    /// `sign_up` was called with this email.
    SignUp(String),
    /// `sign_in` was called with this email.
    SignIn(String),
    /// `sign_out` was called.
    SignOut,
    /// `update_profile` was called.
    UpdateProfile,
    /// `list_peers` was called.
    ListPeers,
    /// `fetch_messages` was called for this peer.
    FetchMessages(UserId),
    /// `send_message` was called for this peer.
    SendMessage(UserId),
    /// `send_friend_request` was called for this peer.
    FriendRequest(UserId),
}

#[derive(Default)]
struct MockRestInner {
    calls: Vec<RestCall>,
    identities: VecDeque<Result<Identity, RestError>>,
    rosters: VecDeque<Result<Vec<Identity>, RestError>>,
    histories: VecDeque<Result<Vec<Message>, RestError>>,
    sends: VecDeque<Result<Message, RestError>>,
    units: VecDeque<Result<(), RestError>>,
    history_gate: Option<oneshot::Receiver<()>>,
}

/// Mock REST transport for testing.
///
/// Responses are queued per shape: identity-returning calls (`check_auth`,
/// `sign_up`, `sign_in`, `update_profile`) share one queue, as do the
/// unit-returning calls (`sign_out`, `send_friend_request`). A call with
/// nothing queued fails with [`RestError::Unreachable`].
#[derive(Default)]
pub struct MockRest {
    inner: Arc<Mutex<MockRestInner>>,
}

impl MockRest {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next identity-returning call.
    pub fn queue_identity(&self, response: Result<Identity, RestError>) {
        self.inner.lock().unwrap().identities.push_back(response);
    }

    /// Queue a response for the next `list_peers` call.
    pub fn queue_roster(&self, response: Result<Vec<Identity>, RestError>) {
        self.inner.lock().unwrap().rosters.push_back(response);
    }

    /// Queue a response for the next `fetch_messages` call.
    pub fn queue_history(&self, response: Result<Vec<Message>, RestError>) {
        self.inner.lock().unwrap().histories.push_back(response);
    }

    /// Queue a response for the next `send_message` call.
    pub fn queue_send(&self, response: Result<Message, RestError>) {
        self.inner.lock().unwrap().sends.push_back(response);
    }

    /// Queue a response for the next unit-returning call.
    pub fn queue_unit(&self, response: Result<(), RestError>) {
        self.inner.lock().unwrap().units.push_back(response);
    }

    /// Hold the next `fetch_messages` call until the returned sender fires.
    ///
    /// Used to reproduce the selection race: the fetch does not resolve
    /// until the test releases it.
    pub fn gate_next_history(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().history_gate = Some(rx);
        tx
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> Vec<RestCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn record(&self, call: RestCall) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn pop<T>(
        queue: impl FnOnce(&mut MockRestInner) -> Option<Result<T, RestError>>,
        inner: &Arc<Mutex<MockRestInner>>,
    ) -> Result<T, RestError> {
        let mut guard = inner.lock().unwrap();
        queue(&mut guard).unwrap_or_else(|| Err(RestError::Unreachable("no response queued".into())))
    }
}

impl Clone for MockRest {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RestTransport for MockRest {
    async fn check_auth(&self) -> Result<Identity, RestError> {
        self.record(RestCall::CheckAuth);
        Self::pop(|i| i.identities.pop_front(), &self.inner)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, RestError> {
        self.record(RestCall::SignUp(credentials.email.clone()));
        Self::pop(|i| i.identities.pop_front(), &self.inner)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, RestError> {
        self.record(RestCall::SignIn(credentials.email.clone()));
        Self::pop(|i| i.identities.pop_front(), &self.inner)
    }

    async fn sign_out(&self) -> Result<(), RestError> {
        self.record(RestCall::SignOut);
        Self::pop(|i| i.units.pop_front(), &self.inner)
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> Result<Identity, RestError> {
        self.record(RestCall::UpdateProfile);
        Self::pop(|i| i.identities.pop_front(), &self.inner)
    }

    async fn list_peers(&self) -> Result<Vec<Identity>, RestError> {
        self.record(RestCall::ListPeers);
        Self::pop(|i| i.rosters.pop_front(), &self.inner)
    }

    async fn fetch_messages(&self, peer: &UserId) -> Result<Vec<Message>, RestError> {
        self.record(RestCall::FetchMessages(peer.clone()));
        // Take the gate outside the lock so the mutex is not held across await.
        let gate = self.inner.lock().unwrap().history_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Self::pop(|i| i.histories.pop_front(), &self.inner)
    }

    async fn send_message(&self, peer: &UserId, _draft: &Draft) -> Result<Message, RestError> {
        self.record(RestCall::SendMessage(peer.clone()));
        Self::pop(|i| i.sends.pop_front(), &self.inner)
    }

    async fn send_friend_request(&self, peer: &UserId) -> Result<(), RestError> {
        self.record(RestCall::FriendRequest(peer.clone()));
        Self::pop(|i| i.units.pop_front(), &self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_responses_pop_in_order() {
        let mock = MockRest::new();
        mock.queue_unit(Ok(()));
        mock.queue_unit(Err(RestError::Timeout));

        assert!(mock.sign_out().await.is_ok());
        assert!(matches!(mock.sign_out().await, Err(RestError::Timeout)));
        assert_eq!(mock.calls(), vec![RestCall::SignOut, RestCall::SignOut]);
    }

    #[tokio::test]
    async fn empty_queue_is_unreachable() {
        let mock = MockRest::new();
        assert!(matches!(
            mock.check_auth().await,
            Err(RestError::Unreachable(_))
        ));
    }
}
