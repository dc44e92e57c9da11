//! ConversationManager - the active conversation and its friend workflow.
//!
//! Owns the roster of selectable peers, the selected peer's message list,
//! and the relationship state machine for that peer. Consumes the push
//! channel owned by the session manager: it only binds and unbinds its
//! delivery handler, never closes or replaces the channel.

use std::sync::{Arc, Mutex};

use chat_core::{Conversation, RelationshipEvent, RelationshipState};
use chat_types::{ChannelEvent, ChatError, Draft, Identity, Message, Resolution, UserId};

use crate::channel::{HandlerScope, PushChannel};
use crate::notify::{NoticeKind, Notifier};
use crate::rest::RestTransport;

/// Manages the active conversation with the currently selected peer.
pub struct ConversationManager<R, C> {
    rest: Arc<R>,
    channel: Arc<C>,
    state: Arc<Mutex<Conversation>>,
    roster: Arc<Mutex<Vec<Identity>>>,
    notifier: Arc<dyn Notifier>,
}

impl<R, C> Clone for ConversationManager<R, C> {
    fn clone(&self) -> Self {
        Self {
            rest: Arc::clone(&self.rest),
            channel: Arc::clone(&self.channel),
            state: Arc::clone(&self.state),
            roster: Arc::clone(&self.roster),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<R, C> ConversationManager<R, C>
where
    R: RestTransport + 'static,
    C: PushChannel + 'static,
{
    /// Create a conversation manager sharing the session's channel.
    pub fn new(rest: Arc<R>, channel: Arc<C>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            rest,
            channel,
            state: Arc::new(Mutex::new(Conversation::new())),
            roster: Arc::new(Mutex::new(Vec::new())),
            notifier,
        }
    }

    /// Fetch the roster of selectable peers. On failure the previous
    /// roster is kept.
    pub async fn list_peers(&self) {
        match self.rest.list_peers().await {
            Ok(peers) => {
                *self.roster.lock().unwrap() = peers;
            }
            Err(e) => self.report(e.into()),
        }
    }

    /// Select a peer from the roster.
    ///
    /// Clears the message list, derives the relationship from `me`'s
    /// relation lists, rebinds the delivery handler (replacing the previous
    /// peer's subscription before the new one exists), and fetches history.
    /// A history response that arrives after the selection has changed
    /// again is discarded, not installed.
    pub async fn select_peer(&self, peer_id: &UserId, me: &Identity) {
        let peer = self
            .roster
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.id == peer_id)
            .cloned();
        let Some(peer) = peer else {
            self.report(ChatError::Validation(format!("unknown peer {peer_id}")));
            return;
        };

        let epoch = self.state.lock().unwrap().select(peer, me);

        let state = Arc::clone(&self.state);
        self.channel.bind(
            HandlerScope::Conversation,
            Box::new(move |event| {
                if let ChannelEvent::NewMessage(message) = event {
                    // Appended only when the sender is the selected peer.
                    state.lock().unwrap().deliver(message);
                }
            }),
        );

        match self.rest.fetch_messages(peer_id).await {
            Ok(history) => {
                let installed = self.state.lock().unwrap().accept_history(epoch, history);
                if !installed {
                    tracing::debug!(peer = %peer_id, "discarded stale history response");
                }
            }
            Err(e) => self.report(e.into()),
        }
    }

    /// Deselect the peer: the delivery handler is removed and the
    /// conversation reset.
    pub fn clear_selection(&self) {
        self.channel.unbind(HandlerScope::Conversation);
        self.state.lock().unwrap().clear();
    }

    /// Send a message to the selected peer.
    ///
    /// The message is appended only from the server's echoed copy - never
    /// optimistically - so a failed send leaves the list untouched.
    pub async fn send_message(&self, draft: Draft) {
        if let Err(e) = draft.validate() {
            self.report(e);
            return;
        }
        let target = {
            let state = self.state.lock().unwrap();
            state.selected().map(|peer| (peer.id.clone(), state.epoch()))
        };
        let Some((peer_id, epoch)) = target else {
            self.report(ChatError::Validation("no conversation selected".into()));
            return;
        };

        match self.rest.send_message(&peer_id, &draft).await {
            Ok(message) => {
                let appended = self.state.lock().unwrap().append_sent(epoch, message);
                if !appended {
                    tracing::debug!(peer = %peer_id, "discarded echo for a stale selection");
                }
            }
            Err(e) => self.report(e.into()),
        }
    }

    /// Send a friend request to the selected peer. Requires the Stranger
    /// state; on success the machine advances to RequestSent and the peer's
    /// client is notified live over the channel.
    pub async fn request_friend(&self) {
        let peer_id = match self.selected_in(RelationshipState::Stranger) {
            Ok(peer_id) => peer_id,
            Err(e) => {
                self.report(e);
                return;
            }
        };

        match self.rest.send_friend_request(&peer_id).await {
            Ok(()) => {
                self.state
                    .lock()
                    .unwrap()
                    .apply_relationship(RelationshipEvent::LocalRequestSent);
                if let Err(e) = self
                    .channel
                    .emit(ChannelEvent::FriendRequestSent { to: peer_id })
                    .await
                {
                    self.report(ChatError::Channel(e.to_string()));
                }
                self.notifier.notify(NoticeKind::Success, "Friend request sent");
            }
            Err(e) => self.report(e.into()),
        }
    }

    /// Accept the selected peer's pending request. Requires the
    /// RequestReceived state; the symmetric counterpart of
    /// [`ConversationManager::request_friend`] - the resolution travels to
    /// the peer over the channel.
    pub async fn accept_friend_request(&self) {
        let peer_id = match self.selected_in(RelationshipState::RequestReceived) {
            Ok(peer_id) => peer_id,
            Err(e) => {
                self.report(e);
                return;
            }
        };

        self.state
            .lock()
            .unwrap()
            .apply_relationship(RelationshipEvent::LocalAccept);
        if let Err(e) = self
            .channel
            .emit(ChannelEvent::FriendRequestResolved {
                peer: peer_id,
                resolution: Resolution::Accepted,
            })
            .await
        {
            self.report(ChatError::Channel(e.to_string()));
        }
        self.notifier
            .notify(NoticeKind::Success, "Friend request accepted");
    }

    /// Dispatch entry: the peer sent us a friend request. Ignored unless
    /// it concerns the selected peer.
    pub(crate) fn handle_peer_request(&self, from: &UserId) {
        let mut state = self.state.lock().unwrap();
        if state.selected().map(|p| &p.id) == Some(from) {
            state.apply_relationship(RelationshipEvent::PeerRequested);
        }
    }

    /// Dispatch entry: a pending request with the peer was resolved.
    pub(crate) fn handle_resolution(&self, peer: &UserId, resolution: Resolution) {
        let mut state = self.state.lock().unwrap();
        if state.selected().map(|p| &p.id) == Some(peer) {
            state.apply_relationship(RelationshipEvent::PeerResolved(resolution));
        }
    }

    /// The visible message sequence for the selected peer, arrival order.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages().to_vec()
    }

    /// The relationship state for the selected peer.
    pub fn relationship(&self) -> RelationshipState {
        self.state.lock().unwrap().relationship()
    }

    /// The last fetched roster.
    pub fn peers(&self) -> Vec<Identity> {
        self.roster.lock().unwrap().clone()
    }

    /// The currently selected peer's id, if any.
    pub fn selected_peer(&self) -> Option<UserId> {
        self.state.lock().unwrap().selected().map(|p| p.id.clone())
    }

    /// The selected peer's id, provided the relationship is in `required`.
    fn selected_in(&self, required: RelationshipState) -> Result<UserId, ChatError> {
        let state = self.state.lock().unwrap();
        let Some(peer) = state.selected() else {
            return Err(ChatError::Validation("no conversation selected".into()));
        };
        if state.relationship() != required {
            return Err(ChatError::Validation(format!(
                "not allowed while {:?}",
                state.relationship()
            )));
        }
        Ok(peer.id.clone())
    }

    fn report(&self, err: ChatError) {
        tracing::warn!("conversation operation failed: {err}");
        self.notifier.notify(NoticeKind::Error, &err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use crate::notify::MemoryNotifier;
    use crate::rest::{MockRest, RestCall, RestError};
    use chat_types::MessageId;
    use std::time::Duration;

    fn identity(id: &str) -> Identity {
        Identity {
            id: UserId::new(id),
            display_name: format!("user {id}"),
            avatar_url: None,
            friends: vec![],
            outgoing_requests: vec![],
            incoming_requests: vec![],
        }
    }

    fn message(id: &str, from: &str, to: &str) -> Message {
        Message {
            id: MessageId::new(id),
            sender_id: UserId::new(from),
            recipient_id: UserId::new(to),
            text: Some("hi".into()),
            image_url: None,
            created_at: 1_705_000_000,
        }
    }

    struct Harness {
        conversation: ConversationManager<MockRest, MockChannel>,
        rest: Arc<MockRest>,
        channel: Arc<MockChannel>,
        notifier: Arc<MemoryNotifier>,
    }

    fn harness() -> Harness {
        let rest = Arc::new(MockRest::new());
        let channel = Arc::new(MockChannel::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let conversation = ConversationManager::new(
            Arc::clone(&rest),
            Arc::clone(&channel),
            notifier.clone() as Arc<dyn Notifier>,
        );
        Harness {
            conversation,
            rest,
            channel,
            notifier,
        }
    }

    /// Roster with peers a and b loaded, channel open as "me".
    async fn with_roster(h: &Harness) {
        h.channel.open("addr", &UserId::new("me")).await.unwrap();
        h.rest
            .queue_roster(Ok(vec![identity("a"), identity("b")]));
        h.conversation.list_peers().await;
    }

    #[tokio::test]
    async fn select_fetches_history_and_binds_one_handler() {
        let h = harness();
        with_roster(&h).await;

        h.rest.queue_history(Ok(vec![message("m1", "a", "me")]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        assert_eq!(h.conversation.selected_peer(), Some(UserId::new("a")));
        assert_eq!(h.conversation.messages().len(), 1);
        assert_eq!(h.channel.handler_count(), 1);
    }

    #[tokio::test]
    async fn reselect_never_duplicates_delivery() {
        let h = harness();
        with_roster(&h).await;

        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("b"), &identity("me"))
            .await;

        // One handler despite two selections.
        assert_eq!(h.channel.handler_count(), 1);

        h.channel
            .inject(ChannelEvent::NewMessage(message("m1", "b", "me")));
        assert_eq!(h.conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn delivery_is_scoped_to_the_selected_peer() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        h.channel
            .inject(ChannelEvent::NewMessage(message("m1", "a", "me")));
        h.channel
            .inject(ChannelEvent::NewMessage(message("m2", "c", "me")));

        let messages = h.conversation.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, UserId::new("a"));
    }

    #[tokio::test]
    async fn stale_history_never_overwrites_the_new_selection() {
        let h = harness();
        with_roster(&h).await;

        // A's fetch is gated; it will resolve only after B is selected.
        // Queue order: B's select pops first (while A is held), then A's.
        let gate = h.rest.gate_next_history();
        h.rest.queue_history(Ok(vec![message("m-b", "b", "me")]));
        h.rest.queue_history(Ok(vec![message("m-a", "a", "me")]));

        let slow = {
            let conversation = h.conversation.clone();
            tokio::spawn(async move {
                conversation
                    .select_peer(&UserId::new("a"), &identity("me"))
                    .await;
            })
        };
        // Wait until A's fetch is in flight.
        while !h
            .rest
            .calls()
            .contains(&RestCall::FetchMessages(UserId::new("a")))
        {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        h.conversation
            .select_peer(&UserId::new("b"), &identity("me"))
            .await;

        gate.send(()).unwrap();
        slow.await.unwrap();

        // Only B's history is visible; A's stale response was discarded.
        let messages = h.conversation.messages();
        assert_eq!(h.conversation.selected_peer(), Some(UserId::new("b")));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, UserId::new("b"));
    }

    #[tokio::test]
    async fn send_appends_only_the_server_echo() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        // Failure first: nothing is appended optimistically.
        h.rest.queue_send(Err(RestError::Timeout));
        h.conversation.send_message(Draft::text("hello")).await;
        assert!(h.conversation.messages().is_empty());
        assert_eq!(h.notifier.errors().len(), 1);

        // Success: the echoed copy lands once.
        h.rest.queue_send(Ok(message("m1", "me", "a")));
        h.conversation.send_message(Draft::text("hello")).await;
        assert_eq!(h.conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn empty_draft_never_reaches_the_network() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        h.conversation.send_message(Draft::default()).await;

        assert!(!h
            .rest
            .calls()
            .contains(&RestCall::SendMessage(UserId::new("a"))));
        assert_eq!(h.notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn send_without_selection_is_rejected() {
        let h = harness();
        h.conversation.send_message(Draft::text("hello")).await;
        assert_eq!(h.notifier.errors().len(), 1);
        assert!(h.rest.calls().is_empty());
    }

    #[tokio::test]
    async fn request_friend_transitions_and_notifies_the_peer() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        h.rest.queue_unit(Ok(()));
        h.conversation.request_friend().await;

        assert_eq!(
            h.conversation.relationship(),
            RelationshipState::RequestSent
        );
        assert_eq!(
            h.channel.emitted(),
            vec![ChannelEvent::FriendRequestSent {
                to: UserId::new("a")
            }]
        );
    }

    #[tokio::test]
    async fn request_friend_requires_stranger_state() {
        let h = harness();
        with_roster(&h).await;
        let mut me = identity("me");
        me.friends.push(UserId::new("a"));
        h.rest.queue_history(Ok(vec![]));
        h.conversation.select_peer(&UserId::new("a"), &me).await;

        h.conversation.request_friend().await;

        // Already friends: no POST, no emit, one error notice.
        assert!(!h
            .rest
            .calls()
            .contains(&RestCall::FriendRequest(UserId::new("a"))));
        assert!(h.channel.emitted().is_empty());
        assert_eq!(h.notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn failed_request_leaves_relationship_untouched() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        h.rest.queue_unit(Err(RestError::Unreachable("down".into())));
        h.conversation.request_friend().await;

        assert_eq!(h.conversation.relationship(), RelationshipState::Stranger);
        assert!(h.channel.emitted().is_empty());
    }

    #[tokio::test]
    async fn accept_transitions_to_friends_and_resolves_over_the_channel() {
        let h = harness();
        with_roster(&h).await;
        let mut me = identity("me");
        me.incoming_requests.push(UserId::new("a"));
        h.rest.queue_history(Ok(vec![]));
        h.conversation.select_peer(&UserId::new("a"), &me).await;
        assert_eq!(
            h.conversation.relationship(),
            RelationshipState::RequestReceived
        );

        h.conversation.accept_friend_request().await;

        assert_eq!(h.conversation.relationship(), RelationshipState::Friends);
        assert_eq!(
            h.channel.emitted(),
            vec![ChannelEvent::FriendRequestResolved {
                peer: UserId::new("a"),
                resolution: Resolution::Accepted
            }]
        );
    }

    #[tokio::test]
    async fn peer_request_only_affects_the_selected_peer() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;

        h.conversation.handle_peer_request(&UserId::new("c"));
        assert_eq!(h.conversation.relationship(), RelationshipState::Stranger);

        h.conversation.handle_peer_request(&UserId::new("a"));
        assert_eq!(
            h.conversation.relationship(),
            RelationshipState::RequestReceived
        );
    }

    #[tokio::test]
    async fn cleared_resolution_returns_to_stranger() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;
        h.rest.queue_unit(Ok(()));
        h.conversation.request_friend().await;

        h.conversation
            .handle_resolution(&UserId::new("a"), Resolution::Cleared);
        assert_eq!(h.conversation.relationship(), RelationshipState::Stranger);
    }

    #[tokio::test]
    async fn clear_selection_removes_the_delivery_handler() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_history(Ok(vec![]));
        h.conversation
            .select_peer(&UserId::new("a"), &identity("me"))
            .await;
        assert_eq!(h.channel.handler_count(), 1);

        h.conversation.clear_selection();
        assert_eq!(h.channel.handler_count(), 0);
        assert!(h.conversation.selected_peer().is_none());
    }

    #[tokio::test]
    async fn failed_roster_fetch_keeps_the_old_roster() {
        let h = harness();
        with_roster(&h).await;
        h.rest.queue_roster(Err(RestError::Timeout));
        h.conversation.list_peers().await;

        assert_eq!(h.conversation.peers().len(), 2);
        assert_eq!(h.notifier.errors().len(), 1);
    }
}
