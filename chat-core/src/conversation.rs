//! Conversation bookkeeping: selected peer, message list, relationship.
//!
//! The message list is append-only and ordered by arrival, never re-sorted
//! by timestamp. Every mutation that originates from an async response
//! (history fetch, send echo) is guarded by an epoch: selecting a new peer
//! bumps the epoch, so responses belonging to a previous selection are
//! discarded instead of overwriting the new conversation.

use chat_types::{Identity, Message};

use crate::relationship::{RelationshipEvent, RelationshipState};

/// The active conversation: one selected peer, its history, and the
/// friend-relationship state for that peer.
#[derive(Debug, Default)]
pub struct Conversation {
    selected: Option<Identity>,
    messages: Vec<Message>,
    relationship: RelationshipState,
    epoch: u64,
}

impl Conversation {
    /// Create an empty conversation with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a peer: clears messages, derives the relationship from the
    /// authoritative identity, and bumps the epoch.
    ///
    /// Returns the new epoch; in-flight fetches for the previous peer carry
    /// the old epoch and will be rejected.
    pub fn select(&mut self, peer: Identity, me: &Identity) -> u64 {
        self.relationship = RelationshipState::derive(me, &peer.id);
        self.selected = Some(peer);
        self.messages.clear();
        self.epoch += 1;
        self.epoch
    }

    /// Deselect the peer and reset the conversation.
    pub fn clear(&mut self) {
        self.selected = None;
        self.messages.clear();
        self.relationship = RelationshipState::Stranger;
        self.epoch += 1;
    }

    /// Install a fetched message history if the selection has not changed
    /// since the fetch was started. Returns false for stale results.
    pub fn accept_history(&mut self, epoch: u64, history: Vec<Message>) -> bool {
        if epoch != self.epoch || self.selected.is_none() {
            return false;
        }
        self.messages = history;
        true
    }

    /// Append the server-echoed copy of a sent message, unless the
    /// selection changed while the send was in flight.
    pub fn append_sent(&mut self, epoch: u64, message: Message) -> bool {
        if epoch != self.epoch || self.selected.is_none() {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Deliver a pushed message. Appended only when its sender is the
    /// selected peer; everything else is dropped silently.
    pub fn deliver(&mut self, message: Message) -> bool {
        match &self.selected {
            Some(peer) if peer.id == message.sender_id => {
                self.messages.push(message);
                true
            }
            _ => false,
        }
    }

    /// Advance the relationship machine for the selected peer.
    pub fn apply_relationship(&mut self, event: RelationshipEvent) {
        self.relationship = self.relationship.on_event(event);
    }

    /// The currently selected peer, if any.
    pub fn selected(&self) -> Option<&Identity> {
        self.selected.as_ref()
    }

    /// The visible message sequence, in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The relationship state for the selected peer.
    pub fn relationship(&self) -> RelationshipState {
        self.relationship
    }

    /// The current epoch, carried by async mutations as a staleness guard.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::{MessageId, UserId};

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

    #[test]
    fn select_clears_messages_and_derives_relationship() {
        let mut me = identity("me");
        me.friends.push(UserId::new("a"));
        let mut conv = Conversation::new();

        let epoch = conv.select(identity("a"), &me);
        assert!(conv.accept_history(epoch, vec![message("m1", "a", "me")]));
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.relationship(), RelationshipState::Friends);

        conv.select(identity("b"), &me);
        assert!(conv.messages().is_empty());
        assert_eq!(conv.relationship(), RelationshipState::Stranger);
    }

    #[test]
    fn stale_history_is_discarded() {
        let me = identity("me");
        let mut conv = Conversation::new();

        // Fetch for A starts, then the user selects B before it resolves.
        let epoch_a = conv.select(identity("a"), &me);
        let epoch_b = conv.select(identity("b"), &me);

        assert!(!conv.accept_history(epoch_a, vec![message("m1", "a", "me")]));
        assert!(conv.messages().is_empty());

        assert!(conv.accept_history(epoch_b, vec![message("m2", "b", "me")]));
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].sender_id, UserId::new("b"));
    }

    #[test]
    fn stale_send_echo_is_discarded() {
        let me = identity("me");
        let mut conv = Conversation::new();

        let epoch_a = conv.select(identity("a"), &me);
        conv.select(identity("b"), &me);

        assert!(!conv.append_sent(epoch_a, message("m1", "me", "a")));
        assert!(conv.messages().is_empty());
    }

    #[test]
    fn delivery_is_scoped_to_selected_peer() {
        let me = identity("me");
        let mut conv = Conversation::new();
        let epoch = conv.select(identity("a"), &me);
        conv.accept_history(epoch, vec![]);

        assert!(conv.deliver(message("m1", "a", "me")));
        assert!(!conv.deliver(message("m2", "c", "me")));

        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].sender_id, UserId::new("a"));
    }

    #[test]
    fn delivery_without_selection_is_dropped() {
        let mut conv = Conversation::new();
        assert!(!conv.deliver(message("m1", "a", "me")));
    }

    #[test]
    fn messages_keep_arrival_order() {
        let me = identity("me");
        let mut conv = Conversation::new();
        let epoch = conv.select(identity("a"), &me);
        conv.accept_history(epoch, vec![]);

        let mut late = message("m1", "a", "me");
        late.created_at = 2_000_000_000;
        let mut early = message("m2", "a", "me");
        early.created_at = 1_000_000_000;

        conv.deliver(late);
        conv.deliver(early);

        // Arrival order wins over created_at order.
        assert_eq!(conv.messages()[0].id, MessageId::new("m1"));
        assert_eq!(conv.messages()[1].id, MessageId::new("m2"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut me = identity("me");
        me.incoming_requests.push(UserId::new("a"));
        let mut conv = Conversation::new();
        let epoch = conv.select(identity("a"), &me);
        conv.accept_history(epoch, vec![message("m1", "a", "me")]);

        conv.clear();
        assert!(conv.selected().is_none());
        assert!(conv.messages().is_empty());
        assert_eq!(conv.relationship(), RelationshipState::Stranger);
        // History from before the clear is stale now.
        assert!(!conv.accept_history(epoch, vec![message("m2", "a", "me")]));
    }
}
