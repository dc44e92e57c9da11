//! Push channel event frames.
//!
//! Every event carried by the persistent push connection, in both
//! directions. Frames are MessagePack-encoded before hitting the wire.

use serde::{Deserialize, Serialize};

use crate::{ChatError, Message, UserId};

/// How a pending friend request was resolved.
///
/// Carried explicitly so the two outcomes can never be confused by
/// event-name overloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// The request was accepted; the pair are now friends.
    Accepted,
    /// The request was withdrawn or declined; back to strangers.
    Cleared,
}

/// All events carried by the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelEvent {
    /// Outbound on connect: scopes presence to this user.
    Hello {
        /// The authenticated user opening the channel.
        user_id: UserId,
    },
    /// Inbound: the full set of peers currently online.
    PresenceUpdate {
        /// Every peer id holding an open channel right now.
        online: Vec<UserId>,
    },
    /// Inbound: a message addressed to this user.
    NewMessage(Message),
    /// Outbound after a successful friend-request post.
    FriendRequestSent {
        /// The peer the request was sent to.
        to: UserId,
    },
    /// Inbound: a peer has sent this user a friend request.
    FriendRequestReceived {
        /// The peer that sent the request.
        from: UserId,
    },
    /// Both directions: a pending request was resolved.
    FriendRequestResolved {
        /// The other party of the request.
        peer: UserId,
        /// Whether the request was accepted or cleared.
        resolution: Resolution,
    },
    /// Outbound graceful disconnect.
    Bye,
}

impl ChannelEvent {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChatError> {
        rmp_serde::to_vec(self).map_err(ChatError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChatError> {
        rmp_serde::from_slice(bytes).map_err(ChatError::Deserialization)
    }

    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::PresenceUpdate { .. } => "presence-update",
            Self::NewMessage(_) => "new-message",
            Self::FriendRequestSent { .. } => "friend-request-sent",
            Self::FriendRequestReceived { .. } => "friend-request-received",
            Self::FriendRequestResolved { .. } => "friend-request-resolved",
            Self::Bye => "bye",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;

    #[test]
    fn presence_roundtrip() {
        let event = ChannelEvent::PresenceUpdate {
            online: vec![UserId::new("a"), UserId::new("b")],
        };
        let bytes = event.to_bytes().unwrap();
        let restored = ChannelEvent::from_bytes(&bytes).unwrap();
        assert_eq!(restored, event);
    }

    #[test]
    fn new_message_roundtrip() {
        let event = ChannelEvent::NewMessage(Message {
            id: MessageId::new("m-1"),
            sender_id: UserId::new("a"),
            recipient_id: UserId::new("b"),
            text: Some("hello".into()),
            image_url: None,
            created_at: 1_705_000_000,
        });
        let bytes = event.to_bytes().unwrap();
        assert_eq!(ChannelEvent::from_bytes(&bytes).unwrap(), event);
    }

    #[test]
    fn resolution_kind_is_explicit() {
        let accepted = ChannelEvent::FriendRequestResolved {
            peer: UserId::new("b"),
            resolution: Resolution::Accepted,
        };
        let cleared = ChannelEvent::FriendRequestResolved {
            peer: UserId::new("b"),
            resolution: Resolution::Cleared,
        };
        // Same event name, distinguishable payloads.
        assert_eq!(accepted.name(), cleared.name());
        assert_ne!(accepted.to_bytes().unwrap(), cleared.to_bytes().unwrap());
    }

    #[test]
    fn garbage_frame_rejected() {
        let err = ChannelEvent::from_bytes(&[0xFF, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, ChatError::Deserialization(_)));
    }
}
