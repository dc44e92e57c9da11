//! Friend-relationship state machine.
//!
//! Exactly one [`RelationshipState`] exists per (self, selected peer) pair.
//! The initial value is derived from the authoritative [`Identity`] relation
//! lists; after that it advances only through [`RelationshipState::on_event`],
//! a single transition table. There is deliberately no second path that
//! mutates the state, so two handlers can never race on the same event.

use chat_types::{Identity, Relation, Resolution, UserId};

/// The friend-request state machine value for a (self, peer) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationshipState {
    /// No relation in any direction.
    #[default]
    Stranger,
    /// We sent a request that is still pending.
    RequestSent,
    /// The peer sent us a request that is still pending.
    RequestReceived,
    /// Established friendship.
    Friends,
}

/// Inputs that advance the relationship machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipEvent {
    /// Our friend-request POST succeeded.
    LocalRequestSent,
    /// We accepted the peer's pending request.
    LocalAccept,
    /// The peer sent us a request (push event).
    PeerRequested,
    /// A pending request was resolved (push event).
    PeerResolved(Resolution),
}

impl RelationshipState {
    /// Derive the initial state from the authoritative identity.
    ///
    /// The identity's relation lists are disjoint (validated at the
    /// transport boundary), so at most one branch can match.
    pub fn derive(me: &Identity, peer: &UserId) -> Self {
        match me.relation_to(peer) {
            Some(Relation::Friend) => Self::Friends,
            Some(Relation::Outgoing) => Self::RequestSent,
            Some(Relation::Incoming) => Self::RequestReceived,
            None => Self::Stranger,
        }
    }

    /// Advance the machine. Invalid (state, event) pairs leave the state
    /// unchanged.
    pub fn on_event(self, event: RelationshipEvent) -> Self {
        use RelationshipEvent::*;
        match (self, event) {
            (Self::Stranger, LocalRequestSent) => Self::RequestSent,
            (Self::Stranger, PeerRequested) => Self::RequestReceived,
            (Self::RequestReceived, LocalAccept) => Self::Friends,
            (Self::RequestSent, PeerResolved(Resolution::Accepted)) => Self::Friends,
            (Self::RequestReceived, PeerResolved(Resolution::Accepted)) => Self::Friends,
            (Self::RequestSent, PeerResolved(Resolution::Cleared)) => Self::Stranger,
            (Self::RequestReceived, PeerResolved(Resolution::Cleared)) => Self::Stranger,
            (state, _) => state,
        }
    }
}
