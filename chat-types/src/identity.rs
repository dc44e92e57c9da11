//! The authoritative user identity returned by the REST service.

use serde::{Deserialize, Serialize};

use crate::{ChatError, UserId};

/// Which relation list contains a given peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The peer is an established friend.
    Friend,
    /// We sent this peer a request that is still pending.
    Outgoing,
    /// This peer sent us a request that is still pending.
    Incoming,
}

/// A user identity as returned by every auth-state-changing endpoint.
///
/// Replaced wholesale on each response; never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-assigned user id.
    pub id: UserId,
    /// Display name shown to peers.
    pub display_name: String,
    /// Optional avatar reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Established friends.
    #[serde(default)]
    pub friends: Vec<UserId>,
    /// Peers we have sent a pending request to.
    #[serde(default)]
    pub outgoing_requests: Vec<UserId>,
    /// Peers that have sent us a pending request.
    #[serde(default)]
    pub incoming_requests: Vec<UserId>,
}

impl Identity {
    /// Validate an identity decoded at the transport boundary.
    ///
    /// A peer id may appear in at most one of the three relation lists;
    /// a payload violating that is rejected rather than propagated.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.id.is_empty() {
            return Err(ChatError::Validation("identity has empty id".into()));
        }
        if self.display_name.is_empty() {
            return Err(ChatError::Validation("identity has empty display name".into()));
        }
        for peer in &self.friends {
            if self.outgoing_requests.contains(peer) || self.incoming_requests.contains(peer) {
                return Err(ChatError::Validation(format!(
                    "peer {peer} appears in more than one relation list"
                )));
            }
        }
        for peer in &self.outgoing_requests {
            if self.incoming_requests.contains(peer) {
                return Err(ChatError::Validation(format!(
                    "peer {peer} appears in more than one relation list"
                )));
            }
        }
        Ok(())
    }

    /// Which relation list (if any) contains the given peer.
    pub fn relation_to(&self, peer: &UserId) -> Option<Relation> {
        if self.friends.contains(peer) {
            Some(Relation::Friend)
        } else if self.outgoing_requests.contains(peer) {
            Some(Relation::Outgoing)
        } else if self.incoming_requests.contains(peer) {
            Some(Relation::Incoming)
        } else {
            None
        }
    }
}
