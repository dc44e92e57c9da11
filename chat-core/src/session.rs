//! Session lifecycle state machine.
//!
//! Pure `(state, event) → (state, actions)` transitions; the actual channel
//! I/O is performed by the session manager in `chat-client`, which interprets
//! the returned actions.

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No authenticated identity.
    #[default]
    SignedOut,
    /// Authenticated but the push channel is not open.
    ///
    /// A transient state: `connect()` is expected to repair it.
    SignedIn,
    /// Authenticated with an open push channel.
    Connected,
}

/// Events that move the session through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Sign-in (or sign-up) returned an identity.
    SignInSucceeded,
    /// The push channel opened.
    ChannelOpened,
    /// The push channel dropped or failed to open.
    ChannelLost,
    /// The user signed out.
    SignOutRequested,
}

/// Actions for the session manager to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Open the push channel for the current identity.
    OpenChannel,
    /// Close the push channel and drop the reference.
    CloseChannel,
}

impl SessionPhase {
    /// Process an event and return the new phase plus actions to execute.
    pub fn on_event(self, event: SessionEvent) -> (Self, Vec<SessionAction>) {
        use SessionEvent::*;
        match (self, event) {
            (Self::SignedOut, SignInSucceeded) => (Self::SignedIn, vec![SessionAction::OpenChannel]),
            (Self::SignedIn, ChannelOpened) => (Self::Connected, vec![]),
            (Self::Connected, ChannelLost) => (Self::SignedIn, vec![SessionAction::OpenChannel]),
            (Self::SignedIn, SignOutRequested) | (Self::Connected, SignOutRequested) => {
                (Self::SignedOut, vec![SessionAction::CloseChannel])
            }
            // Invalid transitions - stay in current phase
            (phase, _) => (phase, vec![]),
        }
    }

    /// Whether an identity is currently established.
    pub fn is_signed_in(&self) -> bool {
        !matches!(self, Self::SignedOut)
    }
}
