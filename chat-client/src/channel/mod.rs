//! Push channel abstraction.
//!
//! A single persistent bidirectional connection carrying named events,
//! keyed by the authenticated user. The session manager owns channel
//! lifecycle; the conversation manager only binds and unbinds handlers.
//!
//! # Handler contract
//!
//! Inbound events fan out to handlers registered per [`HandlerScope`].
//! `bind` replaces whatever handler the scope had, so a scope can never
//! accumulate two handlers - there is at most one active handler per scope
//! at any time, by construction.

mod mock;
mod tcp;

pub use mock::MockChannel;
pub use tcp::{TcpChannel, MAX_FRAME_SIZE};

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use chat_types::{ChannelEvent, UserId};

/// Push channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// No open connection.
    #[error("not connected")]
    NotConnected,

    /// The connection was closed by the other side.
    #[error("connection closed")]
    Closed,

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// A frame failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Which consumer a handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerScope {
    /// Session-level events: presence and friend-request lifecycle.
    Session,
    /// Conversation-level events: message delivery for the selected peer.
    Conversation,
}

/// A bound event handler. Handlers are synchronous and must not block;
/// they run on the channel's reader task.
pub type EventHandler = Box<dyn Fn(ChannelEvent) + Send + Sync>;

/// Callback fired when an open connection drops unexpectedly.
pub type DisconnectHandler = Box<dyn Fn() + Send + Sync>;

/// The persistent push connection.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Open the connection to `address` and identify as `user`.
    ///
    /// Sends the `hello` event so the server can scope presence.
    async fn open(&self, address: &str, user: &UserId) -> Result<(), ChannelError>;

    /// Whether the connection is currently open.
    fn is_connected(&self) -> bool;

    /// Send an event to the server.
    async fn emit(&self, event: ChannelEvent) -> Result<(), ChannelError>;

    /// Register the handler for a scope, replacing any previous one.
    fn bind(&self, scope: HandlerScope, handler: EventHandler);

    /// Remove the handler for a scope. Safe when none is bound.
    fn unbind(&self, scope: HandlerScope);

    /// Register the callback fired when an open connection drops,
    /// replacing any previous one. A deliberate [`PushChannel::close`]
    /// does not fire it.
    fn on_disconnect(&self, callback: DisconnectHandler);

    /// Close the connection gracefully. Safe to call when not connected.
    async fn close(&self);
}

/// Handler registry shared by channel implementations.
///
/// Enforces the at-most-one-handler-per-scope invariant: `bind` is an
/// insert-or-replace, never an append.
#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: Mutex<HashMap<HandlerScope, EventHandler>>,
}

impl HandlerTable {
    pub(crate) fn bind(&self, scope: HandlerScope, handler: EventHandler) {
        self.handlers.lock().unwrap().insert(scope, handler);
    }

    pub(crate) fn unbind(&self, scope: HandlerScope) {
        self.handlers.lock().unwrap().remove(&scope);
    }

    /// Fan an inbound event out to every bound handler.
    pub(crate) fn dispatch(&self, event: &ChannelEvent) {
        let handlers = self.handlers.lock().unwrap();
        for handler in handlers.values() {
            handler(event.clone());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }
}
