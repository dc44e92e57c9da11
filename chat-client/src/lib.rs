//! # chat-client
//!
//! Client engine for driftchat.
//!
//! Keeps a user's chat session - messages, peer presence, and the
//! friend-relationship workflow - consistent across two channels:
//! request/response REST snapshots and an asynchronous push channel.
//!
//! ## Architecture
//!
//! ```text
//! UI actions → SessionManager ──owns──→ PushChannel
//!            → ConversationManager ──binds handlers on──→ PushChannel
//!                      ↓
//!                 chat-core (pure state machines)
//! ```
//!
//! Both managers are explicitly constructed with an injected transport and
//! channel; there are no process-wide singletons. All remote failures are
//! converted into notifications and never touch last-known-good state.
//!
//! ## Example
//!
//! ```ignore
//! use chat_client::{ClientConfig, ConversationManager, SessionManager, TracingNotifier};
//!
//! let config = ClientConfig::new("http://localhost:3000/api", "localhost:4460");
//! let rest = Arc::new(HttpRest::new(&config.rest_address));
//! let channel = Arc::new(TcpChannel::new());
//! let notifier = Arc::new(TracingNotifier);
//!
//! let session = SessionManager::new(config, rest.clone(), channel.clone(), notifier.clone());
//! let conversation = ConversationManager::new(rest, channel, notifier);
//!
//! session.sign_in(credentials, &conversation).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod conversation;
pub mod notify;
pub mod rest;
pub mod session;

pub use channel::{
    ChannelError, DisconnectHandler, EventHandler, HandlerScope, MockChannel, PushChannel,
    TcpChannel,
};
pub use config::ClientConfig;
pub use conversation::ConversationManager;
pub use notify::{MemoryNotifier, NoticeKind, Notifier, TracingNotifier};
pub use rest::{HttpRest, MockRest, RestError, RestTransport};
pub use session::SessionManager;
