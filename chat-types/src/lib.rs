//! # chat-types
//!
//! Wire format types for the driftchat session protocol.
//!
//! This crate provides the foundational types used across all driftchat crates:
//! - [`UserId`], [`MessageId`] - Opaque server-assigned identifiers
//! - [`Identity`], [`Message`], [`Draft`] - REST payloads, validated at the
//!   transport boundary
//! - [`ChannelEvent`] - Push channel event frames
//! - [`ChatError`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod identity;
mod ids;
mod message;

pub use error::ChatError;
pub use events::{ChannelEvent, Resolution};
pub use identity::{Identity, Relation};
pub use ids::{MessageId, UserId};
pub use message::{Credentials, Draft, Message, ProfileUpdate};
