//! # chat-core
//!
//! Pure logic for driftchat (no I/O, instant tests).
//!
//! This crate implements the state machines and bookkeeping for the chat
//! session without any network I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (REST calls, push channel frames) is performed by
//! `chat-client`, which drives these machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conversation;
pub mod relationship;
pub mod session;

pub use conversation::Conversation;
pub use relationship::{RelationshipEvent, RelationshipState};
pub use session::{SessionAction, SessionEvent, SessionPhase};
