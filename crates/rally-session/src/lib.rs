//! Session binding for Rally.
//!
//! A live connection becomes a room participant by being *bound* to a
//! `(RoomId, PlayerId)` pair. Every command after `create_room` /
//! `join_room` is resolved through that binding, so the table here is the
//! single answer to "who is this socket?".
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby (above)        ← binds on create/join, unbinds on leave/disconnect
//!     ↕
//! Session (this crate) ← ConnectionId ⇄ (RoomId, PlayerId)
//!     ↕
//! Transport/Protocol   ← provide ConnectionId, RoomId, PlayerId
//! ```

mod binding;
mod error;

pub use binding::{Binding, BindingTable};
pub use error::SessionError;
