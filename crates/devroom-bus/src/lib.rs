//! Devroom Bus - session registry and room-scoped broadcast
//!
//! Tracks which live connections belong to which project room and fans
//! events out to room members:
//! - `join` registers a connection under a room; `leave` is idempotent
//! - `publish` delivers to every *other* member, never echoing the sender
//! - Delivery is at-least-once with no cross-sender ordering; FIFO holds
//!   only along one sender's path (each receiver is a dedicated channel)
//! - Publishing to an empty or unknown room is a no-op, not an error
//! - Missed events are never replayed; reconnecting clients re-fetch
//!   authoritative state from the store

#![warn(unreachable_pub)]

pub mod event;
pub mod registry;

pub use event::{BusEvent, PROJECT_MESSAGE};
pub use registry::{Connection, ConnectionId, SessionRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
