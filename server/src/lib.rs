//! Room relay for roomsync peers.
//!
//! Peers create or join short-coded rooms; transform updates from one
//! member are copied to every other member of the same room.

pub mod config;
pub mod relay;
pub mod rooms;

pub use config::RelayConfig;
pub use relay::{Relay, RelayError};
