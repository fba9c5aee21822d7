//! Client core for sharing one object's transform inside a relay room.
//!
//! Peers join a room on a UDP relay. Whichever peer holds local control
//! broadcasts the object's transform at a throttled rate; every other peer
//! smooths its copy toward the last transform it received.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`client`] | [`client::SyncClient`], the single long-lived session object |
//! | [`transport`] | UDP socket and background receive worker |
//! | [`dispatch`] | Worker-to-tick hand-off queue and inbound routing |
//! | [`session`] | Room membership and control ownership |
//! | [`sync`] | Per-tick sender/receiver logic |
//! | [`transform`] | Snapshot value type, change detection, interpolation |
//! | [`config`] | Tuning from environment variables |

pub mod client;
pub mod config;
pub mod dispatch;
pub mod session;
pub mod sync;
pub mod transform;
pub mod transport;

pub use client::{Status, SyncClient};
pub use config::SyncConfig;
pub use session::SessionError;
pub use transform::{Snapshot, Thresholds};
pub use transport::TransportError;
