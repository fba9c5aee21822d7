//! Inbound dispatch — the hand-off from the receive worker to the tick loop.
//!
//! DESIGN
//! ======
//! The receive worker owns an [`Outlet`] and only ever pushes decoded
//! [`Message`] values. The tick loop owns the matching [`Inbox`], drains it
//! once per tick, and turns each message into an [`Outcome`] with [`route`].
//! Routing is pure; the client applies outcomes to session and sync state,
//! so nothing on the worker side can touch that state.
//!
//! The queue is an unbounded `std::sync::mpsc` channel: pushes never block,
//! and delivery order is push order.

use std::sync::mpsc;

use frames::Message;
use tracing::debug;

use crate::transform::Snapshot;

// =============================================================================
// PENDING ACTION QUEUE
// =============================================================================

/// Create a connected producer/consumer pair.
#[must_use]
pub fn channel() -> (Outlet, Inbox) {
    let (tx, rx) = mpsc::channel();
    (Outlet { tx }, Inbox { rx })
}

/// Producer half, held by the receive worker.
#[derive(Debug, Clone)]
pub struct Outlet {
    tx: mpsc::Sender<Message>,
}

impl Outlet {
    /// Enqueue a decoded message. Returns `false` once the inbox is gone.
    pub fn push(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Consumer half, held by the tick loop.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<Message>,
}

impl Inbox {
    /// Take everything queued so far, oldest first. Never blocks.
    #[must_use]
    pub fn drain(&self) -> Vec<Message> {
        self.rx.try_iter().collect()
    }
}

// =============================================================================
// ROUTING
// =============================================================================

/// What the tick loop should do with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The relay opened `room_code` in answer to a create.
    Created { room_code: String },
    /// The relay admitted us to `room_code` in answer to a join.
    Joined { room_code: String },
    /// A peer broadcast a new target transform.
    Target(Snapshot),
    /// The relay reported an error; the session must be torn down.
    Disconnect { reason: String },
    /// Nothing to do.
    Ignore,
}

/// Classify one inbound message.
#[must_use]
pub fn route(message: Message) -> Outcome {
    match message {
        Message::RoomCreated { room_code } => Outcome::Created { room_code },
        Message::JoinedRoom { room_code } => Outcome::Joined { room_code },
        Message::Transform(update) => Outcome::Target(Snapshot::from(update)),
        Message::Error { message } => Outcome::Disconnect { reason: message },
        Message::CreateRoom | Message::JoinRoom { .. } => {
            debug!(action = message.action(), "dispatch: ignoring client-side request echoed back");
            Outcome::Ignore
        }
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
