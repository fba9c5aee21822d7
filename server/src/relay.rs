//! UDP relay loop — room requests and transform fan-out.
//!
//! DESIGN
//! ======
//! A single task owns the socket and the [`RoomRegistry`]. Each datagram is
//! classified by [`handle`] into a [`Delivery`] without touching the socket;
//! the loop then performs the sends. Transforms are forwarded as the raw
//! datagram bytes, never re-encoded.
//!
//! ERROR HANDLING
//! ==============
//! Undecodable datagrams are logged and dropped. A failed send to a peer
//! evicts that peer from its room (UDP has no disconnect, so this is the
//! only departure signal). Receive errors are logged and the loop keeps
//! going.

use std::net::SocketAddr;

use frames::Message;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::rooms::RoomRegistry;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the loop should do with one inbound datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Send `message` back to the requester.
    Reply { to: SocketAddr, message: Message },
    /// Copy the inbound datagram unchanged to each address.
    Forward { to: Vec<SocketAddr> },
    Drop,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Apply one datagram from `from` to `rooms` and decide what to send.
pub fn handle(rooms: &mut RoomRegistry, datagram: &[u8], from: SocketAddr) -> Delivery {
    let message = match frames::decode_bytes(datagram) {
        Ok(Some(message)) => message,
        Ok(None) => {
            debug!(%from, "relay: unknown action ignored");
            return Delivery::Drop;
        }
        Err(e) => {
            warn!(%from, error = %e, len = datagram.len(), "relay: undecodable datagram dropped");
            return Delivery::Drop;
        }
    };

    match message {
        Message::CreateRoom => match rooms.create(from) {
            Ok(room_code) => {
                info!(%from, %room_code, "relay: room created");
                Delivery::Reply { to: from, message: Message::RoomCreated { room_code } }
            }
            Err(e) => {
                warn!(%from, rooms = rooms.room_count(), error = %e, "relay: create refused");
                Delivery::Reply { to: from, message: Message::Error { message: e.to_string() } }
            }
        },
        Message::JoinRoom { room_code } => match rooms.join(from, &room_code) {
            Ok(()) => {
                info!(%from, %room_code, members = rooms.members(&room_code), "relay: peer joined");
                Delivery::Reply { to: from, message: Message::JoinedRoom { room_code } }
            }
            Err(e) => {
                info!(%from, %room_code, "relay: join for unknown room");
                Delivery::Reply { to: from, message: Message::Error { message: e.to_string() } }
            }
        },
        Message::Transform(_) => {
            if rooms.room_of(from).is_none() {
                warn!(%from, "relay: transform from peer outside any room");
                return Delivery::Drop;
            }
            Delivery::Forward { to: rooms.others(from) }
        }
        Message::RoomCreated { .. } | Message::JoinedRoom { .. } | Message::Error { .. } => {
            debug!(%from, action = message.action(), "relay: server-bound reply ignored");
            Delivery::Drop
        }
    }
}

/// Drop `peer` after a failed send. Returns whether it was in a room.
pub fn evict(rooms: &mut RoomRegistry, peer: SocketAddr) -> bool {
    let Some(room_code) = rooms.room_of(peer).map(str::to_owned) else {
        debug!(%peer, "relay: send failed to peer outside any room");
        return false;
    };
    if rooms.leave(peer).is_some() {
        info!(%peer, %room_code, "relay: peer evicted, room empty and deleted");
    } else {
        info!(%peer, %room_code, "relay: peer evicted");
    }
    true
}

// =============================================================================
// SOCKET LOOP
// =============================================================================

pub struct Relay {
    socket: UdpSocket,
    rooms: RoomRegistry,
}

impl Relay {
    /// Bind the relay socket.
    ///
    /// # Errors
    ///
    /// [`RelayError::Bind`] if the address is unusable or taken.
    pub async fn bind(config: &RelayConfig) -> Result<Self, RelayError> {
        let addr = config.bind_addr();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        Ok(Self { socket, rooms: RoomRegistry::new(config.room_code_len) })
    }

    /// # Errors
    ///
    /// Propagates the socket's `local_addr` failure.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve until the task is dropped.
    pub async fn run(mut self) {
        let mut buf = [0u8; frames::MAX_DATAGRAM_BYTES];
        loop {
            let (len, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "relay: recv failed");
                    continue;
                }
            };
            if len == 0 {
                continue;
            }
            let datagram = &buf[..len];
            let delivery = handle(&mut self.rooms, datagram, from);
            self.deliver(delivery, datagram).await;
        }
    }

    async fn deliver(&mut self, delivery: Delivery, datagram: &[u8]) {
        match delivery {
            Delivery::Reply { to, message } => {
                let bytes = frames::encode_bytes(&message);
                if let Err(e) = self.socket.send_to(&bytes, to).await {
                    warn!(%to, action = message.action(), error = %e, "relay: reply failed");
                    self.evict(to);
                }
            }
            Delivery::Forward { to } => {
                for peer in to {
                    if let Err(e) = self.socket.send_to(datagram, peer).await {
                        warn!(%peer, error = %e, "relay: forward failed");
                        self.evict(peer);
                    }
                }
            }
            Delivery::Drop => {}
        }
    }

    fn evict(&mut self, peer: SocketAddr) {
        evict(&mut self.rooms, peer);
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
