//! Room registry — which peer addresses share which room.
//!
//! DESIGN
//! ======
//! Two maps kept in lockstep: `rooms` (code to member set) and `peers`
//! (address to code). A peer belongs to at most one room. Rooms exist only
//! while they have members; the last departure deletes the room so its
//! code can be reissued.
//!
//! The registry is plain data owned by the relay loop. No locking.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use rand::Rng;

/// Characters a generated room code is drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random draws tried before a create gives up.
pub const MAX_CODE_ATTEMPTS: usize = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound(String),
    #[error("No room codes available")]
    CodesExhausted,
}

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<String, HashSet<SocketAddr>>,
    peers: HashMap<SocketAddr, String>,
    code_len: usize,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(code_len: usize) -> Self {
        Self { rooms: HashMap::new(), peers: HashMap::new(), code_len: code_len.max(1) }
    }

    /// Open a fresh room with `creator` as its only member. The creator
    /// leaves any previous room first, even if no code can be found.
    ///
    /// # Errors
    ///
    /// [`RoomError::CodesExhausted`] when every code is taken, or no free
    /// code turned up within [`MAX_CODE_ATTEMPTS`] draws.
    pub fn create(&mut self, creator: SocketAddr) -> Result<String, RoomError> {
        self.create_with(creator, &mut rand::rng())
    }

    /// As [`RoomRegistry::create`], drawing the code from `rng`.
    ///
    /// # Errors
    ///
    /// As [`RoomRegistry::create`].
    pub fn create_with<R: Rng + ?Sized>(&mut self, creator: SocketAddr, rng: &mut R) -> Result<String, RoomError> {
        self.leave(creator);
        if self.rooms.len() >= self.code_space() {
            return Err(RoomError::CodesExhausted);
        }
        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| generate_code(rng, self.code_len))
            .find(|candidate| !self.rooms.contains_key(candidate))
            .ok_or(RoomError::CodesExhausted)?;
        self.rooms.insert(code.clone(), HashSet::from([creator]));
        self.peers.insert(creator, code.clone());
        Ok(code)
    }

    /// Number of distinct codes of the configured length (saturating).
    #[must_use]
    pub fn code_space(&self) -> usize {
        u32::try_from(self.code_len).map_or(usize::MAX, |len| {
            CODE_ALPHABET.len().checked_pow(len).unwrap_or(usize::MAX)
        })
    }

    /// Add `peer` to an existing room, leaving any other room first.
    ///
    /// # Errors
    ///
    /// [`RoomError::NotFound`] if no room has this code. Membership is
    /// unchanged in that case.
    pub fn join(&mut self, peer: SocketAddr, code: &str) -> Result<(), RoomError> {
        if !self.rooms.contains_key(code) {
            return Err(RoomError::NotFound(code.to_owned()));
        }
        if self.peers.get(&peer).is_some_and(|current| current == code) {
            return Ok(());
        }
        self.leave(peer);
        if let Some(members) = self.rooms.get_mut(code) {
            members.insert(peer);
        }
        self.peers.insert(peer, code.to_owned());
        Ok(())
    }

    /// Remove `peer` from its room. Returns the room code if the room was
    /// deleted because it became empty.
    pub fn leave(&mut self, peer: SocketAddr) -> Option<String> {
        let code = self.peers.remove(&peer)?;
        let members = self.rooms.get_mut(&code)?;
        members.remove(&peer);
        if members.is_empty() {
            self.rooms.remove(&code);
            return Some(code);
        }
        None
    }

    #[must_use]
    pub fn room_of(&self, peer: SocketAddr) -> Option<&str> {
        self.peers.get(&peer).map(String::as_str)
    }

    /// Everyone sharing `peer`'s room, excluding `peer`. Empty when `peer`
    /// is in no room.
    #[must_use]
    pub fn others(&self, peer: SocketAddr) -> Vec<SocketAddr> {
        self.room_of(peer)
            .and_then(|code| self.rooms.get(code))
            .map(|members| members.iter().copied().filter(|m| *m != peer).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn members(&self, code: &str) -> usize {
        self.rooms.get(code).map_or(0, HashSet::len)
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn generate_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
