//! Room session state — membership and control ownership.
//!
//! DESIGN
//! ======
//! `Session` is plain data mutated only through its transition methods.
//! Membership flips to `in_room` only when the relay confirms the request
//! that is outstanding: `room_created` answers a create, `joined_room` with
//! the same code answers a join. Sending a request never changes it, and a
//! reply that matches nothing outstanding is ignored. Releasing local control opens a short
//! cooldown during which inbound targets are held back, so the object does
//! not snap back to a stale remote pose. The hold exists only while control
//! is released: taking control clears it. A cooldown too long to express as
//! an `Instant` holds until control is taken again.

use std::time::{Duration, Instant};

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Validate and canonicalize a room code typed by a user.
///
/// # Errors
///
/// Returns [`SessionError::InvalidArgument`] for empty or whitespace-only codes.
pub fn normalize_room_code(code: &str) -> Result<String, SessionError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(SessionError::InvalidArgument("room code must not be empty"));
    }
    Ok(code.to_uppercase())
}

/// Request sent to the relay and not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRequest {
    Create,
    Join(String),
}

/// How long inbound targets are held back after releasing control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseHold {
    Until(Instant),
    /// The cooldown overflowed `Instant`; never elapses on its own.
    Indefinite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    room_id: Option<String>,
    in_room: bool,
    locally_controlled: bool,
    pending: Option<PendingRequest>,
    release: Option<ReleaseHold>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Observers ---

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    #[must_use]
    pub fn in_room(&self) -> bool {
        self.in_room
    }

    #[must_use]
    pub fn locally_controlled(&self) -> bool {
        self.locally_controlled
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn release_hold(&self) -> Option<ReleaseHold> {
        self.release
    }

    /// Deadline of a finite hold, if one is running.
    #[must_use]
    pub fn release_deadline(&self) -> Option<Instant> {
        match self.release {
            Some(ReleaseHold::Until(deadline)) => Some(deadline),
            Some(ReleaseHold::Indefinite) | None => None,
        }
    }

    /// True once any release cooldown has run out (or none was set).
    #[must_use]
    pub fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.release {
            None => true,
            Some(ReleaseHold::Until(deadline)) => now >= deadline,
            Some(ReleaseHold::Indefinite) => false,
        }
    }

    // --- Transitions ---

    /// A new connection attempt is starting with `request`; any previous
    /// membership is void.
    pub fn begin_connect(&mut self, request: PendingRequest) {
        self.room_id = None;
        self.in_room = false;
        self.pending = Some(request);
    }

    /// Apply a `room_created` reply. Returns `false` (and changes nothing)
    /// unless a create is outstanding.
    pub fn confirm_created(&mut self, room_code: String) -> bool {
        if self.pending != Some(PendingRequest::Create) {
            return false;
        }
        self.joined(room_code);
        true
    }

    /// Apply a `joined_room` reply. Returns `false` (and changes nothing)
    /// unless a join for the same code is outstanding.
    pub fn confirm_joined(&mut self, room_code: String) -> bool {
        match &self.pending {
            Some(PendingRequest::Join(requested)) if *requested == room_code => {
                self.joined(room_code);
                true
            }
            _ => false,
        }
    }

    /// The relay confirmed membership of `room_code`.
    pub fn joined(&mut self, room_code: String) {
        self.room_id = Some(room_code);
        self.in_room = true;
        self.pending = None;
    }

    /// Tear down membership after a stop or a relay error.
    pub fn disconnect(&mut self) {
        self.room_id = None;
        self.in_room = false;
        self.pending = None;
    }

    pub fn start_local_control(&mut self) {
        self.locally_controlled = true;
        self.release = None;
    }

    pub fn stop_local_control(&mut self, now: Instant, cooldown: Duration) {
        self.locally_controlled = false;
        self.release = Some(now.checked_add(cooldown).map_or(ReleaseHold::Indefinite, ReleaseHold::Until));
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
