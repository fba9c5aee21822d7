//! Sync loop — per-tick sender/receiver logic for the shared object.
//!
//! DESIGN
//! ======
//! Each tick runs exactly one branch, chosen from the session:
//! - Sender (locally controlled): broadcast the live snapshot when it moved
//!   past the thresholds relative to the last *sent* snapshot and at least
//!   one send interval has passed since the last send.
//! - Receiver (remote controlled): once a target has arrived and any release
//!   cooldown is over, smooth the live snapshot toward the target.
//! - Idle (not in a room): nothing.
//!
//! INVARIANTS
//! ==========
//! The last-sent marker moves only after the send closure reports success.
//! Detection alone never moves it, so a change that failed to go out is
//! retried on the next eligible tick instead of being forgotten.
//!
//! The receiver branch copies the interpolated pose into the last-sent
//! snapshot (not the send timestamp). Taking control later therefore does not
//! mistake smoothing motion for a local edit.

use std::time::{Duration, Instant};

use frames::Message;
use tracing::{debug, trace};

use crate::config::SyncConfig;
use crate::session::Session;
use crate::transform::{Snapshot, Thresholds};

// =============================================================================
// STATE
// =============================================================================

/// What was last put on the wire, and when.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutboundState {
    pub last_sent: Snapshot,
    pub last_send_at: Instant,
}

/// Latest transform received from the controlling peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InboundTarget {
    pub target: Snapshot,
    /// Set by the first received transform; never cleared.
    pub has_data: bool,
}

/// Which half of the loop a tick runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Idle,
    Sender,
    Receiver,
}

impl Branch {
    #[must_use]
    pub fn select(session: &Session) -> Self {
        match (session.in_room(), session.locally_controlled()) {
            (false, _) => Self::Idle,
            (true, true) => Self::Sender,
            (true, false) => Self::Receiver,
        }
    }
}

/// Result of one tick, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Idle,
    /// Sender: nothing moved past the thresholds.
    Unchanged,
    /// Sender: a change is pending but the send interval has not elapsed.
    Throttled,
    Sent,
    /// Sender: the transport refused the datagram; marker left untouched.
    SendFailed,
    /// Receiver: no target has arrived yet.
    AwaitingData,
    /// Receiver: release cooldown still running.
    CoolingDown,
    Interpolated,
}

// =============================================================================
// LOOP
// =============================================================================

#[derive(Debug, Clone)]
pub struct SyncLoop {
    send_interval: Duration,
    thresholds: Thresholds,
    interpolation_speed: f32,
    outbound: OutboundState,
    inbound: InboundTarget,
    last_tick: Option<Instant>,
}

impl SyncLoop {
    /// `initial` seeds both the last-sent marker and the target; `epoch`
    /// counts as the last send, so the first broadcast waits one interval.
    #[must_use]
    pub fn new(config: &SyncConfig, initial: Snapshot, epoch: Instant) -> Self {
        Self {
            send_interval: config.send_interval(),
            thresholds: config.thresholds,
            interpolation_speed: config.interpolation_speed,
            outbound: OutboundState { last_sent: initial, last_send_at: epoch },
            inbound: InboundTarget { target: initial, has_data: false },
            last_tick: None,
        }
    }

    #[must_use]
    pub fn outbound(&self) -> &OutboundState {
        &self.outbound
    }

    #[must_use]
    pub fn inbound(&self) -> &InboundTarget {
        &self.inbound
    }

    #[must_use]
    pub fn send_interval(&self) -> Duration {
        self.send_interval
    }

    /// Store a new remote target. Returns `true` when the target scale
    /// changed (always on the first target).
    pub fn set_target(&mut self, target: Snapshot) -> bool {
        let scale_changed = !self.inbound.has_data || self.inbound.target.scale != target.scale;
        self.inbound = InboundTarget { target, has_data: true };
        scale_changed
    }

    /// True when `live` moved past the thresholds since the last send.
    #[must_use]
    pub fn has_pending_change(&self, live: &Snapshot) -> bool {
        live.differs_from(&self.outbound.last_sent, &self.thresholds)
    }

    /// True when at least one send interval has passed since the last send.
    #[must_use]
    pub fn send_window_open(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.outbound.last_send_at) >= self.send_interval
    }

    /// Mark `snapshot` as transmitted at `now`. Call only after a send succeeded.
    pub fn record_sent(&mut self, snapshot: Snapshot, now: Instant) {
        self.outbound = OutboundState { last_sent: snapshot, last_send_at: now };
    }

    /// Run one tick. `send` transmits encoded bytes and reports success.
    pub fn step<F>(&mut self, session: &Session, live: &mut Snapshot, now: Instant, send: F) -> Step
    where
        F: FnOnce(&[u8]) -> bool,
    {
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |prev| now.saturating_duration_since(prev));
        self.last_tick = Some(now);

        match Branch::select(session) {
            Branch::Idle => Step::Idle,
            Branch::Sender => self.sender_step(live, now, send),
            Branch::Receiver => self.receiver_step(session, live, now, dt),
        }
    }

    fn sender_step<F>(&mut self, live: &Snapshot, now: Instant, send: F) -> Step
    where
        F: FnOnce(&[u8]) -> bool,
    {
        if !self.has_pending_change(live) {
            return Step::Unchanged;
        }
        if !self.send_window_open(now) {
            return Step::Throttled;
        }

        let snapshot = *live;
        let bytes = frames::encode_bytes(&Message::Transform(snapshot.into()));
        if send(&bytes) {
            self.record_sent(snapshot, now);
            trace!(position = ?snapshot.position, "sync: transform sent");
            Step::Sent
        } else {
            debug!("sync: transform send failed, will retry");
            Step::SendFailed
        }
    }

    fn receiver_step(&mut self, session: &Session, live: &mut Snapshot, now: Instant, dt: Duration) -> Step {
        if !self.inbound.has_data {
            return Step::AwaitingData;
        }
        if !session.cooldown_elapsed(now) {
            return Step::CoolingDown;
        }

        *live = live.interpolate_toward(&self.inbound.target, self.interpolation_speed, dt.as_secs_f32());
        self.outbound.last_sent = *live;
        Step::Interpolated
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
