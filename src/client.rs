//! `SyncClient` — the long-lived session object collaborators hold.
//!
//! DESIGN
//! ======
//! One `SyncClient` owns the session, the sync loop, and at most one live
//! transport. It is constructed once and passed by reference; there is no
//! global accessor. Everything here runs on the caller's tick thread.
//!
//! LIFECYCLE
//! =========
//! 1. `create_room` / `join_room` tear down any previous connection, open a
//!    new transport, and send one request. Membership stays false.
//! 2. `tick` drains the inbox: a `room_created` / `joined_room` reply that
//!    answers the outstanding request sets membership, a transform sets the remote target, an `error` reply tears
//!    the session down.
//! 3. `tick` then runs one sync step against the caller's live snapshot.
//! 4. `disconnect` (or drop) stops the transport and clears membership.

use std::time::{Duration, Instant};

use frames::Message;
use glam::Vec3;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::dispatch::{self, Inbox, Outcome};
use crate::session::{PendingRequest, Session, SessionError, normalize_room_code};
use crate::sync::{Step, SyncLoop};
use crate::transform::Snapshot;
use crate::transport::Transport;

type ScaleListener = Box<dyn FnMut(Vec3)>;

/// Point-in-time view of the client for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub room_id: Option<String>,
    pub in_room: bool,
    pub locally_controlled: bool,
    pub connected: bool,
    pub has_remote_target: bool,
}

pub struct SyncClient {
    config: SyncConfig,
    session: Session,
    sync: SyncLoop,
    transport: Option<Transport>,
    inbox: Option<Inbox>,
    scale_listeners: Vec<ScaleListener>,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("session", &self.session)
            .field("transport", &self.transport)
            .field("scale_listeners", &self.scale_listeners.len())
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Create a disconnected client whose object starts at `initial`.
    #[must_use]
    pub fn new(config: SyncConfig, initial: Snapshot) -> Self {
        Self::with_epoch(config, initial, Instant::now())
    }

    /// As [`SyncClient::new`], with an explicit start instant for the send throttle.
    #[must_use]
    pub fn with_epoch(config: SyncConfig, initial: Snapshot, epoch: Instant) -> Self {
        let sync = SyncLoop::new(&config, initial, epoch);
        Self { config, session: Session::new(), sync, transport: None, inbox: None, scale_listeners: Vec::new() }
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Connect (restarting any live connection) and ask the relay for a new room.
    ///
    /// # Errors
    ///
    /// [`SessionError::Transport`] when the relay cannot be resolved or the
    /// socket cannot be opened. The client stays out of any room.
    pub fn create_room(&mut self) -> Result<(), SessionError> {
        self.connect_and_request(&Message::CreateRoom, PendingRequest::Create)
    }

    /// Connect (restarting any live connection) and ask to join `code`.
    ///
    /// The code is trimmed and uppercased before sending.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidArgument`] for an empty code, before any network
    /// activity; otherwise as [`SyncClient::create_room`].
    pub fn join_room(&mut self, code: &str) -> Result<(), SessionError> {
        let room_code = normalize_room_code(code).inspect_err(|e| warn!(error = %e, "session: join rejected"))?;
        let pending = PendingRequest::Join(room_code.clone());
        self.connect_and_request(&Message::JoinRoom { room_code }, pending)
    }

    /// Take ownership of the shared object. Unconditional.
    pub fn start_local_control(&mut self) {
        self.session.start_local_control();
        info!("session: local control started");
    }

    /// Release ownership. Inbound targets are held back for `cooldown`
    /// (the configured default when `None`).
    pub fn stop_local_control(&mut self, cooldown: Option<Duration>) {
        self.stop_local_control_at(cooldown, Instant::now());
    }

    pub fn stop_local_control_at(&mut self, cooldown: Option<Duration>, now: Instant) {
        let cooldown = cooldown.unwrap_or(self.config.release_cooldown);
        self.session.stop_local_control(now, cooldown);
        info!(cooldown_ms = cooldown.as_millis(), "session: local control released");
    }

    /// Stop the transport and leave the room. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        let was_connected = self.transport.is_some();
        self.teardown_transport();
        self.session.disconnect();
        if was_connected {
            info!("session: disconnected");
        }
    }

    /// Drain inbound messages, then run one sync step on `live`.
    pub fn tick(&mut self, live: &mut Snapshot) -> Step {
        self.tick_at(live, Instant::now())
    }

    pub fn tick_at(&mut self, live: &mut Snapshot, now: Instant) -> Step {
        self.dispatch_pending();
        let transport = self.transport.as_ref();
        self.sync
            .step(&self.session, live, now, |bytes| transport.is_some_and(|t| t.send(bytes)))
    }

    /// Register a callback fired whenever the remote target's scale changes.
    pub fn on_target_scale_changed<F>(&mut self, listener: F)
    where
        F: FnMut(Vec3) + 'static,
    {
        self.scale_listeners.push(Box::new(listener));
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.session.room_id()
    }

    #[must_use]
    pub fn in_room(&self) -> bool {
        self.session.in_room()
    }

    #[must_use]
    pub fn locally_controlled(&self) -> bool {
        self.session.locally_controlled()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_running)
    }

    /// Latest remote target, once one has arrived.
    #[must_use]
    pub fn target(&self) -> Option<Snapshot> {
        let inbound = self.sync.inbound();
        inbound.has_data.then_some(inbound.target)
    }

    /// Snapshot most recently put on the wire (or tracked by interpolation).
    #[must_use]
    pub fn last_sent(&self) -> Snapshot {
        self.sync.outbound().last_sent
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> Status {
        Status {
            room_id: self.room_id().map(str::to_owned),
            in_room: self.in_room(),
            locally_controlled: self.locally_controlled(),
            connected: self.is_connected(),
            has_remote_target: self.sync.inbound().has_data,
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn connect_and_request(&mut self, request: &Message, pending: PendingRequest) -> Result<(), SessionError> {
        self.teardown_transport();
        self.session.begin_connect(pending);

        let (outlet, inbox) = dispatch::channel();
        let transport = match Transport::connect(&self.config.host, self.config.port, outlet, self.config.recv_poll) {
            Ok(transport) => transport,
            Err(e) => {
                error!(error = %e, host = %self.config.host, port = self.config.port, "session: connect failed");
                self.session.disconnect();
                return Err(e.into());
            }
        };

        if transport.send(&frames::encode_bytes(request)) {
            info!(action = request.action(), remote = %transport.remote_addr(), "session: request sent");
        } else {
            warn!(action = request.action(), "session: request send failed; waiting for reply anyway");
        }

        self.transport = Some(transport);
        self.inbox = Some(inbox);
        Ok(())
    }

    /// Stop and drop the transport, discarding anything still queued from it.
    fn teardown_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.stop();
        }
        self.inbox = None;
    }

    fn dispatch_pending(&mut self) {
        let messages = match &self.inbox {
            Some(inbox) => inbox.drain(),
            None => return,
        };

        for message in messages {
            match dispatch::route(message) {
                Outcome::Created { room_code } => {
                    if self.session.confirm_created(room_code.clone()) {
                        info!(%room_code, "session: room created");
                    } else {
                        warn!(%room_code, pending = ?self.session.pending(), "session: unsolicited room_created ignored");
                    }
                }
                Outcome::Joined { room_code } => {
                    if self.session.confirm_joined(room_code.clone()) {
                        info!(%room_code, "session: joined room");
                    } else {
                        warn!(%room_code, pending = ?self.session.pending(), "session: unmatched joined_room ignored");
                    }
                }
                Outcome::Target(target) => {
                    if self.sync.set_target(target) {
                        for listener in &mut self.scale_listeners {
                            listener(target.scale);
                        }
                    }
                }
                Outcome::Disconnect { reason } => {
                    error!(%reason, room_id = ?self.session.room_id(), "session: relay reported error");
                    self.disconnect();
                    // The rest of the batch belongs to the connection just torn down.
                    break;
                }
                Outcome::Ignore => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
