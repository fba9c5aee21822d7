//! UDP transport — one socket, one background receive worker.
//!
//! DESIGN
//! ======
//! `connect` resolves the relay, binds an ephemeral local port, connects the
//! socket to the relay, and spawns exactly one receive worker. The worker
//! decodes each datagram and pushes the message into the [`Outlet`]; it never
//! touches session state. Sends happen on the caller's thread only.
//!
//! SHUTDOWN
//! ========
//! `stop` clears the running flag, drops the send handle, and joins the
//! worker. The worker socket carries a read timeout (`recv_poll`) so a
//! blocked receive wakes up and observes the flag; `stop` therefore returns
//! within one poll interval. Stopping twice is a no-op, and joining a worker
//! that already exited returns immediately.
//!
//! ERROR HANDLING
//! ==============
//! Send failures are logged and reported as `false`, never raised. Receive
//! errors are logged and the loop continues unless stop was requested.
//! Malformed datagrams are logged and dropped.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use frames::MAX_DATAGRAM_BYTES;
use tracing::{debug, info, trace, warn};

use crate::dispatch::Outlet;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no address found for host `{host}`")]
    Resolution { host: String },
    #[error("failed to resolve host `{host}`: {source}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open socket to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn receive worker: {0}")]
    Spawn(#[source] io::Error),
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve `host` to a single socket address.
///
/// Literal IP addresses are used as-is. Names are looked up and the first
/// IPv4 result wins; if the name has no IPv4 address the first result of any
/// family is used.
///
/// # Errors
///
/// [`TransportError::Lookup`] when the lookup itself fails and
/// [`TransportError::Resolution`] when it yields no addresses.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let host = host.trim();
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    if host.is_empty() {
        return Err(TransportError::Resolution { host: host.to_owned() });
    }

    let candidates: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Lookup { host: host.to_owned(), source })?
        .collect();

    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| TransportError::Resolution { host: host.to_owned() })
}

// =============================================================================
// TRANSPORT
// =============================================================================

pub struct Transport {
    remote: SocketAddr,
    local: SocketAddr,
    socket: Option<UdpSocket>,
    running: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("remote", &self.remote)
            .field("local", &self.local)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Resolve, bind, connect, and start the receive worker.
    ///
    /// # Errors
    ///
    /// Resolution failures as [`resolve`], socket setup failures as
    /// [`TransportError::Connect`], and thread spawn failure as
    /// [`TransportError::Spawn`].
    pub fn connect(host: &str, port: u16, outlet: Outlet, recv_poll: Duration) -> Result<Self, TransportError> {
        let remote = resolve(host, port)?;
        let connect_err = |source| TransportError::Connect { addr: remote, source };

        let bind_addr = match remote.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind_addr).map_err(connect_err)?;
        socket.connect(remote).map_err(connect_err)?;
        let local = socket.local_addr().map_err(connect_err)?;

        let worker_socket = socket.try_clone().map_err(connect_err)?;
        worker_socket
            .set_read_timeout(Some(recv_poll.max(Duration::from_millis(1))))
            .map_err(connect_err)?;

        let running = Arc::new(AtomicBool::new(true));
        let exited = Arc::new(AtomicBool::new(false));
        let worker = {
            let running = Arc::clone(&running);
            let exited = Arc::clone(&exited);
            thread::Builder::new()
                .name("roomsync-recv".to_owned())
                .spawn(move || {
                    let _exit = ExitFlag(exited);
                    receive_loop(&worker_socket, &running, &outlet);
                })
                .map_err(TransportError::Spawn)?
        };

        info!(%remote, %local, "transport: connected");
        Ok(Self { remote, local, socket: Some(socket), running, exited, worker: Some(worker) })
    }

    /// Best-effort datagram send. Returns whether the OS accepted it.
    pub fn send(&self, bytes: &[u8]) -> bool {
        let Some(socket) = self.socket.as_ref().filter(|_| self.is_running()) else {
            debug!(len = bytes.len(), "transport: send skipped, not running");
            return false;
        };
        match socket.send(bytes) {
            Ok(_) => {
                trace!(len = bytes.len(), remote = %self.remote, "transport: sent datagram");
                true
            }
            Err(e) => {
                warn!(error = %e, remote = %self.remote, "transport: send failed");
                false
            }
        }
    }

    /// Stop the worker and release the socket. Blocks until the worker exits.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.socket = None;
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            warn!(remote = %self.remote, "transport: receive worker panicked");
        }
        if was_running {
            info!(remote = %self.remote, "transport: stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True once the receive worker has returned.
    #[must_use]
    pub fn worker_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Shared flag the worker sets on exit; lets callers observe teardown
    /// after the transport itself is gone.
    #[must_use]
    pub fn exit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exited)
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// RECEIVE WORKER
// =============================================================================

/// Sets the shared flag when the worker unwinds or returns.
struct ExitFlag(Arc<AtomicBool>);

impl Drop for ExitFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn receive_loop(socket: &UdpSocket, running: &AtomicBool, outlet: &Outlet) {
    let mut buf = [0u8; MAX_DATAGRAM_BYTES];
    while running.load(Ordering::Acquire) {
        match socket.recv(&mut buf) {
            Ok(0) => {}
            Ok(len) => {
                if !forward_datagram(&buf[..len], outlet) {
                    debug!("transport: inbox closed, receive worker exiting");
                    break;
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                warn!(error = %e, "transport: receive failed, continuing");
            }
        }
    }
    debug!("transport: receive worker finished");
}

/// Decode one datagram and enqueue it. Returns `false` once the inbox is gone.
fn forward_datagram(bytes: &[u8], outlet: &Outlet) -> bool {
    match frames::decode_bytes(bytes) {
        Ok(Some(message)) => outlet.push(message),
        Ok(None) => {
            debug!(len = bytes.len(), "transport: ignoring datagram with unknown action");
            true
        }
        Err(e) => {
            warn!(error = %e, len = bytes.len(), "transport: dropping malformed datagram");
            true
        }
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
