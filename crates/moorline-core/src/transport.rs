//! Socket transport abstraction.
//!
//! The engine never speaks the messaging service's wire format; it only
//! needs to establish a connection, send liveness probes on it, and tell a
//! dead socket from a live one. Production implements this against a real
//! client library; the simulation harness scripts outcomes.
//!
//! `connect` is async: its future suspends through the same scheduler
//! primitive as [`crate::task::Scheduler::sleep`], so connecting never
//! blocks the host dispatch loop. Futures here are single-threaded
//! (`?Send`), matching the host's execution model.

use async_trait::async_trait;

use crate::error::TransportError;

/// A transport to the messaging service.
///
/// One socket per connected workspace, owned exclusively by that workspace
/// for as long as it is connected.
#[async_trait(?Send)]
pub trait Transport {
    /// Live socket handle produced by a successful connect.
    type Socket: 'static;

    /// Connect to `endpoint` and complete the service handshake.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Handshake`] when the endpoint refuses the
    /// session, [`TransportError::Io`] for transport faults.
    async fn connect(&self, endpoint: &str) -> Result<Self::Socket, TransportError>;

    /// Send a liveness probe on an open socket.
    ///
    /// Non-blocking: the probe is enqueued for transmission and the call
    /// returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the socket is no longer open,
    /// [`TransportError::Io`] for transport faults.
    fn probe(&self, socket: &mut Self::Socket) -> Result<(), TransportError>;

    /// Release a socket.
    fn close(&self, socket: Self::Socket);
}
