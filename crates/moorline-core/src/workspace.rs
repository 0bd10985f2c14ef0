//! Workspace state machine and registry.
//!
//! A workspace is one configured persistent connection to a remote
//! messaging endpoint. This module is the session-layer state machine:
//! pure transitions with time passed in as a parameter, no I/O. The
//! lifecycle manager in [`crate::lifecycle`] drives it.
//!
//! # State machine
//!
//! ```text
//! ┌──────────────┐ begin_connect ┌────────────┐ complete_connect ┌───────────┐
//! │ Disconnected │──────────────>│ Connecting │─────────────────>│ Connected │
//! └──────────────┘               └────────────┘                  └───────────┘
//!        ▲                             │ fail_connect                  │
//!        │                             ▼                               │
//!        └─────────────────────────────┴───── disconnect ──────────────┘
//! ```
//!
//! Workspaces persist for the process's lifetime: a failed or dead
//! connection transitions back to `Disconnected` and the same entry is
//! reconnected, never recreated.

use std::time::Duration;

use crate::{
    config::WorkspaceConfig,
    error::LifecycleError,
};

/// Connection state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// No connection and none in progress.
    Disconnected,
    /// A connect routine is running the endpoint handshake.
    Connecting,
    /// Handshake complete; the workspace owns a live socket.
    Connected,
}

/// One configured remote endpoint and its connection state.
///
/// The socket is owned exclusively by the workspace while connected; no
/// other component reads or writes it.
#[derive(Debug)]
pub struct Workspace<S> {
    name: String,
    endpoint: String,
    autoconnect: bool,
    state: WorkspaceState,
    socket: Option<S>,
    last_healthy: Option<Duration>,
}

impl<S> Workspace<S> {
    /// Create a disconnected workspace from its configuration.
    #[must_use]
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            autoconnect: config.autoconnect,
            state: WorkspaceState::Disconnected,
            socket: None,
            last_healthy: None,
        }
    }

    /// Workspace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote endpoint this workspace connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether startup auto-connect includes this workspace.
    #[must_use]
    pub fn autoconnect(&self) -> bool {
        self.autoconnect
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Whether the workspace is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == WorkspaceState::Connected
    }

    /// Host-clock timestamp of the last successful probe or connect.
    #[must_use]
    pub fn last_healthy(&self) -> Option<Duration> {
        self.last_healthy
    }

    /// Exclusive access to the live socket, if connected.
    pub fn socket_mut(&mut self) -> Option<&mut S> {
        self.socket.as_mut()
    }

    /// Enter `Connecting`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] unless currently
    /// `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), LifecycleError> {
        if self.state != WorkspaceState::Disconnected {
            return Err(self.invalid("begin_connect"));
        }
        self.state = WorkspaceState::Connecting;
        Ok(())
    }

    /// Enter `Connected` with a freshly handshaken socket.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] unless currently
    /// `Connecting`.
    pub fn complete_connect(&mut self, socket: S, now: Duration) -> Result<(), LifecycleError> {
        if self.state != WorkspaceState::Connecting {
            return Err(self.invalid("complete_connect"));
        }
        self.state = WorkspaceState::Connected;
        self.socket = Some(socket);
        self.last_healthy = Some(now);
        Ok(())
    }

    /// Return to `Disconnected` after a failed connect attempt.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] unless currently
    /// `Connecting`.
    pub fn fail_connect(&mut self) -> Result<(), LifecycleError> {
        if self.state != WorkspaceState::Connecting {
            return Err(self.invalid("fail_connect"));
        }
        self.state = WorkspaceState::Disconnected;
        Ok(())
    }

    /// Return to `Disconnected` from any state, yielding the socket (if
    /// any) for the caller to close.
    pub fn disconnect(&mut self) -> Option<S> {
        self.state = WorkspaceState::Disconnected;
        self.socket.take()
    }

    /// Record a successful liveness probe.
    pub fn mark_healthy(&mut self, now: Duration) {
        self.last_healthy = Some(now);
    }

    fn invalid(&self, operation: &'static str) -> LifecycleError {
        LifecycleError::InvalidState { name: self.name.clone(), state: self.state, operation }
    }
}

/// Read-only view of workspace connection health.
///
/// The seam between the lifecycle manager and the event routing layer: the
/// input renderer needs "is this workspace connected" and nothing else.
pub trait ConnectionHealth {
    /// Whether the named workspace is currently connected.
    ///
    /// Unknown names read as not connected.
    fn is_connected(&self, workspace: &str) -> bool;
}

/// Owned registry of all configured workspaces.
///
/// Exactly the configured endpoints, in configured enumeration order.
/// Passed by handle into the components that need it; never ambient global
/// state. Mutated only at startup and through explicit add/remove.
#[derive(Debug, Default)]
pub struct WorkspaceRegistry<S> {
    entries: Vec<Workspace<S>>,
}

impl<S> WorkspaceRegistry<S> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Build a registry from configuration, preserving order.
    #[must_use]
    pub fn from_config(configs: &[WorkspaceConfig]) -> Self {
        Self { entries: configs.iter().map(Workspace::new).collect() }
    }

    /// Number of configured workspaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no workspaces are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a workspace. Later iteration visits it after existing entries.
    pub fn insert(&mut self, workspace: Workspace<S>) {
        self.entries.push(workspace);
    }

    /// Remove a workspace by name, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<Workspace<S>> {
        let index = self.entries.iter().position(|ws| ws.name() == name)?;
        Some(self.entries.remove(index))
    }

    /// Look up a workspace by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Workspace<S>> {
        self.entries.iter().find(|ws| ws.name() == name)
    }

    /// Look up a workspace by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Workspace<S>> {
        self.entries.iter_mut().find(|ws| ws.name() == name)
    }

    /// Iterate workspaces in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Workspace<S>> {
        self.entries.iter()
    }

    /// Iterate workspaces in configured order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Workspace<S>> {
        self.entries.iter_mut()
    }
}
