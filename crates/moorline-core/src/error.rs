//! Engine error taxonomy.
//!
//! Three recovery scopes, matching who absorbs the failure:
//!
//! - [`TransportError`]: recovered locally by the lifecycle manager; updates
//!   one workspace's state and never propagates past it.
//! - [`TaskError`]: an unrecovered failure inside a scheduled routine; caught
//!   at the task boundary by the scheduler, reported on the host's non-fatal
//!   channel, and discarded with the task.
//! - [`moorline_host::HostError`] out of [`crate::register_extension`]:
//!   fatal to startup.

use thiserror::Error;

use crate::workspace::WorkspaceState;

/// Socket transport failures.
///
/// Variants are distinguishable so callers can tell a peer-closed connection
/// from a transport-level I/O fault or a failed handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection was closed by the peer or is no longer open.
    #[error("connection closed")]
    Closed,

    /// A transport-level I/O error.
    #[error("transport error: {message}")]
    Io {
        /// Transport-provided description.
        message: String,
    },

    /// The endpoint handshake failed.
    #[error("handshake failed: {reason}")]
    Handshake {
        /// Transport-provided failure reason.
        reason: String,
    },
}

/// Invalid lifecycle operations.
///
/// These are programming errors (calling a transition from the wrong state,
/// naming an unconfigured workspace), not transport conditions. They surface
/// as task failures and never panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// No workspace with this name is configured.
    #[error("workspace {name} not found")]
    UnknownWorkspace {
        /// The requested workspace name.
        name: String,
    },

    /// The operation is not valid in the workspace's current state.
    #[error("workspace {name}: {operation} invalid in state {state:?}")]
    InvalidState {
        /// The workspace name.
        name: String,
        /// State the workspace was in.
        state: WorkspaceState,
        /// The attempted operation.
        operation: &'static str,
    },
}

/// Failure of a scheduled routine, caught at the task boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// A transport operation failed and the routine chose to propagate it.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A lifecycle transition was invalid.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A host bridge operation failed mid-routine.
    #[error(transparent)]
    Host(#[from] moorline_host::HostError),

    /// Routine-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Configuration snapshot failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The snapshot could not be encoded.
    #[error("config snapshot encoding failed: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
}
