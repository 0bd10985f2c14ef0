//! Host surface error types.

use thiserror::Error;

/// Errors surfaced by the host callback bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host rejected the extension registration. Fatal to startup: the
    /// extension must not install hooks or schedule work after this.
    #[error("extension registration rejected: {reason}")]
    Registration {
        /// Host-provided rejection reason.
        reason: String,
    },

    /// A hook could not be installed.
    #[error("failed to install {kind} hook: {reason}")]
    Hook {
        /// Hook kind (`timer`, `signal`, `modifier`).
        kind: &'static str,
        /// Host-provided failure reason.
        reason: String,
    },

    /// The configuration snapshot could not be persisted.
    #[error("config persistence failed: {reason}")]
    Persist {
        /// Host-provided failure reason.
        reason: String,
    },
}
