//! Engine configuration model.
//!
//! Read-only from the engine's perspective; the host owns editing and
//! storage. The shutdown hook serializes a [`Config`] snapshot with CBOR and
//! hands it to [`moorline_host::Host::persist_config`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Delay between process start and the first auto-connect attempt.
///
/// Dependent host subsystems (persistent logging in particular) finish
/// initializing during this window.
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_secs(1);

/// Interval between keepalive probe rounds.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// What the lifecycle manager does when a keepalive probe fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailurePolicy {
    /// Drop the socket, mark the workspace disconnected, notify the user.
    #[default]
    Disconnect,
    /// As `Disconnect`, then immediately start a fresh connect attempt.
    Reconnect,
}

/// Color tokens for the inline input-area indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Token for the `disconnected` indicator word.
    pub disconnected: String,
    /// Token for the `loading` indicator word.
    pub loading: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self { disconnected: "red".to_string(), loading: "yellow".to_string() }
    }
}

/// Per-workspace configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace name, unique within the configuration.
    pub name: String,
    /// Remote endpoint the workspace connects to.
    pub endpoint: String,
    /// Whether startup auto-connect includes this workspace.
    pub autoconnect: bool,
}

/// Extension configuration.
///
/// `workspaces` order is significant: startup auto-connect and keepalive
/// probing iterate workspaces in configured order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Delay before the first auto-connect attempt.
    pub startup_grace: Duration,
    /// Interval between keepalive probe rounds.
    pub keepalive_interval: Duration,
    /// Recovery policy applied when a keepalive probe fails.
    pub probe_failure: ProbeFailurePolicy,
    /// Indicator color tokens.
    pub color: ColorConfig,
    /// Configured workspaces, in enumeration order.
    pub workspaces: Vec<WorkspaceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            startup_grace: DEFAULT_STARTUP_GRACE,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            probe_failure: ProbeFailurePolicy::default(),
            color: ColorConfig::default(),
            workspaces: Vec::new(),
        }
    }
}

impl Config {
    /// Encode a persistable snapshot of this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Encode`] if CBOR encoding fails.
    pub fn snapshot(&self) -> Result<Vec<u8>, ConfigError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.startup_grace, Duration::from_secs(1));
        assert_eq!(config.keepalive_interval, Duration::from_secs(5));
        assert_eq!(config.probe_failure, ProbeFailurePolicy::Disconnect);
        assert!(config.workspaces.is_empty());
    }

    #[test]
    fn snapshot_roundtrip() {
        let config = Config {
            workspaces: vec![WorkspaceConfig {
                name: "work".to_string(),
                endpoint: "chat.example.test:443".to_string(),
                autoconnect: true,
            }],
            ..Config::default()
        };

        let bytes = config.snapshot().unwrap();
        let decoded: Config = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded, config);
    }
}
