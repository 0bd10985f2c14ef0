//! Connection lifecycle manager.
//!
//! Owns the workspace registry and drives each workspace's state machine:
//! connect routines run as scheduler tasks, keepalive probing runs on a
//! recurring host timer. Cheaply cloneable; clones share the registry.
//!
//! The keepalive timer is registered directly with the host callback bridge
//! rather than as a scheduler task: probing must keep running regardless of
//! any single task's state.

use std::{cell::RefCell, rc::Rc, time::Duration};

use moorline_host::{Host, HostError, HostStatus, HookId};

use crate::{
    config::{Config, ProbeFailurePolicy},
    error::{LifecycleError, TaskError, TransportError},
    task::{Scheduler, TaskHandle},
    transport::Transport,
    workspace::{ConnectionHealth, Workspace, WorkspaceRegistry, WorkspaceState},
};

/// Drives connect, keepalive, and failure detection for all workspaces.
pub struct Lifecycle<T: Transport> {
    host: Rc<dyn Host>,
    scheduler: Scheduler,
    transport: Rc<T>,
    registry: Rc<RefCell<WorkspaceRegistry<T::Socket>>>,
    config: Rc<Config>,
}

impl<T: Transport> Clone for Lifecycle<T> {
    fn clone(&self) -> Self {
        Self {
            host: Rc::clone(&self.host),
            scheduler: self.scheduler.clone(),
            transport: Rc::clone(&self.transport),
            registry: Rc::clone(&self.registry),
            config: Rc::clone(&self.config),
        }
    }
}

impl<T: Transport + 'static> Lifecycle<T> {
    /// Create a lifecycle manager over a populated registry.
    #[must_use]
    pub fn new(
        scheduler: Scheduler,
        transport: Rc<T>,
        registry: WorkspaceRegistry<T::Socket>,
        config: Rc<Config>,
    ) -> Self {
        Self {
            host: Rc::clone(scheduler.host()),
            scheduler,
            transport,
            registry: Rc::new(RefCell::new(registry)),
            config,
        }
    }

    /// Current state of the named workspace.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<WorkspaceState> {
        self.registry.borrow().get(name).map(Workspace::state)
    }

    /// Host-clock timestamp of the named workspace's last successful probe
    /// or connect.
    #[must_use]
    pub fn last_healthy(&self, name: &str) -> Option<Duration> {
        self.registry.borrow().get(name).and_then(Workspace::last_healthy)
    }

    /// Start a connect attempt for the named workspace as a task.
    ///
    /// The routine marks the workspace `Connecting`, runs the transport
    /// handshake, and settles the state on completion. A transport failure
    /// is recovered inside the routine (reported, workspace back to
    /// `Disconnected`); there is no automatic retry. Connecting a workspace
    /// that is not `Disconnected`, or an unconfigured name, fails the task.
    pub fn spawn_connect(&self, name: &str) -> TaskHandle {
        let lifecycle = self.clone();
        let name = name.to_string();
        self.scheduler.spawn(async move { lifecycle.connect(name).await })
    }

    /// Start the startup auto-connect routine as a task.
    ///
    /// When the host's global `auto_connect` flag is set, the routine waits
    /// out the startup grace period, then starts one independent connect
    /// task per autoconnect-enabled workspace, in configured order.
    pub fn spawn_auto_connect(&self) -> TaskHandle {
        let lifecycle = self.clone();
        self.scheduler.spawn(async move { lifecycle.auto_connect().await })
    }

    /// Install the recurring keepalive timer on the host bridge.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Hook`] if the timer cannot be installed.
    pub fn hook_keepalive(&self) -> Result<HookId, HostError> {
        let lifecycle = self.clone();
        self.host.hook_timer(
            self.config.keepalive_interval,
            0,
            Box::new(move |_remaining| {
                lifecycle.keepalive_tick();
                HostStatus::Ok
            }),
        )
    }

    /// One keepalive round: probe every connected workspace exactly once.
    ///
    /// A probe failure is handled per workspace, after the round, so one
    /// dead socket cannot stop the remaining workspaces from being probed.
    pub fn keepalive_tick(&self) {
        let now = self.host.now();
        let mut failures: Vec<(String, TransportError)> = Vec::new();

        {
            let mut registry = self.registry.borrow_mut();
            for workspace in registry.iter_mut().filter(|ws| ws.is_connected()) {
                let name = workspace.name().to_string();
                let Some(socket) = workspace.socket_mut() else {
                    continue;
                };
                match self.transport.probe(socket) {
                    Ok(()) => workspace.mark_healthy(now),
                    Err(err) => failures.push((name, err)),
                }
            }
        }

        for (name, err) in failures {
            self.on_probe_failure(&name, &err);
        }
    }

    async fn connect(self, name: String) -> Result<(), TaskError> {
        let endpoint = {
            let mut registry = self.registry.borrow_mut();
            let workspace = registry
                .get_mut(&name)
                .ok_or_else(|| LifecycleError::UnknownWorkspace { name: name.clone() })?;
            workspace.begin_connect()?;
            workspace.endpoint().to_string()
        };
        tracing::info!(workspace = %name, endpoint = %endpoint, "connecting");

        match self.transport.connect(&endpoint).await {
            Ok(socket) => {
                let now = self.host.now();
                {
                    let mut registry = self.registry.borrow_mut();
                    let workspace = registry
                        .get_mut(&name)
                        .ok_or_else(|| LifecycleError::UnknownWorkspace { name: name.clone() })?;
                    workspace.complete_connect(socket, now)?;
                }
                tracing::info!(workspace = %name, "connected");
                self.host.print(&format!("workspace {name}: connected"));
                Ok(())
            },
            Err(err) => {
                // Transport failure is recovered here, not at the task
                // boundary: one workspace's endpoint being down is an
                // expected condition, not a routine failure.
                {
                    let mut registry = self.registry.borrow_mut();
                    if let Some(workspace) = registry.get_mut(&name) {
                        workspace.fail_connect()?;
                    }
                }
                tracing::warn!(workspace = %name, error = %err, "connect failed");
                self.host.print(&format!("workspace {name}: connect failed: {err}"));
                Ok(())
            },
        }
    }

    async fn auto_connect(self) -> Result<(), TaskError> {
        let enabled = self.host.info("auto_connect").is_some_and(|value| value == "1");
        if !enabled {
            tracing::debug!("auto-connect disabled by host");
            return Ok(());
        }

        // Defer so dependent host subsystems (persistent logging in
        // particular) finish initializing before the first attempt.
        self.scheduler.sleep(self.config.startup_grace).await?;

        let names: Vec<String> = self
            .registry
            .borrow()
            .iter()
            .filter(|ws| ws.autoconnect())
            .map(|ws| ws.name().to_string())
            .collect();

        for name in &names {
            // One task per workspace: attempts are independent, and a dead
            // endpoint cannot abort the rest.
            self.spawn_connect(name);
        }
        Ok(())
    }

    fn on_probe_failure(&self, name: &str, err: &TransportError) {
        tracing::warn!(workspace = %name, error = %err, "keepalive probe failed");
        self.host.print(&format!("workspace {name}: keepalive probe failed ({err}), disconnected"));

        let socket = self.registry.borrow_mut().get_mut(name).and_then(Workspace::disconnect);
        if let Some(socket) = socket {
            self.transport.close(socket);
        }

        match self.config.probe_failure {
            ProbeFailurePolicy::Disconnect => {},
            ProbeFailurePolicy::Reconnect => {
                self.spawn_connect(name);
            },
        }
    }
}

impl<T: Transport + 'static> ConnectionHealth for Lifecycle<T> {
    fn is_connected(&self, workspace: &str) -> bool {
        self.registry.borrow().get(workspace).is_some_and(Workspace::is_connected)
    }
}
