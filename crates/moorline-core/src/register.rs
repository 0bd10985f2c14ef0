//! Extension registration entry point.
//!
//! Wires the engine into a host: registers the extension (fatal on
//! rejection), installs the focus-change signal hooks, the input-render
//! modifier hook, and the keepalive timer, then starts the auto-connect
//! routine. The shutdown callback handed to the host persists a
//! configuration snapshot synchronously before the process exits.

use std::rc::Rc;

use moorline_host::{ExtensionInfo, Host, HostError, HostStatus, HookId, ShutdownCallback};

use crate::{
    config::Config,
    conversation::ConversationDirectory,
    lifecycle::Lifecycle,
    route::Router,
    task::Scheduler,
    transport::Transport,
    workspace::{ConnectionHealth, WorkspaceRegistry},
};

/// Extension name, unique within the host.
pub const EXTENSION_NAME: &str = "moorline";

/// Author attribution shown by the host.
pub const EXTENSION_AUTHOR: &str = "Moorline Contributors";

/// License identifier reported to the host.
pub const EXTENSION_LICENSE: &str = "Apache-2.0";

/// One-line description for the host's extension listing.
pub const EXTENSION_DESCRIPTION: &str =
    "Persistent connections to a real-time messaging service";

/// Host signals treated as focus changes.
const FOCUS_SIGNALS: [&str; 2] = ["buffer_switch", "window_switch"];

/// Host modifier for input-area rendering.
const INPUT_MODIFIER: &str = "input_text_display_with_cursor";

/// Metadata handed to [`Host::register`].
#[must_use]
pub fn extension_info() -> ExtensionInfo {
    ExtensionInfo {
        name: EXTENSION_NAME.to_string(),
        author: EXTENSION_AUTHOR.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        license: EXTENSION_LICENSE.to_string(),
        description: EXTENSION_DESCRIPTION.to_string(),
    }
}

/// A registered, running extension.
///
/// Holds the installed hooks and the live engine components for the
/// process's lifetime.
pub struct Extension<T: Transport + 'static> {
    scheduler: Scheduler,
    lifecycle: Lifecycle<T>,
    router: Rc<Router>,
    hooks: Vec<HookId>,
    host_version: Option<String>,
}

impl<T: Transport + 'static> Extension<T> {
    /// The task scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The connection lifecycle manager.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle<T> {
        &self.lifecycle
    }

    /// The event router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Hooks installed at registration, in installation order.
    #[must_use]
    pub fn hooks(&self) -> &[HookId] {
        &self.hooks
    }

    /// Host version reported at registration, if the host exposes one.
    #[must_use]
    pub fn host_version(&self) -> Option<&str> {
        self.host_version.as_deref()
    }

    /// Remove every installed hook.
    pub fn unregister(self) {
        for id in self.hooks {
            self.scheduler.host().unhook(id);
        }
    }
}

/// Register the extension with the scheduler's host and start it.
///
/// Registration is the first host call; if the host rejects it, no hook is
/// installed and no task is started. A hook failing to install rolls back
/// the hooks already installed and fails registration.
///
/// # Errors
///
/// Returns [`HostError::Registration`] when the host rejects the extension
/// and [`HostError::Hook`] when a hook cannot be installed.
pub fn register_extension<T: Transport + 'static>(
    scheduler: Scheduler,
    transport: Rc<T>,
    conversations: Rc<dyn ConversationDirectory>,
    config: Config,
) -> Result<Extension<T>, HostError> {
    let host = Rc::clone(scheduler.host());
    let config = Rc::new(config);

    host.register(&extension_info(), shutdown_hook(&host, &config))?;

    let host_version = host.info("version");
    tracing::info!(
        host_version = host_version.as_deref().unwrap_or("unknown"),
        workspaces = config.workspaces.len(),
        "extension registered"
    );

    let registry = WorkspaceRegistry::from_config(&config.workspaces);
    let lifecycle = Lifecycle::new(scheduler.clone(), transport, registry, Rc::clone(&config));
    let health: Rc<dyn ConnectionHealth> = Rc::new(lifecycle.clone());
    let router =
        Rc::new(Router::new(scheduler.clone(), conversations, health, config.color.clone()));

    let mut hooks = Vec::new();
    if let Err(err) = install_hooks(&host, &lifecycle, &router, &mut hooks) {
        for id in hooks {
            host.unhook(id);
        }
        return Err(err);
    }

    lifecycle.spawn_auto_connect();

    Ok(Extension { scheduler, lifecycle, router, hooks, host_version })
}

fn install_hooks<T: Transport + 'static>(
    host: &Rc<dyn Host>,
    lifecycle: &Lifecycle<T>,
    router: &Rc<Router>,
    hooks: &mut Vec<HookId>,
) -> Result<(), HostError> {
    for signal in FOCUS_SIGNALS {
        let router = Rc::clone(router);
        hooks.push(host.hook_signal(signal, Box::new(move |view| router.on_focus_change(view)))?);
    }

    let router = Rc::clone(router);
    hooks.push(
        host.hook_modifier(INPUT_MODIFIER, Box::new(move |view, input| router.render_input(view, input)))?,
    );

    hooks.push(lifecycle.hook_keepalive()?);
    Ok(())
}

/// The shutdown callback persists the config snapshot synchronously; the
/// host invokes it before process exit.
fn shutdown_hook(host: &Rc<dyn Host>, config: &Rc<Config>) -> ShutdownCallback {
    let host = Rc::clone(host);
    let config = Rc::clone(config);
    Box::new(move || {
        let bytes = match config.snapshot() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "config snapshot failed");
                return HostStatus::Error;
            },
        };
        match host.persist_config(&bytes) {
            Ok(()) => HostStatus::Ok,
            Err(err) => {
                tracing::error!(error = %err, "config persistence failed");
                HostStatus::Error
            },
        }
    })
}
