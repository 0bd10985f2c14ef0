//! One-call wiring of a full simulated extension.

use std::fmt;
use std::rc::Rc;

use moorline_core::{Config, Extension, Scheduler, register_extension};
use moorline_host::HostError;

use crate::{SimConversations, SimHost, SimTransport};

/// A registered extension with every simulated collaborator exposed.
pub struct Fixture {
    /// The simulated host.
    pub host: SimHost,
    /// The extension's scheduler.
    pub scheduler: Scheduler,
    /// The scripted transport.
    pub transport: SimTransport,
    /// The conversation directory.
    pub conversations: SimConversations,
    /// The registered extension.
    pub extension: Extension<SimTransport>,
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture").finish_non_exhaustive()
    }
}

impl Fixture {
    /// Register an extension over a fresh [`SimHost`].
    ///
    /// # Errors
    ///
    /// Propagates registration failure from [`register_extension`].
    pub fn register(config: Config) -> Result<Self, HostError> {
        Self::register_with_host(SimHost::new(), config)
    }

    /// Register an extension over a prepared host (info flags or rejection
    /// knobs already set).
    ///
    /// # Errors
    ///
    /// Propagates registration failure from [`register_extension`].
    pub fn register_with_host(host: SimHost, config: Config) -> Result<Self, HostError> {
        let scheduler = Scheduler::new(Rc::new(host.clone()));
        let transport = SimTransport::new(scheduler.clone());
        let conversations = SimConversations::new();

        let extension = register_extension(
            scheduler.clone(),
            Rc::new(transport.clone()),
            Rc::new(conversations.clone()),
            config,
        )?;

        Ok(Self { host, scheduler, transport, conversations, extension })
    }
}
