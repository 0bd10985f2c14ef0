//! Host callback surface for the Moorline engine.
//!
//! Moorline runs as an extension inside a single-threaded, callback-driven
//! text client. The host exposes no coroutine or blocking-wait primitive:
//! everything is a short callback registered against a timer, signal, or
//! modifier hook, and every callback must return promptly to the host's
//! dispatch loop.
//!
//! This crate is the vocabulary for that surface. The [`Host`] trait is the
//! callback bridge contract; it owns no engine logic. Production code
//! implements it against a real client API, the simulation harness implements
//! it against a virtual clock, and the engine in `moorline-core` is written
//! against the trait alone so both run the same logic.
//!
//! # Contract
//!
//! - Every registered callback completes quickly and returns a status the
//!   host understands ([`HostStatus`]). No callback may block on I/O; all
//!   waiting is expressed as "register a hook and return, resume later."
//! - Hook registration happens on the host's single dispatch thread, and the
//!   host invokes callbacks on that same thread. Callback types are therefore
//!   deliberately not `Send`.
//! - Timers due in the same dispatch tick fire in registration order.

mod error;

use std::time::Duration;

pub use error::HostError;

/// Return code a hook callback hands back to the host dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// Handled; the host continues normally.
    Ok,
    /// The callback failed; the host continues, but may report the hook.
    Error,
}

/// Opaque identifier for an installed hook, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

/// Opaque handle for a host view (a buffer or window the user can focus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub u64);

/// Extension metadata handed to the host at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    /// Short extension name, unique within the host.
    pub name: String,
    /// Author attribution shown by the host.
    pub author: String,
    /// Extension version string.
    pub version: String,
    /// License identifier.
    pub license: String,
    /// One-line description shown in the host's extension listing.
    pub description: String,
}

/// Timer hook callback.
///
/// The argument is the number of remaining invocations, or `None` for an
/// unlimited (repeating) timer.
pub type TimerCallback = Box<dyn FnMut(Option<u32>) -> HostStatus>;

/// Signal hook callback, invoked with the view the signal concerns.
pub type SignalCallback = Box<dyn FnMut(ViewId) -> HostStatus>;

/// Modifier hook callback.
///
/// Invoked synchronously with the view and the string under modification;
/// must return the transformed string immediately (no suspension).
pub type ModifierCallback = Box<dyn FnMut(ViewId, &str) -> String>;

/// Shutdown hook callback, invoked once before the host process exits.
pub type ShutdownCallback = Box<dyn FnMut() -> HostStatus>;

/// The host callback bridge.
///
/// Methods take `&self`: hook callbacks re-enter the host (to arm further
/// timers, print, or unhook), so implementations use interior mutability and
/// must not hold internal borrows while a callback runs.
pub trait Host {
    /// Register the extension with the host.
    ///
    /// Must be the first call an extension makes. On failure the extension
    /// must not install hooks or schedule any work. The shutdown callback is
    /// invoked synchronously before the host process exits.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Registration`] if the host rejects the extension.
    fn register(
        &self,
        info: &ExtensionInfo,
        on_shutdown: ShutdownCallback,
    ) -> Result<(), HostError>;

    /// Install a timer hook.
    ///
    /// The callback fires every `interval`, `max_calls` times in total;
    /// `max_calls == 0` means unlimited. One-shot timers are `max_calls == 1`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Hook`] if the hook cannot be installed.
    fn hook_timer(
        &self,
        interval: Duration,
        max_calls: u32,
        callback: TimerCallback,
    ) -> Result<HookId, HostError>;

    /// Install a signal hook for the named host signal.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Hook`] if the hook cannot be installed.
    fn hook_signal(&self, signal: &str, callback: SignalCallback) -> Result<HookId, HostError>;

    /// Install a modifier hook for the named host modifier.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Hook`] if the hook cannot be installed.
    fn hook_modifier(
        &self,
        modifier: &str,
        callback: ModifierCallback,
    ) -> Result<HookId, HostError>;

    /// Remove a previously installed hook. Unknown ids are ignored.
    fn unhook(&self, id: HookId);

    /// Look up a host global by name (for example the `auto_connect` flag or
    /// the host `version`). Returns `None` when the host does not define it.
    fn info(&self, name: &str) -> Option<String>;

    /// Resolve a color token to the host's inline color code.
    ///
    /// The `reset` token resolves to the code that restores default
    /// attributes.
    fn color(&self, token: &str) -> String;

    /// Print a message on the host's non-fatal user-visible channel.
    fn print(&self, message: &str);

    /// Synchronously persist an opaque configuration snapshot.
    ///
    /// Called from the shutdown hook; must complete before returning.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Persist`] if the snapshot cannot be stored.
    fn persist_config(&self, snapshot: &[u8]) -> Result<(), HostError>;

    /// Monotonic time since host start.
    fn now(&self) -> Duration;
}
