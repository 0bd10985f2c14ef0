//! Simulated host with controllable time progression.
//!
//! Implements [`Host`] against a virtual clock: timers fire only when a test
//! explicitly advances time, so every schedule is reproducible. Timers due
//! within one [`SimHost::advance`] call fire in deadline order, ties broken
//! by registration order, matching the contract real hosts provide.
//!
//! Hook callbacks re-enter the host (a resumed routine arms its next sleep),
//! so no internal borrow is held while a callback runs.

use std::{
    cell::RefCell,
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    rc::Rc,
    time::Duration,
};

use moorline_host::{
    ExtensionInfo, Host, HostError, HostStatus, HookId, ModifierCallback, ShutdownCallback,
    SignalCallback, TimerCallback, ViewId,
};

/// Heap entry for a pending timer firing. Ordered by deadline, then by
/// registration sequence.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Due {
    at: Duration,
    seq: u64,
    hook: u64,
}

struct TimerHook {
    interval: Duration,
    /// `None` for unlimited timers.
    remaining: Option<u32>,
    callback: Rc<RefCell<TimerCallback>>,
}

struct SignalHook {
    signal: String,
    id: u64,
    callback: Rc<RefCell<SignalCallback>>,
}

struct ModifierHook {
    modifier: String,
    id: u64,
    callback: Rc<RefCell<ModifierCallback>>,
}

struct Inner {
    clock: Duration,
    next_hook: u64,
    next_seq: u64,
    timers: HashMap<u64, TimerHook>,
    timer_queue: BinaryHeap<Reverse<Due>>,
    signals: Vec<SignalHook>,
    modifiers: Vec<ModifierHook>,
    registered: Option<ExtensionInfo>,
    shutdown: Option<Rc<RefCell<ShutdownCallback>>>,
    info: HashMap<String, String>,
    printed: Vec<String>,
    persisted: Vec<Vec<u8>>,
    reject_registration: bool,
    reject_hooks: bool,
    reject_timer_hooks: bool,
    reject_persist: bool,
}

/// Deterministic in-memory host.
///
/// Cheaply cloneable; clones share the same clock and hook tables.
#[derive(Clone)]
pub struct SimHost {
    inner: Rc<RefCell<Inner>>,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// Create a host at clock zero.
    ///
    /// The `auto_connect` flag defaults on and `version` reports a
    /// simulation marker; override with [`SimHost::set_info`].
    #[must_use]
    pub fn new() -> Self {
        let mut info = HashMap::new();
        info.insert("auto_connect".to_string(), "1".to_string());
        info.insert("version".to_string(), "1.0-sim".to_string());
        Self {
            inner: Rc::new(RefCell::new(Inner {
                clock: Duration::ZERO,
                next_hook: 0,
                next_seq: 0,
                timers: HashMap::new(),
                timer_queue: BinaryHeap::new(),
                signals: Vec::new(),
                modifiers: Vec::new(),
                registered: None,
                shutdown: None,
                info,
                printed: Vec::new(),
                persisted: Vec::new(),
                reject_registration: false,
                reject_hooks: false,
                reject_timer_hooks: false,
                reject_persist: false,
            })),
        }
    }

    /// Advance the virtual clock, delivering every timer callback that
    /// comes due, in deadline-then-registration order.
    ///
    /// The clock sits at each firing's deadline while its callback runs, so
    /// callbacks observe the time they were scheduled for.
    pub fn advance(&self, delta: Duration) {
        let target = self.inner.borrow().clock + delta;

        loop {
            let due = {
                let mut inner = self.inner.borrow_mut();
                let ready = inner.timer_queue.peek().is_some_and(|Reverse(next)| next.at <= target);
                if ready { inner.timer_queue.pop().map(|Reverse(due)| due) } else { None }
            };
            let Some(due) = due else { break };

            // The hook may have been removed since this entry was queued.
            let fire = {
                let mut inner = self.inner.borrow_mut();
                inner.clock = due.at;
                inner.timers.get_mut(&due.hook).map(|hook| {
                    let remaining = hook.remaining.map(|n| n.saturating_sub(1));
                    hook.remaining = remaining;
                    (Rc::clone(&hook.callback), remaining)
                })
            };
            let Some((callback, remaining)) = fire else { continue };

            // No borrow held: the callback may install or remove hooks.
            (&mut *callback.borrow_mut())(remaining);

            let mut inner = self.inner.borrow_mut();
            if remaining == Some(0) {
                inner.timers.remove(&due.hook);
            } else if let Some(interval) = inner.timers.get(&due.hook).map(|hook| hook.interval) {
                let at = due.at + interval;
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.timer_queue.push(Reverse(Due { at, seq, hook: due.hook }));
            }
        }

        self.inner.borrow_mut().clock = target;
    }

    /// Deliver the named signal to every matching hook, in registration
    /// order, returning the statuses the callbacks produced.
    pub fn emit_signal(&self, signal: &str, view: ViewId) -> Vec<HostStatus> {
        let callbacks: Vec<Rc<RefCell<SignalCallback>>> = self
            .inner
            .borrow()
            .signals
            .iter()
            .filter(|hook| hook.signal == signal)
            .map(|hook| Rc::clone(&hook.callback))
            .collect();
        callbacks.iter().map(|callback| (&mut *callback.borrow_mut())(view)).collect()
    }

    /// Run `input` through every matching modifier hook, in registration
    /// order, threading each hook's output into the next.
    #[must_use]
    pub fn apply_modifier(&self, modifier: &str, view: ViewId, input: &str) -> String {
        let callbacks: Vec<Rc<RefCell<ModifierCallback>>> = self
            .inner
            .borrow()
            .modifiers
            .iter()
            .filter(|hook| hook.modifier == modifier)
            .map(|hook| Rc::clone(&hook.callback))
            .collect();
        let mut text = input.to_string();
        for callback in callbacks {
            text = (&mut *callback.borrow_mut())(view, &text);
        }
        text
    }

    /// Invoke the registered shutdown callback, as the host does before
    /// process exit. Returns `None` when nothing is registered.
    pub fn trigger_shutdown(&self) -> Option<HostStatus> {
        let callback = self.inner.borrow().shutdown.as_ref().map(Rc::clone);
        callback.map(|callback| (&mut *callback.borrow_mut())())
    }

    /// Set a host global returned by [`Host::info`].
    pub fn set_info(&self, name: &str, value: &str) {
        self.inner.borrow_mut().info.insert(name.to_string(), value.to_string());
    }

    /// Make [`Host::register`] fail.
    pub fn reject_registration(&self) {
        self.inner.borrow_mut().reject_registration = true;
    }

    /// Make every subsequent `hook_*` call fail.
    pub fn reject_hooks(&self) {
        self.inner.borrow_mut().reject_hooks = true;
    }

    /// Make only subsequent `hook_timer` calls fail, leaving signal and
    /// modifier hooks installable.
    pub fn reject_timer_hooks(&self) {
        self.inner.borrow_mut().reject_timer_hooks = true;
    }

    /// Make [`Host::persist_config`] fail.
    pub fn reject_persist(&self) {
        self.inner.borrow_mut().reject_persist = true;
    }

    /// Current virtual clock.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.inner.borrow().clock
    }

    /// Extension info recorded by a successful registration.
    #[must_use]
    pub fn registered(&self) -> Option<ExtensionInfo> {
        self.inner.borrow().registered.clone()
    }

    /// Messages printed on the non-fatal channel, in order.
    #[must_use]
    pub fn printed(&self) -> Vec<String> {
        self.inner.borrow().printed.clone()
    }

    /// Config snapshots persisted so far, in order.
    #[must_use]
    pub fn persisted(&self) -> Vec<Vec<u8>> {
        self.inner.borrow().persisted.clone()
    }

    /// Number of live timer hooks.
    #[must_use]
    pub fn live_timer_hooks(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Number of live signal hooks.
    #[must_use]
    pub fn live_signal_hooks(&self) -> usize {
        self.inner.borrow().signals.len()
    }

    /// Number of live modifier hooks.
    #[must_use]
    pub fn live_modifier_hooks(&self) -> usize {
        self.inner.borrow().modifiers.len()
    }
}

impl Host for SimHost {
    fn register(
        &self,
        info: &ExtensionInfo,
        on_shutdown: ShutdownCallback,
    ) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_registration {
            return Err(HostError::Registration { reason: "rejected by host".to_string() });
        }
        if inner.registered.is_some() {
            return Err(HostError::Registration {
                reason: format!("extension {} already registered", info.name),
            });
        }
        inner.registered = Some(info.clone());
        inner.shutdown = Some(Rc::new(RefCell::new(on_shutdown)));
        Ok(())
    }

    fn hook_timer(
        &self,
        interval: Duration,
        max_calls: u32,
        callback: TimerCallback,
    ) -> Result<HookId, HostError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_hooks || inner.reject_timer_hooks {
            return Err(HostError::Hook { kind: "timer", reason: "rejected by host".to_string() });
        }
        let id = inner.next_hook;
        inner.next_hook += 1;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let at = inner.clock + interval;
        inner.timers.insert(
            id,
            TimerHook {
                interval,
                remaining: (max_calls > 0).then_some(max_calls),
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        inner.timer_queue.push(Reverse(Due { at, seq, hook: id }));
        Ok(HookId(id))
    }

    fn hook_signal(&self, signal: &str, callback: SignalCallback) -> Result<HookId, HostError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_hooks {
            return Err(HostError::Hook { kind: "signal", reason: "rejected by host".to_string() });
        }
        let id = inner.next_hook;
        inner.next_hook += 1;
        inner.signals.push(SignalHook {
            signal: signal.to_string(),
            id,
            callback: Rc::new(RefCell::new(callback)),
        });
        Ok(HookId(id))
    }

    fn hook_modifier(
        &self,
        modifier: &str,
        callback: ModifierCallback,
    ) -> Result<HookId, HostError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_hooks {
            return Err(HostError::Hook {
                kind: "modifier",
                reason: "rejected by host".to_string(),
            });
        }
        let id = inner.next_hook;
        inner.next_hook += 1;
        inner.modifiers.push(ModifierHook {
            modifier: modifier.to_string(),
            id,
            callback: Rc::new(RefCell::new(callback)),
        });
        Ok(HookId(id))
    }

    fn unhook(&self, id: HookId) {
        let mut inner = self.inner.borrow_mut();
        inner.timers.remove(&id.0);
        inner.signals.retain(|hook| hook.id != id.0);
        inner.modifiers.retain(|hook| hook.id != id.0);
    }

    fn info(&self, name: &str) -> Option<String> {
        self.inner.borrow().info.get(name).cloned()
    }

    fn color(&self, token: &str) -> String {
        format!("<{token}>")
    }

    fn print(&self, message: &str) {
        tracing::debug!(message, "host print");
        self.inner.borrow_mut().printed.push(message.to_string());
    }

    fn persist_config(&self, snapshot: &[u8]) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_persist {
            return Err(HostError::Persist { reason: "rejected by host".to_string() });
        }
        inner.persisted.push(snapshot.to_vec());
        Ok(())
    }

    fn now(&self) -> Duration {
        self.inner.borrow().clock
    }
}
