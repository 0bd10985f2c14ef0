//! Scripted transport for deterministic lifecycle tests.
//!
//! Connect outcomes and probe failures are scripted per endpoint; latency is
//! expressed through the scheduler's own sleep primitive, so a connect in
//! flight suspends exactly like production code and the workspace is
//! observable in `Connecting` until the virtual clock reaches the scripted
//! latency.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use async_trait::async_trait;
use moorline_core::{Scheduler, Transport, TransportError};

/// Scripted outcome for one connect attempt.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// Handshake succeeds after `latency` of virtual time.
    Succeed {
        /// Virtual time the handshake takes.
        latency: Duration,
    },
    /// Handshake fails with `error` after `latency` of virtual time.
    Fail {
        /// Virtual time until the failure surfaces.
        latency: Duration,
        /// The failure to report.
        error: TransportError,
    },
}

/// Socket handle minted by [`SimTransport`].
#[derive(Debug, PartialEq, Eq)]
pub struct SimSocket {
    endpoint: String,
    id: u64,
}

impl SimSocket {
    /// Endpoint this socket is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

struct Inner {
    outcomes: HashMap<String, VecDeque<ConnectOutcome>>,
    probe_failures: HashMap<String, VecDeque<TransportError>>,
    connect_attempts: Vec<String>,
    probes: Vec<String>,
    closed: Vec<String>,
    next_socket: u64,
}

/// Deterministic scripted transport.
///
/// Unscripted endpoints connect immediately; scripted outcomes are consumed
/// in order, one per attempt.
#[derive(Clone)]
pub struct SimTransport {
    scheduler: Scheduler,
    inner: Rc<RefCell<Inner>>,
}

impl SimTransport {
    /// Create a transport that suspends through `scheduler` for latency.
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            inner: Rc::new(RefCell::new(Inner {
                outcomes: HashMap::new(),
                probe_failures: HashMap::new(),
                connect_attempts: Vec::new(),
                probes: Vec::new(),
                closed: Vec::new(),
                next_socket: 0,
            })),
        }
    }

    /// Queue an outcome for the next connect attempt to `endpoint`.
    pub fn script_connect(&self, endpoint: &str, outcome: ConnectOutcome) {
        self.inner
            .borrow_mut()
            .outcomes
            .entry(endpoint.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Make the next probe on `endpoint` fail with `error`.
    pub fn fail_next_probe(&self, endpoint: &str, error: TransportError) {
        self.inner
            .borrow_mut()
            .probe_failures
            .entry(endpoint.to_string())
            .or_default()
            .push_back(error);
    }

    /// Endpoints of every connect attempt so far, in order.
    #[must_use]
    pub fn connect_attempts(&self) -> Vec<String> {
        self.inner.borrow().connect_attempts.clone()
    }

    /// Endpoints of every probe sent so far, in order.
    #[must_use]
    pub fn probes(&self) -> Vec<String> {
        self.inner.borrow().probes.clone()
    }

    /// Number of probes sent to `endpoint`.
    #[must_use]
    pub fn probe_count(&self, endpoint: &str) -> usize {
        self.inner.borrow().probes.iter().filter(|probed| probed.as_str() == endpoint).count()
    }

    /// Endpoints of sockets closed so far, in order.
    #[must_use]
    pub fn closed(&self) -> Vec<String> {
        self.inner.borrow().closed.clone()
    }

    async fn delay(&self, latency: Duration) -> Result<(), TransportError> {
        if latency.is_zero() {
            return Ok(());
        }
        self.scheduler
            .sleep(latency)
            .await
            .map_err(|err| TransportError::Io { message: err.to_string() })
    }
}

#[async_trait(?Send)]
impl Transport for SimTransport {
    type Socket = SimSocket;

    async fn connect(&self, endpoint: &str) -> Result<SimSocket, TransportError> {
        let outcome = {
            let mut inner = self.inner.borrow_mut();
            inner.connect_attempts.push(endpoint.to_string());
            inner
                .outcomes
                .get_mut(endpoint)
                .and_then(VecDeque::pop_front)
                .unwrap_or(ConnectOutcome::Succeed { latency: Duration::ZERO })
        };

        match outcome {
            ConnectOutcome::Succeed { latency } => {
                self.delay(latency).await?;
                let id = {
                    let mut inner = self.inner.borrow_mut();
                    let id = inner.next_socket;
                    inner.next_socket += 1;
                    id
                };
                Ok(SimSocket { endpoint: endpoint.to_string(), id })
            },
            ConnectOutcome::Fail { latency, error } => {
                self.delay(latency).await?;
                Err(error)
            },
        }
    }

    fn probe(&self, socket: &mut SimSocket) -> Result<(), TransportError> {
        let mut inner = self.inner.borrow_mut();
        inner.probes.push(socket.endpoint.clone());
        match inner.probe_failures.get_mut(&socket.endpoint).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(&self, socket: SimSocket) {
        self.inner.borrow_mut().closed.push(socket.endpoint);
    }
}
