//! Deterministic simulation harness for the Moorline engine.
//!
//! In-memory implementations of the host surface, the socket transport, and
//! the conversation collaborators, all driven by a virtual clock. Tests
//! advance time explicitly, so every schedule is reproducible: same script,
//! same ticks, same outcome.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixture;
pub mod sim_conversations;
pub mod sim_host;
pub mod sim_transport;

pub use fixture::Fixture;
pub use sim_conversations::{SimConversation, SimConversations};
pub use sim_host::SimHost;
pub use sim_transport::{ConnectOutcome, SimTransport};
