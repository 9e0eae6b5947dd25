//! Session Relay
//!
//! Pairs a host display with a client controller and forwards game events
//! between them for the life of the session.

pub mod dispatcher;
pub mod lifecycle;
pub mod protocol;
pub mod service;
pub mod stats;

pub use dispatcher::{Dispatch, DropReason, RelayDispatcher, RelayError};
pub use lifecycle::LifecycleManager;
pub use protocol::{Frame, Inbound, Outbound, ProtocolError};
pub use service::RelayService;
pub use stats::{RelayStats, RelayStatsSnapshot};
