//! Transport seam between the relay core and live connections
//!
//! The relay only needs to push named events at a peer. Sends never block:
//! a connection that cannot take more events fails the send instead.

pub mod hub;

use crate::relay::protocol::Outbound;
use crate::session::{PeerId, SessionId};
use thiserror::Error;

pub use hub::PeerHub;

/// Transport delivery errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Peer not connected: {0}")]
    PeerNotConnected(PeerId),
    #[error("Outbound queue full for peer {0}")]
    QueueFull(PeerId),
    #[error("Connection closed for peer {0}")]
    Closed(PeerId),
}

/// Outbound side of the connection transport
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Queue one event for delivery to `peer`
    fn send(&self, peer: &PeerId, event: Outbound) -> Result<(), TransportError>;

    /// Add `peer` to the addressable group for `session_id`.
    /// Routing never depends on group membership.
    fn join_group(&self, _peer: &PeerId, _session_id: &SessionId) {}
}
