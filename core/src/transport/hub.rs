//! Peer Hub — live connection table for the WebSocket transport
//!
//! Each connection gets a fresh `PeerId` and a bounded queue. The connection
//! task drains the queue into its socket; everyone else only ever pushes.

use super::{Transport, TransportError};
use crate::relay::protocol::Outbound;
use crate::session::{PeerId, SessionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Default per-peer outbound queue depth
pub const DEFAULT_OUTBOUND_BUFFER: usize = 128;

struct PeerSlot {
    tx: mpsc::Sender<Outbound>,
    group: Option<SessionId>,
}

/// Connection table implementing `Transport`
pub struct PeerHub {
    peers: RwLock<HashMap<PeerId, PeerSlot>>,
    buffer: usize,
}

impl PeerHub {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_OUTBOUND_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection and hand back its identity and queue
    pub fn connect(&self) -> (PeerId, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let peer = PeerId::generate();
        self.peers.write().insert(peer, PeerSlot { tx, group: None });
        tracing::debug!("Peer {} attached to hub", peer);
        (peer, rx)
    }

    /// Drop a connection; its identity is never handed out again
    pub fn disconnect(&self, peer: &PeerId) -> bool {
        self.peers.write().remove(peer).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Group the peer last joined, if any
    pub fn group_of(&self, peer: &PeerId) -> Option<SessionId> {
        self.peers.read().get(peer).and_then(|slot| slot.group.clone())
    }
}

impl Default for PeerHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for PeerHub {
    fn send(&self, peer: &PeerId, event: Outbound) -> Result<(), TransportError> {
        let peers = self.peers.read();
        let slot = peers
            .get(peer)
            .ok_or(TransportError::PeerNotConnected(*peer))?;

        slot.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull(*peer),
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed(*peer),
        })
    }

    fn join_group(&self, peer: &PeerId, session_id: &SessionId) {
        if let Some(slot) = self.peers.write().get_mut(peer) {
            slot.group = Some(session_id.clone());
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_connected_peer() {
        let hub = PeerHub::new();
        let (peer, mut rx) = hub.connect();

        hub.send(&peer, Outbound::HostDisconnected).unwrap();

        assert_eq!(rx.recv().await, Some(Outbound::HostDisconnected));
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn test_send_to_unknown_peer_fails() {
        let hub = PeerHub::new();
        let stranger = PeerId::generate();

        let err = hub.send(&stranger, Outbound::ClientDisconnected).unwrap_err();
        assert_eq!(err, TransportError::PeerNotConnected(stranger));
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let hub = PeerHub::with_buffer(1);
        let (peer, _rx) = hub.connect();

        hub.send(&peer, Outbound::ClientDisconnected).unwrap();
        let err = hub.send(&peer, Outbound::ClientDisconnected).unwrap_err();
        assert_eq!(err, TransportError::QueueFull(peer));
    }

    #[test]
    fn test_closed_receiver_reports_closed() {
        let hub = PeerHub::new();
        let (peer, rx) = hub.connect();
        drop(rx);

        let err = hub.send(&peer, Outbound::HostDisconnected).unwrap_err();
        assert_eq!(err, TransportError::Closed(peer));
    }

    #[test]
    fn test_disconnect_and_groups() {
        let hub = PeerHub::new();
        let (peer, _rx) = hub.connect();

        hub.join_group(&peer, &SessionId::from("S"));
        assert_eq!(hub.group_of(&peer), Some(SessionId::from("S")));

        assert!(hub.disconnect(&peer));
        assert!(!hub.disconnect(&peer));
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.group_of(&peer), None);
        assert_eq!(
            hub.send(&peer, Outbound::HostDisconnected).unwrap_err(),
            TransportError::PeerNotConnected(peer)
        );
    }
}
