//! Connection Lifecycle Manager — unwinds session state when a peer leaves

use crate::relay::protocol::Outbound;
use crate::session::{PeerId, Release, SessionId, SessionRegistry};
use crate::transport::Transport;
use std::sync::Arc;

/// Applies the disconnect transition and tells the peer left behind
pub struct LifecycleManager<T: Transport + ?Sized> {
    registry: Arc<SessionRegistry>,
    transport: Arc<T>,
}

impl<T: Transport + ?Sized> LifecycleManager<T> {
    pub fn new(registry: Arc<SessionRegistry>, transport: Arc<T>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Handle a peer disconnect.
    ///
    /// A departing host closes its session and its client hears
    /// `host_disconnected`; a departing client frees the slot and the host
    /// hears `client_disconnected`. Unbound peers are a no-op.
    pub fn on_disconnect(&self, peer: &PeerId) -> Option<Release> {
        let Some(release) = self.registry.release(peer) else {
            tracing::debug!("Peer {} left without a session", peer);
            return None;
        };

        match &release {
            Release::HostLeft { session_id, .. } => {
                tracing::info!("Host {} left; session {} closed", peer, session_id);
            }
            Release::ClientLeft { session_id, .. } => {
                tracing::info!("Client {} left session {}", peer, session_id);
            }
        }

        self.notify(&release);
        Some(release)
    }

    /// Tell the remaining peer about a release that already committed
    pub fn notify(&self, release: &Release) {
        match release {
            Release::HostLeft {
                session_id,
                client: Some(client),
            } => self.deliver(client, Outbound::HostDisconnected, session_id),
            Release::HostLeft { client: None, .. } => {}
            Release::ClientLeft { session_id, host } => {
                self.deliver(host, Outbound::ClientDisconnected, session_id)
            }
        }
    }

    fn deliver(&self, peer: &PeerId, event: Outbound, session_id: &SessionId) {
        let kind = event.kind();
        if let Err(e) = self.transport.send(peer, event) {
            // The remaining peer may be leaving at the same moment
            tracing::debug!("Could not send {} for session {}: {}", kind, session_id, e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
