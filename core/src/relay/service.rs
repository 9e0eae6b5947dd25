//! Relay Service — the entry point a transport drives
//!
//! Wires the dispatcher and lifecycle manager to one registry and one
//! transport, and turns raw frames into typed outcomes for the caller to log.

use super::dispatcher::{Dispatch, RelayDispatcher, RelayError};
use super::lifecycle::LifecycleManager;
use super::protocol::Inbound;
use super::stats::{RelayStats, RelayStatsSnapshot};
use crate::session::{PeerId, Release, SessionRegistry};
use crate::transport::Transport;
use std::sync::Arc;

/// Session relay bound to one registry and one transport
pub struct RelayService<T: Transport + ?Sized> {
    registry: Arc<SessionRegistry>,
    dispatcher: RelayDispatcher<T>,
    lifecycle: LifecycleManager<T>,
    stats: Arc<RelayStats>,
}

impl<T: Transport + ?Sized> RelayService<T> {
    pub fn new(registry: Arc<SessionRegistry>, transport: Arc<T>) -> Self {
        let stats = Arc::new(RelayStats::new());
        Self {
            dispatcher: RelayDispatcher::new(
                Arc::clone(&registry),
                Arc::clone(&transport),
                Arc::clone(&stats),
            ),
            lifecycle: LifecycleManager::new(Arc::clone(&registry), transport),
            registry,
            stats,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    pub fn on_connect(&self, peer: &PeerId) {
        self.stats.connection_opened();
        tracing::info!("Peer connected: {}", peer);
    }

    /// Handle one text frame from `peer`.
    ///
    /// `Ok(None)` means the frame named an event this relay ignores.
    pub fn on_message(&self, peer: &PeerId, text: &str) -> Result<Option<Dispatch>, RelayError> {
        let message = match Inbound::decode(text) {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.stats.malformed();
                return Err(e.into());
            }
        };
        self.on_event(peer, message).map(Some)
    }

    /// Handle an already decoded event
    pub fn on_event(&self, peer: &PeerId, message: Inbound) -> Result<Dispatch, RelayError> {
        self.dispatcher.dispatch(peer, message)
    }

    pub fn on_disconnect(&self, peer: &PeerId) -> Option<Release> {
        self.stats.connection_closed();
        tracing::info!("Peer disconnected: {}", peer);
        self.lifecycle.on_disconnect(peer)
    }
}
