//! Relay Dispatcher — routes each inbound event to the sender's counterpart
//!
//! Relays never fan out: an event goes to the one peer sitting opposite the
//! sender in its session, or nowhere.

use super::lifecycle::LifecycleManager;
use super::protocol::{event, Inbound, Outbound, ProtocolError};
use super::stats::RelayStats;
use crate::session::{PeerId, RegistryError, Role, SessionId, SessionRegistry};
use crate::transport::{Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Relay error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// `join_session` named a session nobody hosts; the sender was told
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] ProtocolError),
    #[error("Delivery failed: {0}")]
    Transport(#[from] TransportError),
}

/// Why a relay went nowhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Sender is not bound to any session
    NotInSession,
    /// Sender holds the other role for this event
    WrongRole,
    /// The counterpart slot is empty
    NoCounterpart,
    /// A host tried to join its own session as the client
    OwnSession,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NotInSession => write!(f, "sender not in a session"),
            DropReason::WrongRole => write!(f, "sender has the wrong role"),
            DropReason::NoCounterpart => write!(f, "no counterpart attached"),
            DropReason::OwnSession => write!(f, "sender already hosts this session"),
        }
    }
}

/// What a dispatched event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    HostRegistered {
        session_id: SessionId,
        created: bool,
    },
    ClientAttached {
        session_id: SessionId,
        host: PeerId,
    },
    Relayed {
        session_id: SessionId,
        to: PeerId,
        kind: &'static str,
    },
    Dropped {
        kind: &'static str,
        reason: DropReason,
    },
}

/// Routes inbound events against the session registry
pub struct RelayDispatcher<T: Transport + ?Sized> {
    registry: Arc<SessionRegistry>,
    transport: Arc<T>,
    lifecycle: LifecycleManager<T>,
    stats: Arc<RelayStats>,
}

impl<T: Transport + ?Sized> RelayDispatcher<T> {
    pub fn new(
        registry: Arc<SessionRegistry>,
        transport: Arc<T>,
        stats: Arc<RelayStats>,
    ) -> Self {
        let lifecycle = LifecycleManager::new(Arc::clone(&registry), Arc::clone(&transport));
        Self {
            registry,
            transport,
            lifecycle,
            stats,
        }
    }

    /// Apply one inbound event from `sender`
    pub fn dispatch(&self, sender: &PeerId, message: Inbound) -> Result<Dispatch, RelayError> {
        match message {
            Inbound::RegisterHost(session_id) => Ok(self.register_host(sender, session_id)),
            Inbound::JoinSession(session_id) => self.join_session(sender, session_id),
            Inbound::SendKick(data) => self.relay(sender, Role::Client, Outbound::ReceiveKick(data)),
            Inbound::ScoreUpdate(data) => self.relay(sender, Role::Host, Outbound::ScoreUpdate(data)),
            Inbound::ShotResult(data) => self.relay(sender, Role::Host, Outbound::ShotResult(data)),
            Inbound::GameOver(data) => self.relay(sender, Role::Host, Outbound::GameOver(data)),
        }
    }

    fn register_host(&self, sender: &PeerId, session_id: SessionId) -> Dispatch {
        let registration = self.registry.register_host(&session_id, *sender);

        if let Some(release) = &registration.released {
            self.lifecycle.notify(release);
        }
        if let Some(previous) = registration.replaced_host {
            tracing::info!("Host of session {} replaced ({} -> {})", session_id, previous, sender);
        }
        if registration.created {
            self.stats.session_created();
        }

        self.transport.join_group(sender, &session_id);
        tracing::info!("Host {} registered for session {}", sender, session_id);

        Dispatch::HostRegistered {
            session_id,
            created: registration.created,
        }
    }

    fn join_session(&self, sender: &PeerId, session_id: SessionId) -> Result<Dispatch, RelayError> {
        let attachment = match self.registry.attach_client(&session_id, *sender) {
            Ok(attachment) => attachment,
            Err(RegistryError::SessionNotFound(id)) => return Err(self.reject(sender, id)),
            Err(RegistryError::AlreadyHost(_)) => {
                return Ok(self.dropped(event::JOIN_SESSION, DropReason::OwnSession));
            }
        };

        if let Some(release) = &attachment.released {
            self.lifecycle.notify(release);
        }
        if let Some(previous) = attachment.replaced_client {
            tracing::info!("Client of session {} replaced ({} -> {})", session_id, previous, sender);
        }

        self.transport.join_group(sender, &session_id);
        tracing::info!("Client {} joined session {}", sender, session_id);

        self.transport
            .send(&attachment.host, Outbound::client_connected())?;

        Ok(Dispatch::ClientAttached {
            session_id,
            host: attachment.host,
        })
    }

    /// Answer a failed join directly to the sender
    fn reject(&self, sender: &PeerId, session_id: SessionId) -> RelayError {
        if let Err(e) = self.transport.send(sender, Outbound::session_not_found()) {
            tracing::debug!("Could not send session_error to {}: {}", sender, e);
        }
        RelayError::SessionNotFound(session_id)
    }

    fn relay(&self, sender: &PeerId, expected: Role, event: Outbound) -> Result<Dispatch, RelayError> {
        let kind = event.kind();

        let Some(route) = self.registry.route_from(sender) else {
            return Ok(self.dropped(kind, DropReason::NotInSession));
        };
        if route.role != expected {
            return Ok(self.dropped(kind, DropReason::WrongRole));
        }
        let Some(to) = route.counterpart else {
            return Ok(self.dropped(kind, DropReason::NoCounterpart));
        };

        if let Err(e) = self.transport.send(&to, event) {
            self.stats.dropped();
            return Err(e.into());
        }
        self.stats.relayed();
        tracing::debug!("Relayed {} in session {} to {}", kind, route.session_id, to);

        Ok(Dispatch::Relayed {
            session_id: route.session_id,
            to,
            kind,
        })
    }

    fn dropped(&self, kind: &'static str, reason: DropReason) -> Dispatch {
        self.stats.dropped();
        Dispatch::Dropped { kind, reason }
    }
}

// ============================================================================
// TESTS
// ============================================================================
