//! Session Registry — the single source of truth for pairing state
//!
//! Records live in lock-striped shards keyed by session id. A reverse index
//! (peer id -> session id + role) is striped the same way and is updated
//! inside the same critical section as the record it points at.
//!
//! Lock order: at most one session shard, then peer shards one at a time.
//! A peer shard is never held while a session shard is being acquired.

use super::identity::{PeerId, Role, SessionId};
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use thiserror::Error;

/// Default number of lock stripes
pub const DEFAULT_SHARDS: usize = 16;

/// Registry error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("Peer already hosts session {0}")]
    AlreadyHost(SessionId),
}

/// Snapshot of one pairing slot.
///
/// A record only exists while it has a host, so `host` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub host: PeerId,
    pub client: Option<PeerId>,
}

impl SessionRecord {
    fn holds(&self, peer: &PeerId, role: Role) -> bool {
        match role {
            Role::Host => self.host == *peer,
            Role::Client => self.client == Some(*peer),
        }
    }
}

/// Reverse index entry: where a peer currently sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerBinding {
    pub session_id: SessionId,
    pub role: Role,
}

/// A sender's session and its counterpart, read in one critical section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub session_id: SessionId,
    pub role: Role,
    /// The host for a client sender; the attached client (if any) for a host
    pub counterpart: Option<PeerId>,
}

/// Result of unbinding a peer from its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// The host left; the session is gone. `client` is the peer left behind.
    HostLeft {
        session_id: SessionId,
        client: Option<PeerId>,
    },
    /// The client left; the session stays open for a new client.
    ClientLeft { session_id: SessionId, host: PeerId },
}

/// Outcome of `register_host`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRegistration {
    /// True if this call created the record
    pub created: bool,
    /// Previous host of an existing record, now unbound
    pub replaced_host: Option<PeerId>,
    /// The registering peer's previous binding elsewhere, now released
    pub released: Option<Release>,
}

/// Outcome of a successful `attach_client`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAttachment {
    pub host: PeerId,
    /// Previous client of the record, now unbound
    pub replaced_client: Option<PeerId>,
    /// The attaching peer's previous binding elsewhere, now released
    pub released: Option<Release>,
}

type SessionShard = Mutex<HashMap<SessionId, SessionRecord>>;
type PeerShard = Mutex<HashMap<PeerId, PeerBinding>>;

/// In-memory session registry shared by all connection tasks
pub struct SessionRegistry {
    sessions: Box<[SessionShard]>,
    peers: Box<[PeerShard]>,
    hasher: RandomState,
}

impl SessionRegistry {
    /// Create a registry with the default stripe count
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a registry with `shards` lock stripes (at least one)
    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            sessions: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
            peers: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.sessions.len()
    }

    fn stripe<K: Hash + ?Sized>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.sessions.len() as u64) as usize
    }

    fn session_shard(&self, session_id: &SessionId) -> &SessionShard {
        &self.sessions[self.stripe(session_id)]
    }

    fn peer_shard(&self, peer: &PeerId) -> &PeerShard {
        &self.peers[self.stripe(peer)]
    }

    // ------------------------------------------------------------------------
    // Reverse index helpers (caller holds the owning session shard)
    // ------------------------------------------------------------------------

    fn indexed(&self, peer: &PeerId) -> Option<PeerBinding> {
        self.peer_shard(peer).lock().get(peer).cloned()
    }

    fn bind(&self, peer: PeerId, session_id: SessionId, role: Role) {
        self.peer_shard(&peer)
            .lock()
            .insert(peer, PeerBinding { session_id, role });
    }

    /// Remove the index entry only if it still points at this slot
    fn unbind(&self, peer: &PeerId, session_id: &SessionId, role: Role) {
        let mut shard = self.peer_shard(peer).lock();
        if shard
            .get(peer)
            .is_some_and(|b| b.role == role && &b.session_id == session_id)
        {
            shard.remove(peer);
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Register `peer` as host of `session_id`.
    ///
    /// Creates the record if absent, otherwise overwrites only the host slot;
    /// an attached client stays attached.
    pub fn register_host(&self, session_id: &SessionId, peer: PeerId) -> HostRegistration {
        let released = self.release_elsewhere(&peer, session_id, Role::Host);

        let mut sessions = self.session_shard(session_id).lock();
        let (created, replaced_host) = match sessions.get_mut(session_id) {
            Some(record) => {
                let previous = std::mem::replace(&mut record.host, peer);
                (false, (previous != peer).then_some(previous))
            }
            None => {
                sessions.insert(
                    session_id.clone(),
                    SessionRecord {
                        session_id: session_id.clone(),
                        host: peer,
                        client: None,
                    },
                );
                (true, None)
            }
        };

        if let Some(previous) = replaced_host {
            self.unbind(&previous, session_id, Role::Host);
        }
        self.bind(peer, session_id.clone(), Role::Host);
        drop(sessions);

        HostRegistration {
            created,
            replaced_host,
            released,
        }
    }

    /// Attach `peer` as the client of an existing session.
    ///
    /// Fails without touching the registry when the session does not exist
    /// or when `peer` is already its host. Any slot `peer` holds in another
    /// session is released first.
    pub fn attach_client(
        &self,
        session_id: &SessionId,
        peer: PeerId,
    ) -> Result<ClientAttachment, RegistryError> {
        if !self.contains(session_id) {
            return Err(RegistryError::SessionNotFound(session_id.clone()));
        }
        if self.find_by_host(&peer).as_ref() == Some(session_id) {
            return Err(RegistryError::AlreadyHost(session_id.clone()));
        }

        let released = self.release_elsewhere(&peer, session_id, Role::Client);

        let mut sessions = self.session_shard(session_id).lock();
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| RegistryError::SessionNotFound(session_id.clone()))?;

        let host = record.host;
        let replaced_client = record.client.replace(peer).filter(|c| *c != peer);

        if let Some(previous) = replaced_client {
            self.unbind(&previous, session_id, Role::Client);
        }
        self.bind(peer, session_id.clone(), Role::Client);
        drop(sessions);

        Ok(ClientAttachment {
            host,
            replaced_client,
            released,
        })
    }

    /// Delete a session and both of its index entries
    pub fn remove_session(&self, session_id: &SessionId) -> Option<SessionRecord> {
        let mut sessions = self.session_shard(session_id).lock();
        let record = sessions.remove(session_id)?;

        self.unbind(&record.host, session_id, Role::Host);
        if let Some(client) = record.client {
            self.unbind(&client, session_id, Role::Client);
        }
        Some(record)
    }

    /// Empty the client slot, keeping the session open.
    /// Returns the client that was removed.
    pub fn clear_client(&self, session_id: &SessionId) -> Option<PeerId> {
        let mut sessions = self.session_shard(session_id).lock();
        let client = sessions.get_mut(session_id)?.client.take()?;

        self.unbind(&client, session_id, Role::Client);
        Some(client)
    }

    /// Unbind `peer` from whatever slot it holds, in one transaction.
    ///
    /// A host takes its session down with it; a client only frees its slot.
    /// Returns `None` for a peer that was never bound.
    pub fn release(&self, peer: &PeerId) -> Option<Release> {
        let binding = self.indexed(peer)?;
        let mut sessions = self.session_shard(&binding.session_id).lock();

        let holds = sessions
            .get(&binding.session_id)
            .is_some_and(|record| record.holds(peer, binding.role));
        if !holds {
            self.unbind(peer, &binding.session_id, binding.role);
            return None;
        }

        match binding.role {
            Role::Host => {
                let record = sessions.remove(&binding.session_id)?;
                self.unbind(peer, &record.session_id, Role::Host);
                if let Some(client) = record.client {
                    self.unbind(&client, &record.session_id, Role::Client);
                }
                Some(Release::HostLeft {
                    session_id: record.session_id,
                    client: record.client,
                })
            }
            Role::Client => {
                let record = sessions.get_mut(&binding.session_id)?;
                record.client = None;
                self.unbind(peer, &binding.session_id, Role::Client);
                Some(Release::ClientLeft {
                    session_id: binding.session_id,
                    host: record.host,
                })
            }
        }
    }

    /// Release `peer` unless it already occupies exactly this slot.
    /// Keeps a peer bound to at most one slot across all sessions.
    pub fn release_elsewhere(
        &self,
        peer: &PeerId,
        session_id: &SessionId,
        role: Role,
    ) -> Option<Release> {
        match self.binding(peer) {
            Some(b) if b.role == role && &b.session_id == session_id => None,
            Some(_) => self.release(peer),
            None => None,
        }
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Current binding of `peer`, validated against its record
    pub fn binding(&self, peer: &PeerId) -> Option<PeerBinding> {
        let binding = self.indexed(peer)?;
        let sessions = self.session_shard(&binding.session_id).lock();
        sessions
            .get(&binding.session_id)
            .filter(|record| record.holds(peer, binding.role))
            .map(|_| binding.clone())
    }

    /// Session in which `peer` is the host
    pub fn find_by_host(&self, peer: &PeerId) -> Option<SessionId> {
        self.binding(peer)
            .filter(|b| b.role == Role::Host)
            .map(|b| b.session_id)
    }

    /// Session in which `peer` is the attached client
    pub fn find_by_client(&self, peer: &PeerId) -> Option<SessionId> {
        self.binding(peer)
            .filter(|b| b.role == Role::Client)
            .map(|b| b.session_id)
    }

    /// Resolve where a message from `peer` should go
    pub fn route_from(&self, peer: &PeerId) -> Option<Route> {
        let binding = self.indexed(peer)?;
        let sessions = self.session_shard(&binding.session_id).lock();
        let record = sessions
            .get(&binding.session_id)
            .filter(|record| record.holds(peer, binding.role))?;

        let counterpart = match binding.role {
            Role::Host => record.client,
            Role::Client => Some(record.host),
        };
        Some(Route {
            session_id: binding.session_id,
            role: binding.role,
            counterpart,
        })
    }

    /// Snapshot of one record
    pub fn get(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.session_shard(session_id).lock().get(session_id).cloned()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.session_shard(session_id).lock().contains_key(session_id)
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.sessions.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Number of peers currently bound to a session
    pub fn bound_peer_count(&self) -> usize {
        self.peers.iter().map(|shard| shard.lock().len()).sum()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
