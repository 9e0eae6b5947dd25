//! Session pairing state
//!
//! A session pairs one host display with at most one client controller.

pub mod identity;
pub mod registry;

pub use identity::{PeerId, Role, SessionId};
pub use registry::{
    ClientAttachment, HostRegistration, PeerBinding, RegistryError, Release, Route,
    SessionRecord, SessionRegistry, DEFAULT_SHARDS,
};
