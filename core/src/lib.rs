// pitchlink core — session pairing and game-event relay
//
// One host display, one client controller, one named session.
// Everything the relay knows lives in memory and dies with the process.

pub mod relay;
pub mod session;
pub mod transport;

pub use relay::{
    Dispatch, DropReason, Inbound, Outbound, RelayError, RelayService, RelayStatsSnapshot,
};
pub use session::{PeerId, Release, Role, SessionId, SessionRecord, SessionRegistry};
pub use transport::{PeerHub, Transport, TransportError};

/// Crate version, reported by the status endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
