// Shared test double: a transport that records every delivery

#![allow(dead_code)]

use parking_lot::Mutex;
use pitchlink_core::{Outbound, PeerId, RelayService, SessionId, SessionRegistry, Transport, TransportError};
use std::sync::Arc;

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(PeerId, Outbound)>>,
    groups: Mutex<Vec<(PeerId, SessionId)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(PeerId, Outbound)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, peer: &PeerId) -> Vec<Outbound> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| to == peer)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn groups(&self) -> Vec<(PeerId, SessionId)> {
        self.groups.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Transport for RecordingTransport {
    fn send(&self, peer: &PeerId, event: Outbound) -> Result<(), TransportError> {
        self.sent.lock().push((*peer, event));
        Ok(())
    }

    fn join_group(&self, peer: &PeerId, session_id: &SessionId) {
        self.groups.lock().push((*peer, session_id.clone()));
    }
}

pub fn relay() -> (RelayService<RecordingTransport>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let relay = RelayService::new(Arc::new(SessionRegistry::new()), Arc::clone(&transport));
    (relay, transport)
}

pub fn frame(event: &str, data: serde_json::Value) -> String {
    serde_json::json!({ "event": event, "data": data }).to_string()
}
