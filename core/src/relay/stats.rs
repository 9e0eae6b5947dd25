//! Relay counters, readable without touching the session registry

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live relay statistics
#[derive(Debug, Default)]
pub struct RelayStats {
    connections_active: AtomicUsize,
    connections_total: AtomicU64,
    sessions_created: AtomicU64,
    messages_relayed: AtomicU64,
    messages_dropped: AtomicU64,
    malformed_frames: AtomicU64,
}

/// Point-in-time copy of `RelayStats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStatsSnapshot {
    pub connections_active: usize,
    pub connections_total: u64,
    pub sessions_created: u64,
    pub messages_relayed: u64,
    pub messages_dropped: u64,
    pub malformed_frames: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        // Saturating: a stray close must not wrap the gauge
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_gauge() {
        let stats = RelayStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        stats.connection_closed();
        stats.connection_closed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connections_active, 0);
        assert_eq!(snapshot.connections_total, 2);
    }

    #[test]
    fn test_counters() {
        let stats = RelayStats::new();
        stats.relayed();
        stats.relayed();
        stats.dropped();
        stats.malformed();
        stats.session_created();

        assert_eq!(
            stats.snapshot(),
            RelayStatsSnapshot {
                connections_active: 0,
                connections_total: 0,
                sessions_created: 1,
                messages_relayed: 2,
                messages_dropped: 1,
                malformed_frames: 1,
            }
        );
    }
}
