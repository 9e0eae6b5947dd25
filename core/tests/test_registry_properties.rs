// Property tests for the session registry

use pitchlink_core::{PeerId, SessionId, SessionRegistry};
use proptest::prelude::*;

proptest! {
    /// Whatever order hosts register in, the last one for each id wins and
    /// there is exactly one record per distinct id.
    #[test]
    fn prop_latest_host_registration_wins(
        registrations in prop::collection::vec((0usize..4, 0usize..6), 1..40)
    ) {
        let registry = SessionRegistry::with_shards(3);
        let peers: Vec<PeerId> = (0..6).map(|_| PeerId::generate()).collect();
        let mut expected: std::collections::HashMap<usize, usize> = Default::default();

        for (session, peer) in &registrations {
            registry.register_host(&SessionId::new(format!("s{}", session)), peers[*peer]);

            // A peer moving to a new session takes its old one down with it
            expected.retain(|s, p| !(*p == *peer && s != session));
            expected.insert(*session, *peer);
        }

        prop_assert_eq!(registry.session_count(), expected.len());
        for (session, peer) in &expected {
            let id = SessionId::new(format!("s{}", session));
            let record = registry.get(&id).unwrap();
            prop_assert_eq!(record.host, peers[*peer]);
            prop_assert_eq!(registry.find_by_host(&peers[*peer]), Some(id));
        }
    }

    /// Joining an id that was never registered fails and leaves no trace
    #[test]
    fn prop_attach_without_host_never_mutates(
        registered in prop::collection::hash_set("[a-c]{1,2}", 0..4),
        target in "[d-f]{1,2}",
    ) {
        let registry = SessionRegistry::new();
        for id in &registered {
            registry.register_host(&SessionId::from(id.as_str()), PeerId::generate());
        }
        let before = (registry.session_count(), registry.bound_peer_count());

        let client = PeerId::generate();
        prop_assert!(registry.attach_client(&SessionId::from(target.as_str()), client).is_err());

        prop_assert_eq!((registry.session_count(), registry.bound_peer_count()), before);
        prop_assert_eq!(registry.find_by_client(&client), None);
    }
}
