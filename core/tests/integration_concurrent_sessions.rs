// Integration tests for many sessions running at once
//
// Uses the real PeerHub so deliveries land in per-peer queues, and drives
// each session from its own task on a multi-threaded runtime.

use pitchlink_core::{Outbound, PeerHub, RelayService, SessionId, SessionRegistry};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

fn frame(event: &str, data: serde_json::Value) -> String {
    json!({ "event": event, "data": data }).to_string()
}

fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_two_sessions_never_cross_deliver() {
    let hub = Arc::new(PeerHub::new());
    let relay = RelayService::new(Arc::new(SessionRegistry::new()), Arc::clone(&hub));

    let (host_a, mut host_a_rx) = hub.connect();
    let (client_a, mut client_a_rx) = hub.connect();
    let (host_b, mut host_b_rx) = hub.connect();
    let (client_b, mut client_b_rx) = hub.connect();

    relay.on_message(&host_a, &frame("register_host", json!("A"))).unwrap();
    relay.on_message(&host_b, &frame("register_host", json!("B"))).unwrap();
    relay.on_message(&client_a, &frame("join_session", json!("A"))).unwrap();
    relay.on_message(&client_b, &frame("join_session", json!("B"))).unwrap();
    drain(&mut host_a_rx);
    drain(&mut host_b_rx);

    relay.on_message(&host_a, &frame("score_update", json!({"a": 1}))).unwrap();

    assert_eq!(drain(&mut client_a_rx), vec![Outbound::ScoreUpdate(json!({"a": 1}))]);
    assert!(drain(&mut client_b_rx).is_empty());
    assert!(drain(&mut host_a_rx).is_empty());
    assert!(drain(&mut host_b_rx).is_empty());

    println!("✓ Sessions A and B stay isolated");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sessions_in_parallel() {
    const SESSIONS: usize = 64;
    const ROUNDS: usize = 20;

    let hub = Arc::new(PeerHub::with_buffer(ROUNDS * 4));
    let relay = Arc::new(RelayService::new(
        Arc::new(SessionRegistry::with_shards(8)),
        Arc::clone(&hub),
    ));

    let mut tasks = Vec::new();
    for i in 0..SESSIONS {
        let hub = Arc::clone(&hub);
        let relay = Arc::clone(&relay);
        tasks.push(tokio::spawn(async move {
            let session = format!("room-{}", i);
            let (host, mut host_rx) = hub.connect();
            let (client, mut client_rx) = hub.connect();

            relay.on_message(&host, &frame("register_host", json!(session))).unwrap();
            relay.on_message(&client, &frame("join_session", json!(session))).unwrap();

            for round in 0..ROUNDS {
                relay
                    .on_message(&client, &frame("send_kick", json!({"s": i, "r": round})))
                    .unwrap();
                relay
                    .on_message(&host, &frame("shot_result", json!({"s": i, "r": round})))
                    .unwrap();
                tokio::task::yield_now().await;
            }

            let host_events = drain(&mut host_rx);
            let client_events = drain(&mut client_rx);
            (i, host_events, client_events)
        }));
    }

    for task in tasks {
        let (i, host_events, client_events) = task.await.unwrap();

        // client_connected plus one kick per round
        assert_eq!(host_events.len(), ROUNDS + 1);
        assert_eq!(host_events[0], Outbound::client_connected());
        for event in &host_events[1..] {
            match event {
                Outbound::ReceiveKick(data) => assert_eq!(data["s"], json!(i)),
                other => panic!("host of session {} got {:?}", i, other),
            }
        }

        assert_eq!(client_events.len(), ROUNDS);
        for event in &client_events {
            match event {
                Outbound::ShotResult(data) => assert_eq!(data["s"], json!(i)),
                other => panic!("client of session {} got {:?}", i, other),
            }
        }
    }

    assert_eq!(relay.session_count(), SESSIONS);
    assert_eq!(relay.stats().messages_relayed, (SESSIONS * ROUNDS * 2) as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_disconnects_leave_registry_consistent() {
    const SESSIONS: usize = 32;

    let hub = Arc::new(PeerHub::new());
    let registry = Arc::new(SessionRegistry::with_shards(4));
    let relay = Arc::new(RelayService::new(Arc::clone(&registry), Arc::clone(&hub)));

    let mut pairs = Vec::new();
    for i in 0..SESSIONS {
        let session = format!("race-{}", i);
        let (host, host_rx) = hub.connect();
        let (client, client_rx) = hub.connect();
        relay.on_message(&host, &frame("register_host", json!(session))).unwrap();
        relay.on_message(&client, &frame("join_session", json!(session))).unwrap();
        pairs.push((host, client, host_rx, client_rx));
    }

    let mut tasks = Vec::new();
    for (host, client, _host_rx, _client_rx) in &pairs {
        for peer in [*host, *client] {
            let relay = Arc::clone(&relay);
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                hub.disconnect(&peer);
                relay.on_disconnect(&peer);
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(registry.session_count(), 0);
    assert_eq!(registry.bound_peer_count(), 0);
    for (host, client, _, _) in &pairs {
        assert_eq!(registry.find_by_host(host), None);
        assert_eq!(registry.find_by_client(client), None);
    }
    assert!(!registry.contains(&SessionId::from("race-0")));
}
