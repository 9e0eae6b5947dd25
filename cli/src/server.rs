use futures::{SinkExt, StreamExt};
use pitchlink_core::{
    Dispatch, PeerHub, PeerId, RelayError, RelayService, RelayStatsSnapshot, SessionRegistry,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use warp::filters::BoxedFilter;
use warp::ws::{Message, WebSocket};
use warp::{Filter, Reply};

use crate::config::ServerConfig;

/// Plain-text body of the health endpoint
const HEALTH_TEXT: &str = "Pitchlink relay is running";

// ============================================================================
// SHARED STATE
// ============================================================================

/// Everything a connection task or HTTP handler needs
pub struct ServerState {
    pub relay: RelayService<PeerHub>,
    pub hub: Arc<PeerHub>,
    pub start_time: Instant,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let hub = Arc::new(PeerHub::with_buffer(config.outbound_buffer));
        let registry = Arc::new(SessionRegistry::with_shards(config.registry_shards));
        Self {
            relay: RelayService::new(registry, Arc::clone(&hub)),
            hub,
            start_time: Instant::now(),
            ping_interval: Duration::from_secs(config.ping_interval_secs.max(1)),
            ping_timeout: Duration::from_secs(config.ping_timeout_secs.max(1)),
        }
    }

    fn status(&self) -> StatusResponse {
        StatusResponse {
            version: pitchlink_core::VERSION,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            sessions: self.relay.session_count(),
            connections: self.hub.connection_count(),
            stats: self.relay.stats(),
        }
    }
}

// ============================================================================
// API RESPONSE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: &'static str,
    uptime_seconds: u64,
    sessions: usize,
    connections: usize,
    stats: RelayStatsSnapshot,
}

// ============================================================================
// ROUTES
// ============================================================================

pub fn routes(state: Arc<ServerState>) -> BoxedFilter<(impl Reply,)> {
    let state_filter = warp::any().map(move || Arc::clone(&state));

    // 1. Health line at /
    let health_route = warp::path::end()
        .and(warp::get())
        .map(|| HEALTH_TEXT)
        .boxed();

    // 2. Read-only status at /status
    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: Arc<ServerState>| warp::reply::json(&state.status()))
        .boxed();

    // 3. WebSocket at /ws
    let ws_route = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(state_filter)
        .map(|ws: warp::ws::Ws, state: Arc<ServerState>| {
            ws.on_upgrade(move |socket| handle_connection(socket, state))
        })
        .boxed();

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"]);

    health_route
        .or(status_route)
        .or(ws_route)
        .with(cors)
        .boxed()
}

/// Serve until the listener task ends
pub async fn serve(config: &ServerConfig, state: Arc<ServerState>) {
    let addr = config.listen_addr();
    tracing::info!("Listening on {}", addr);
    warp::serve(routes(state)).run(addr).await;
}

// ============================================================================
// WEBSOCKET HANDLER
// ============================================================================

async fn handle_connection(ws: WebSocket, state: Arc<ServerState>) {
    let (peer, mut outbound_rx) = state.hub.connect();
    state.relay.on_connect(&peer);

    let (mut ws_tx, mut ws_rx) = ws.split();

    let mut ping = tokio::time::interval(state.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            Some(event) = outbound_rx.recv() => {
                let kind = event.kind();
                match event.encode() {
                    Ok(text) => {
                        if let Err(e) = ws_tx.send(Message::text(text)).await {
                            tracing::debug!("Send to {} failed: {}", peer, e);
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Could not encode {} for {}: {}", kind, peer, e),
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(msg)) => {
                        last_seen = Instant::now();
                        if msg.is_close() {
                            break;
                        }
                        if let Ok(text) = msg.to_str() {
                            handle_text(&state.relay, &peer, text);
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error from {}: {}", peer, e);
                        break;
                    }
                    None => break,
                }
            }
            _ = ping.tick() => {
                if last_seen.elapsed() >= state.ping_timeout {
                    tracing::info!("Peer {} timed out after {:?}", peer, state.ping_timeout);
                    break;
                }
                if ws_tx.send(Message::ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(
        "Closing connection {} (session {:?})",
        peer,
        state.hub.group_of(&peer)
    );
    state.hub.disconnect(&peer);
    state.relay.on_disconnect(&peer);
    let _ = ws_tx.close().await;
}

/// Dispatch one text frame and log what happened
fn handle_text(relay: &RelayService<PeerHub>, peer: &PeerId, text: &str) {
    match relay.on_message(peer, text) {
        Ok(Some(Dispatch::Dropped { kind, reason })) => {
            tracing::debug!("Dropped {} from {}: {}", kind, peer, reason);
        }
        Ok(Some(outcome)) => tracing::debug!("{}: {:?}", peer, outcome),
        Ok(None) => tracing::debug!("Ignoring unknown event from {}", peer),
        Err(RelayError::SessionNotFound(session_id)) => {
            tracing::debug!("Peer {} asked for unknown session {}", peer, session_id);
        }
        Err(RelayError::MalformedPayload(e)) => {
            tracing::warn!("Malformed frame from {}: {}", peer, e);
        }
        Err(RelayError::Transport(e)) => tracing::warn!("Relay from {} not delivered: {}", peer, e),
    }
}

// ============================================================================
// TESTS
// ============================================================================
