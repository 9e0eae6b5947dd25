//! Relay Protocol — named events and their JSON framing
//!
//! Every frame is a JSON object `{"event": "<kind>", "data": <payload>}`.
//! Payloads other than session ids are opaque and forwarded unchanged.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Event names on the wire
pub mod event {
    pub const REGISTER_HOST: &str = "register_host";
    pub const JOIN_SESSION: &str = "join_session";
    pub const CLIENT_CONNECTED: &str = "client_connected";
    pub const SESSION_ERROR: &str = "session_error";
    pub const SEND_KICK: &str = "send_kick";
    pub const RECEIVE_KICK: &str = "receive_kick";
    pub const SCORE_UPDATE: &str = "score_update";
    pub const SHOT_RESULT: &str = "shot_result";
    pub const GAME_OVER: &str = "game_over";
    pub const HOST_DISCONNECTED: &str = "host_disconnected";
    pub const CLIENT_DISCONNECTED: &str = "client_disconnected";
}

/// Note sent to a host when a controller attaches
pub const CLIENT_CONNECTED_NOTE: &str = "Controller connected!";

/// Message sent to a peer that tried to join an unknown session
pub const SESSION_NOT_FOUND_MESSAGE: &str = "Session not found. Make sure the host display is open.";

/// Protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Invalid session id for {event}: {reason}")]
    InvalidSessionId { event: &'static str, reason: String },
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// One frame as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Events a peer may send to the server
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    RegisterHost(SessionId),
    JoinSession(SessionId),
    SendKick(Value),
    ScoreUpdate(Value),
    ShotResult(Value),
    GameOver(Value),
}

impl Inbound {
    /// Decode one text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames naming an event this server
    /// does not handle.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        let frame: Frame =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFrame(e.to_string()))?;
        Self::from_frame(frame)
    }

    pub fn from_frame(frame: Frame) -> Result<Option<Self>, ProtocolError> {
        let message = match frame.event.as_str() {
            event::REGISTER_HOST => {
                Inbound::RegisterHost(session_id(event::REGISTER_HOST, frame.data)?)
            }
            event::JOIN_SESSION => {
                Inbound::JoinSession(session_id(event::JOIN_SESSION, frame.data)?)
            }
            event::SEND_KICK => Inbound::SendKick(frame.data),
            event::SCORE_UPDATE => Inbound::ScoreUpdate(frame.data),
            event::SHOT_RESULT => Inbound::ShotResult(frame.data),
            event::GAME_OVER => Inbound::GameOver(frame.data),
            _ => return Ok(None),
        };
        Ok(Some(message))
    }

    /// Wire name of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::RegisterHost(_) => event::REGISTER_HOST,
            Inbound::JoinSession(_) => event::JOIN_SESSION,
            Inbound::SendKick(_) => event::SEND_KICK,
            Inbound::ScoreUpdate(_) => event::SCORE_UPDATE,
            Inbound::ShotResult(_) => event::SHOT_RESULT,
            Inbound::GameOver(_) => event::GAME_OVER,
        }
    }
}

/// Largest integer an f64 holds exactly (2^53)
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Session ids arrive as strings; numbers are accepted in their decimal form
fn session_id(event: &'static str, data: Value) -> Result<SessionId, ProtocolError> {
    let id = match data {
        Value::String(s) => s,
        Value::Number(n) => number_key(&n),
        other => {
            return Err(ProtocolError::InvalidSessionId {
                event,
                reason: format!("expected string, got {}", json_type(&other)),
            })
        }
    };

    if id.is_empty() {
        return Err(ProtocolError::InvalidSessionId {
            event,
            reason: "empty".to_string(),
        });
    }
    Ok(SessionId::new(id))
}

/// Integral floats lose their fraction so `7.0` and `7` name the same session
fn number_key(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT_INT => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Events the server sends to a peer
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    ClientConnected(String),
    SessionError(String),
    ReceiveKick(Value),
    ScoreUpdate(Value),
    ShotResult(Value),
    GameOver(Value),
    HostDisconnected,
    ClientDisconnected,
}

impl Outbound {
    pub fn client_connected() -> Self {
        Outbound::ClientConnected(CLIENT_CONNECTED_NOTE.to_string())
    }

    pub fn session_not_found() -> Self {
        Outbound::SessionError(SESSION_NOT_FOUND_MESSAGE.to_string())
    }

    /// Wire name of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::ClientConnected(_) => event::CLIENT_CONNECTED,
            Outbound::SessionError(_) => event::SESSION_ERROR,
            Outbound::ReceiveKick(_) => event::RECEIVE_KICK,
            Outbound::ScoreUpdate(_) => event::SCORE_UPDATE,
            Outbound::ShotResult(_) => event::SHOT_RESULT,
            Outbound::GameOver(_) => event::GAME_OVER,
            Outbound::HostDisconnected => event::HOST_DISCONNECTED,
            Outbound::ClientDisconnected => event::CLIENT_DISCONNECTED,
        }
    }

    pub fn into_frame(self) -> Frame {
        let event = self.kind().to_string();
        let data = match self {
            Outbound::ClientConnected(note) => Value::String(note),
            Outbound::SessionError(message) => Value::String(message),
            Outbound::ReceiveKick(data)
            | Outbound::ScoreUpdate(data)
            | Outbound::ShotResult(data)
            | Outbound::GameOver(data) => data,
            Outbound::HostDisconnected | Outbound::ClientDisconnected => Value::Null,
        };
        Frame { event, data }
    }

    /// Encode as a JSON text frame
    pub fn encode(self) -> Result<String, ProtocolError> {
        serde_json::to_string(&self.into_frame())
            .map_err(|e| ProtocolError::SerializationError(e.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
