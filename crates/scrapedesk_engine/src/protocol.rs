//! Text framing for Socket.IO v5 over Engine.IO v4, client side.
//!
//! Every WebSocket text frame is one Engine.IO packet: a single type digit
//! followed by its payload. Engine.IO `message` packets carry one Socket.IO
//! packet, which is again a type digit, an optional `/namespace,` prefix, an
//! optional ack id and a JSON payload. Binary attachments are not supported.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketType(char),
    #[error("malformed packet payload: {0}")]
    Payload(String),
    #[error("unsupported server scheme {0}")]
    UnsupportedScheme(String),
}

/// Handshake data from the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenInfo {
    /// How long the client may go without a ping before the link counts as dead.
    pub fn ping_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack,
    ConnectError(Option<Value>),
    Binary,
    /// Any packet addressed to a namespace other than `/`.
    Foreign { namespace: String },
}

impl SocketPacket {
    /// Reason text of a `CONNECT_ERROR`, as the JS client exposes it.
    pub fn connect_error_message(payload: Option<&Value>) -> String {
        match payload {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => "connect error".to_string(),
        }
    }
}

pub fn decode_engine_packet(text: &str) -> Result<EnginePacket, ProtocolError> {
    let (kind, rest) = split_type(text)?;
    match kind {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|err| ProtocolError::Payload(err.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => Ok(EnginePacket::Message(rest.to_string())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownEngineType(other)),
    }
}

pub fn encode_engine_packet(packet: &EnginePacket) -> String {
    match packet {
        EnginePacket::Open(info) => {
            let mut payload = serde_json::json!({
                "sid": info.sid,
                "upgrades": info.upgrades,
                "pingInterval": info.ping_interval,
                "pingTimeout": info.ping_timeout,
            });
            if let Some(max_payload) = info.max_payload {
                payload["maxPayload"] = Value::from(max_payload);
            }
            format!("0{payload}")
        }
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping(data) => format!("2{data}"),
        EnginePacket::Pong(data) => format!("3{data}"),
        EnginePacket::Message(data) => format!("4{data}"),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    }
}

/// Decodes the Socket.IO packet carried by an Engine.IO `message`.
pub fn decode_socket_packet(text: &str) -> Result<SocketPacket, ProtocolError> {
    let (kind, rest) = split_type(text)?;
    let (namespace, rest) = split_namespace(rest);
    if namespace != DEFAULT_NAMESPACE {
        return Ok(SocketPacket::Foreign {
            namespace: namespace.to_string(),
        });
    }
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' => Ok(SocketPacket::Connect(parse_optional(rest)?)),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => parse_event(rest),
        '3' => Ok(SocketPacket::Ack),
        '4' => Ok(SocketPacket::ConnectError(parse_optional(rest)?)),
        '5' | '6' => Ok(SocketPacket::Binary),
        other => Err(ProtocolError::UnknownSocketType(other)),
    }
}

pub fn encode_socket_packet(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect(None) => "0".to_string(),
        SocketPacket::Connect(Some(payload)) => format!("0{payload}"),
        SocketPacket::Disconnect => "1".to_string(),
        SocketPacket::Event { name, args } => {
            let mut array = Vec::with_capacity(args.len() + 1);
            array.push(Value::String(name.clone()));
            array.extend(args.iter().cloned());
            format!("2{}", Value::Array(array))
        }
        SocketPacket::Ack => "3".to_string(),
        SocketPacket::ConnectError(None) => "4".to_string(),
        SocketPacket::ConnectError(Some(payload)) => format!("4{payload}"),
        SocketPacket::Binary => "5".to_string(),
        SocketPacket::Foreign { namespace } => format!("0{namespace},"),
    }
}

/// Complete WebSocket text frame for emitting `name` with a single payload.
pub fn encode_event(name: &str, payload: &Value) -> String {
    encode_engine_packet(&EnginePacket::Message(encode_socket_packet(
        &SocketPacket::Event {
            name: name.to_string(),
            args: vec![payload.clone()],
        },
    )))
}

fn split_type(text: &str) -> Result<(char, &str), ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    Ok((kind, chars.as_str()))
}

fn split_namespace(rest: &str) -> (&str, &str) {
    if !rest.starts_with('/') {
        return (DEFAULT_NAMESPACE, rest);
    }
    match rest.split_once(',') {
        Some((namespace, tail)) => (namespace, tail),
        None => (rest, ""),
    }
}

fn parse_optional(rest: &str) -> Result<Option<Value>, ProtocolError> {
    if rest.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(rest)
        .map(Some)
        .map_err(|err| ProtocolError::Payload(err.to_string()))
}

fn parse_event(rest: &str) -> Result<SocketPacket, ProtocolError> {
    let value: Value =
        serde_json::from_str(rest).map_err(|err| ProtocolError::Payload(err.to_string()))?;
    let Value::Array(mut parts) = value else {
        return Err(ProtocolError::Payload("event payload is not an array".into()));
    };
    if parts.is_empty() {
        return Err(ProtocolError::Payload("event payload is empty".into()));
    }
    let name = match parts.remove(0) {
        Value::String(name) => name,
        other => {
            return Err(ProtocolError::Payload(format!(
                "event name is not a string: {other}"
            )))
        }
    };
    Ok(SocketPacket::Event { name, args: parts })
}
