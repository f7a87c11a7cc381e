/*
 *  mopidy/rpc.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  JSON-RPC 2.0 wire types for the Mopidy WebSocket endpoint
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised by the Mopidy session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The WebSocket handshake failed; fatal at startup.
    #[error("unable to connect to Mopidy at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    /// Error on an established connection.
    #[error("Mopidy transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    /// Error serializing the request payload to JSON.
    #[error("JSON serialization error: {0}")]
    Serialization(serde_json::Error),
    /// Error deserializing a response payload.
    #[error("JSON deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// The server answered with a JSON-RPC error object.
    #[error("Mopidy error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The connection went away before the reply arrived.
    #[error("Mopidy session closed")]
    Closed,
}

/// Outgoing request payload.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        JsonRpcRequest { jsonrpc: "2.0", id, method, params }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub data: Option<Value>,
}

/// Reply to a request, matched back to the caller by `id`.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// A missing or null `result` is a legitimate `null` reply.
    pub fn into_result(self) -> Result<Value, SessionError> {
        if let Some(error) = self.error {
            return Err(SessionError::Rpc { code: error.code, message: error.message });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Server-pushed notification; the payload is not needed, only the name.
#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub event: String,
}

/// Anything arriving on the socket.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Event(EventMessage),
    Response(JsonRpcResponse),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_params() {
        let req = JsonRpcRequest::new(7, "core.playback.next", None);
        let v: Value = serde_json::to_value(&req).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": 7, "method": "core.playback.next"}));
    }

    #[test]
    fn test_request_with_named_params() {
        let req = JsonRpcRequest::new(1, "core.mixer.set_volume", Some(json!({"volume": 40})));
        let v: Value = serde_json::to_value(&req).unwrap();
        assert_eq!(v["params"]["volume"], 40);
    }

    #[test]
    fn test_incoming_event() {
        let msg = r#"{"event": "track_playback_started", "tl_track": {"tlid": 3}}"#;
        match serde_json::from_str::<Incoming>(msg).unwrap() {
            Incoming::Event(ev) => assert_eq!(ev.event, "track_playback_started"),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_incoming_null_result() {
        let msg = r#"{"jsonrpc": "2.0", "id": 4, "result": null}"#;
        match serde_json::from_str::<Incoming>(msg).unwrap() {
            Incoming::Response(resp) => {
                assert_eq!(resp.id, Some(4));
                assert_eq!(resp.into_result().unwrap(), Value::Null);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_incoming_rpc_error() {
        let msg = r#"{"jsonrpc": "2.0", "id": 9, "error": {"code": -32601, "message": "Method not found"}}"#;
        let Incoming::Response(resp) = serde_json::from_str::<Incoming>(msg).unwrap() else {
            panic!("expected response");
        };
        match resp.into_result() {
            Err(SessionError::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }
}
