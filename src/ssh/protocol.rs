//! Terminal wire protocol.
//!
//! Text units are JSON objects with a `type` discriminator; binary units carry
//! raw terminal bytes.
//!
//! | Direction | `type` | Fields |
//! |-----------|--------|--------|
//! | client → server | `resize` | `cols`, `rows` |
//! | client → server | `data` | `data` |
//! | server → client | `connected` | |
//! | server → client | `error` | `message` |
//!
//! Client units are decoded in two stages. First the unit is checked for the
//! control grammar (a JSON object with a string `type`); only then is it
//! decoded into a concrete message. A unit outside the grammar is literal
//! terminal input. A unit inside the grammar whose type is unknown is dropped.

use serde::Deserialize;
use serde_json::Value;

use super::types::TerminalSize;

/// A single WebSocket unit, independent of the web framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Announcements sent from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Connected,
    Error { message: String },
}

impl ServerMessage {
    pub fn to_frame(&self) -> ClientFrame {
        let json = match self {
            ServerMessage::Connected => serde_json::json!({ "type": "connected" }),
            ServerMessage::Error { message } => {
                serde_json::json!({ "type": "error", "message": message })
            }
        };
        ClientFrame::Text(json.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ControlMessage {
    Resize { cols: u32, rows: u32 },
    Data { data: String },
}

/// What a client unit asks the bridge to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// Change the remote pty geometry
    Resize(TerminalSize),
    /// Payload of a `data` control message
    Data(Vec<u8>),
    /// Anything outside the control grammar, written verbatim
    Raw(Vec<u8>),
    /// Well-formed control message of an unknown type
    Ignored(String),
}

/// Decode one client unit.
pub fn decode_client_frame(frame: ClientFrame) -> ClientInput {
    let text = match frame {
        ClientFrame::Binary(bytes) => return ClientInput::Raw(bytes),
        ClientFrame::Text(text) => text,
    };

    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value @ Value::Object(_)) => value,
        _ => return ClientInput::Raw(text.into_bytes()),
    };

    let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_string) else {
        return ClientInput::Raw(text.into_bytes());
    };

    match serde_json::from_value::<ControlMessage>(value) {
        Ok(ControlMessage::Resize { cols, rows }) => {
            ClientInput::Resize(TerminalSize { cols, rows })
        }
        Ok(ControlMessage::Data { data }) => ClientInput::Data(data.into_bytes()),
        // A known type with bad fields is not a control message
        Err(_) if kind == "resize" || kind == "data" => ClientInput::Raw(text.into_bytes()),
        Err(_) => ClientInput::Ignored(kind),
    }
}
