//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::ssh::types::{Credentials, TerminalSize};

/// Default SSH port when the connect form omits one.
const DEFAULT_SSH_PORT: u32 = 22;

/// Port as sent by browsers: a number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl Default for PortValue {
    fn default() -> Self {
        PortValue::Number(i64::from(DEFAULT_SSH_PORT))
    }
}

impl PortValue {
    /// Unparseable or out-of-range values map to 0, which fails validation.
    pub fn resolve(&self) -> u32 {
        match self {
            PortValue::Number(n) => u32::try_from(*n).unwrap_or(0),
            PortValue::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

/// Body of `POST /api/connect`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: PortValue,
    #[serde(default)]
    pub username: String,
    pub password: Option<String>,
    #[serde(alias = "privateKey")]
    pub privatekey: Option<String>,
    pub passphrase: Option<String>,
}

impl From<ConnectRequest> for Credentials {
    fn from(request: ConnectRequest) -> Self {
        Credentials {
            hostname: request.hostname.trim().to_string(),
            port: request.port.resolve(),
            username: request.username.trim().to_string(),
            password: request.password,
            private_key: request.privatekey,
            passphrase: request.passphrase,
        }
    }
}

/// Response of `POST /api/connect`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConnectResponse {
    pub fn connected(session_id: String) -> Self {
        Self {
            success: true,
            session_id: Some(session_id),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: None,
            message: Some(message.into()),
        }
    }
}

/// Query string of `GET /api/ws`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsQuery {
    pub session_id: Option<String>,
    pub cols: Option<u32>,
    pub rows: Option<u32>,
}

impl WsQuery {
    /// Non-empty session id, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Initial geometry, only when both dimensions are present and non-zero.
    pub fn initial_size(&self) -> Option<TerminalSize> {
        match (self.cols, self.rows) {
            (Some(cols), Some(rows)) if cols > 0 && rows > 0 => Some(TerminalSize { cols, rows }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub connections: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}
