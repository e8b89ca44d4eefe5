//! Core data types shared by the registry, establisher and bridge.

use std::fmt;

use tokio::time::Instant;

use super::error::ValidationError;

/// Opaque session identifier (UUID v4 string).
pub type SessionId = String;

/// SSH login details for a single connection attempt.
///
/// Consumed by the establisher and dropped once the transport is
/// authenticated. The `Debug` implementation redacts every secret.
#[derive(Clone, Default)]
pub struct Credentials {
    pub hostname: String,
    pub port: u32,
    pub username: String,
    pub password: Option<String>,
    /// OpenSSH or PEM encoded private key text
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

impl Credentials {
    /// Check the credentials without touching the network.
    ///
    /// Checks run in a fixed order: hostname, username, port, then the presence
    /// of a password or private key. Empty secrets count as absent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hostname.trim().is_empty() {
            return Err(ValidationError::EmptyHostname);
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if !(1..=u32::from(u16::MAX)).contains(&self.port) {
            return Err(ValidationError::InvalidPort);
        }
        if self.password().is_none() && self.private_key().is_none() {
            return Err(ValidationError::NoCredentials);
        }
        Ok(())
    }

    /// Non-empty password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Non-empty private key text, if any.
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Non-empty key passphrase, if any.
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().filter(|p| !p.is_empty())
    }

    /// `user@host:port`, used to identify a session in logs.
    pub fn label(&self) -> String {
        format!(
            "{}@{}:{}",
            self.username.trim(),
            self.hostname.trim(),
            self.port
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |present: bool| if present { "<redacted>" } else { "<none>" };
        f.debug_struct("Credentials")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(self.password().is_some()))
            .field("private_key", &redact(self.private_key().is_some()))
            .field("passphrase", &redact(self.passphrase().is_some()))
            .finish()
    }
}

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u32,
    pub rows: u32,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Read-only view of a registry entry.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub label: String,
    pub created_at: Instant,
    /// Cleared once the bridge tears the session down
    pub connected: bool,
    /// Set as soon as a bridge claims the session
    pub attached: bool,
    pub has_channel: bool,
}
