//! SSH client connection and authentication logic.
//!
//! This module handles the russh side of the connection lifecycle:
//!
//! ## Connection Lifecycle
//!
//! 1. **Client Configuration**: Build the russh client configuration with
//!    keepalive probes (10 second interval, 3 unanswered probes before the
//!    connection is declared dead) and no inactivity timeout, since an idle
//!    terminal is normal.
//!
//! 2. **Connection Establishment**: Open the TCP connection and run the SSH
//!    handshake. The caller bounds this with the configured connect timeout;
//!    dropping the future on timeout releases the half-open connection.
//!
//! 3. **Authentication**: Try, in order:
//!    - Private key authentication (key text decoded in memory)
//!    - Password authentication
//!    - Keyboard-interactive password replay
//!
//! 4. **Shell Channels**: [`SshTransport`] opens pty/shell channels on demand.
//!
//! No retries are attempted here; a failed connect is reported once.

use std::sync::Arc;

use async_trait::async_trait;
use russh::{Disconnect, client};
use tracing::debug;

use crate::ssh::auth::{AuthChain, AuthStrategy};
use crate::ssh::config::{KEEPALIVE_INTERVAL, KEEPALIVE_MAX};
use crate::ssh::session::SshClientHandler;
use crate::ssh::shell::request_shell;
use crate::ssh::transport::{Connector, PtyRequest, ShellChannel, Transport};
use crate::ssh::types::Credentials;

/// Build russh client configuration.
///
/// Creates an `Arc<client::Config>` with:
/// - No inactivity timeout (a terminal may sit idle indefinitely)
/// - Keepalive every [`KEEPALIVE_INTERVAL`], giving up after [`KEEPALIVE_MAX`] misses
pub(crate) fn build_client_config() -> Arc<client::Config> {
    Arc::new(client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: KEEPALIVE_MAX,
        ..Default::default()
    })
}

/// Build an authentication chain based on the provided credentials.
///
/// The chain is built with the following priority:
/// 1. Key-based authentication (if a private key is provided)
/// 2. Password authentication (if a password is provided)
/// 3. Keyboard-interactive replay of the same password
fn build_auth_chain(credentials: &Credentials) -> AuthChain {
    let mut chain = AuthChain::new();

    if let Some(key) = credentials.private_key() {
        chain = chain.with_key(key, credentials.passphrase().map(str::to_string));
    }

    if let Some(password) = credentials.password() {
        chain = chain
            .with_password(password)
            .with_keyboard_interactive(password);
    }

    chain
}

/// An authenticated russh connection.
pub struct SshTransport {
    handle: client::Handle<SshClientHandler>,
}

#[async_trait]
impl Transport for SshTransport {
    async fn open_shell(&self, pty: &PtyRequest) -> Result<ShellChannel, String> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| format!("Failed to open channel: {}", e))?;

        request_shell(channel, pty).await
    }

    async fn disconnect(&self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "Session closed", "en")
            .await
        {
            debug!("SSH transport already disconnected: {}", e);
        }
    }
}

/// Connector that opens real SSH connections with russh.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Transport>, String> {
        let port = u16::try_from(credentials.port)
            .map_err(|_| format!("Invalid port number: {}", credentials.port))?;
        let host = credentials.hostname.trim();

        let mut handle = client::connect(build_client_config(), (host, port), SshClientHandler)
            .await
            .map_err(|e| format!("Failed to connect: {}", e))?;

        let auth_chain = build_auth_chain(credentials);
        let success = auth_chain
            .authenticate(&mut handle, credentials.username.trim())
            .await?;

        if !success {
            return Err("Authentication failed: no authentication methods succeeded".to_string());
        }

        Ok(Arc::new(SshTransport { handle }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(password: Option<&str>, key: Option<&str>) -> Credentials {
        Credentials {
            hostname: "example.com".to_string(),
            port: 22,
            username: "root".to_string(),
            password: password.map(str::to_string),
            private_key: key.map(str::to_string),
            passphrase: None,
        }
    }

    mod client_config {
        use super::*;
        use std::time::Duration;

        #[test]
        fn test_builds_config_with_keepalive() {
            let config = build_client_config();
            assert_eq!(config.keepalive_interval, Some(Duration::from_secs(10)));
            assert_eq!(config.keepalive_max, 3);
        }

        #[test]
        fn test_no_inactivity_timeout() {
            let config = build_client_config();
            assert_eq!(config.inactivity_timeout, None);
        }
    }

    mod auth_chain {
        use super::*;

        #[test]
        fn test_password_adds_keyboard_interactive_fallback() {
            let chain = build_auth_chain(&credentials(Some("secret"), None));
            assert_eq!(chain.names(), vec!["password", "keyboard-interactive"]);
        }

        #[test]
        fn test_key_only() {
            let chain = build_auth_chain(&credentials(None, Some("key-text")));
            assert_eq!(chain.names(), vec!["key"]);
        }

        #[test]
        fn test_key_is_tried_first() {
            let chain = build_auth_chain(&credentials(Some("secret"), Some("key-text")));
            assert_eq!(
                chain.names(),
                vec!["key", "password", "keyboard-interactive"]
            );
        }

        #[test]
        fn test_empty_secrets_build_empty_chain() {
            let chain = build_auth_chain(&credentials(Some(""), Some("")));
            assert!(chain.is_empty());
        }
    }

    #[tokio::test]
    async fn test_out_of_range_port_fails_before_connecting() {
        let creds = Credentials {
            port: 70_000,
            ..credentials(Some("secret"), None)
        };
        let err = SshConnector.connect(&creds).await.err();
        assert_eq!(err.as_deref(), Some("Invalid port number: 70000"));
    }
}
