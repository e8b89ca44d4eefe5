//! russh client handler.
//!
//! # Architecture
//!
//! - `SshClientHandler`: A russh client handler that accepts all host keys (similar to
//!   `StrictHostKeyChecking=no` in OpenSSH). Browser users type arbitrary hosts into
//!   the connect form, so there is no known_hosts file to check against.
//!
//! The `client::Handle<SshClientHandler>` itself is owned by
//! [`SshTransport`](super::client::SshTransport), which in turn is owned by
//! exactly one registry entry.

use russh::{client, keys};
use tracing::debug;

/// Client handler for russh that accepts all host keys.
///
/// # Security Note
///
/// Host keys are not verified, which leaves connections open to
/// man-in-the-middle attacks on untrusted networks.
pub struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!("Accepting server host key without verification");
        Ok(true)
    }
}
