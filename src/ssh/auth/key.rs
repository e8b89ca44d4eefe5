//! Private key SSH authentication.

use std::sync::Arc;

use async_trait::async_trait;
use russh::{client, keys};
use tracing::debug;

use crate::ssh::session::SshClientHandler;

use super::traits::AuthStrategy;

/// Private key authentication strategy.
///
/// The key arrives as text in the connect request (OpenSSH or PEM encoding)
/// and is decoded in memory; nothing is written to disk.
pub struct KeyAuth {
    private_key: String,
    passphrase: Option<String>,
}

impl KeyAuth {
    /// Create a new key authentication strategy.
    ///
    /// # Arguments
    ///
    /// * `private_key` - Encoded private key text
    /// * `passphrase` - Passphrase for encrypted keys
    pub fn new(private_key: impl Into<String>, passphrase: Option<String>) -> Self {
        Self {
            private_key: private_key.into(),
            passphrase,
        }
    }
}

#[async_trait]
impl AuthStrategy for KeyAuth {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        let key_pair = keys::decode_secret_key(&self.private_key, self.passphrase.as_deref())
            .map_err(|e| {
                format!(
                    "Key authentication failed: unable to decode private key: {}",
                    e
                )
            })?;

        // For RSA keys, use the best supported hash algorithm
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        debug!("Using RSA hash algorithm for key auth: {:?}", hash_alg);

        let key_with_hash = keys::PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg);

        let result = handle
            .authenticate_publickey(username, key_with_hash)
            .await
            .map_err(|e| format!("Key authentication failed: {}", e))?;

        Ok(result.success())
    }

    fn name(&self) -> &'static str {
        "key"
    }
}
