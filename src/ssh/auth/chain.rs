//! Authentication chain for trying multiple strategies.

use async_trait::async_trait;
use russh::client;
use tracing::debug;

use crate::ssh::session::SshClientHandler;

use super::traits::AuthStrategy;
use super::{KeyAuth, KeyboardInteractiveAuth, PasswordAuth};

/// Authentication chain that tries multiple strategies in order.
///
/// Strategies are tried in the order they were added. The first successful
/// authentication stops the chain and returns success.
pub struct AuthChain {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl AuthChain {
    /// Create a new empty authentication chain.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Add private key authentication to the chain.
    pub fn with_key(mut self, private_key: impl Into<String>, passphrase: Option<String>) -> Self {
        self.strategies
            .push(Box::new(KeyAuth::new(private_key, passphrase)));
        self
    }

    /// Add password authentication to the chain.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.strategies.push(Box::new(PasswordAuth::new(password)));
        self
    }

    /// Add the keyboard-interactive password replay to the chain.
    pub fn with_keyboard_interactive(mut self, password: impl Into<String>) -> Self {
        self.strategies
            .push(Box::new(KeyboardInteractiveAuth::new(password)));
        self
    }

    /// Check if the chain has any authentication strategies.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Names of the strategies, in the order they will be tried.
    #[cfg(test)]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for AuthChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthStrategy for AuthChain {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        if self.strategies.is_empty() {
            return Err("No authentication strategies configured".to_string());
        }

        let mut last_error = None;

        for strategy in &self.strategies {
            debug!("Trying authentication strategy: {}", strategy.name());

            match strategy.authenticate(handle, username).await {
                Ok(true) => {
                    debug!(
                        "Authentication succeeded with strategy: {}",
                        strategy.name()
                    );
                    return Ok(true);
                }
                Ok(false) => {
                    debug!("Authentication failed with strategy: {}", strategy.name());
                    last_error = Some(format!("{} authentication rejected", strategy.name()));
                }
                Err(e) => {
                    debug!(
                        "Authentication error with strategy {}: {}",
                        strategy.name(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| "All authentication methods failed".to_string()))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}
