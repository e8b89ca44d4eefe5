//! Keyboard-interactive compatibility shim.
//!
//! Some servers disable plain `password` authentication and only offer
//! `keyboard-interactive`, where the server sends one or more prompts (usually
//! a single "Password:"). This strategy answers every prompt of every round
//! with the configured password. It is canned-response replay with a hard cap
//! on rounds, not a general interactive flow: there is no way to surface a
//! prompt to the browser user.

use async_trait::async_trait;
use russh::client::{self, KeyboardInteractiveAuthResponse};
use tracing::debug;

use crate::ssh::session::SshClientHandler;

use super::traits::AuthStrategy;

/// Maximum number of prompt rounds answered before giving up.
pub const MAX_PROMPT_ROUNDS: usize = 3;

/// Keyboard-interactive authentication that replays a password.
pub struct KeyboardInteractiveAuth {
    password: String,
}

impl KeyboardInteractiveAuth {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    fn answers(&self, prompts: usize) -> Vec<String> {
        vec![self.password.clone(); prompts]
    }
}

#[async_trait]
impl AuthStrategy for KeyboardInteractiveAuth {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        let mut response = handle
            .authenticate_keyboard_interactive_start(username, None::<String>)
            .await
            .map_err(|e| format!("Keyboard-interactive authentication failed: {}", e))?;

        for round in 0..MAX_PROMPT_ROUNDS {
            match response {
                KeyboardInteractiveAuthResponse::Success => return Ok(true),
                KeyboardInteractiveAuthResponse::Failure { .. } => return Ok(false),
                KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                    debug!(
                        "Answering {} keyboard-interactive prompt(s), round {}",
                        prompts.len(),
                        round + 1
                    );
                    response = handle
                        .authenticate_keyboard_interactive_respond(self.answers(prompts.len()))
                        .await
                        .map_err(|e| {
                            format!("Keyboard-interactive authentication failed: {}", e)
                        })?;
                }
            }
        }

        Ok(matches!(response, KeyboardInteractiveAuthResponse::Success))
    }

    fn name(&self) -> &'static str {
        "keyboard-interactive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_interactive_name() {
        let auth = KeyboardInteractiveAuth::new("secret");
        assert_eq!(auth.name(), "keyboard-interactive");
    }

    #[test]
    fn test_every_prompt_gets_the_password() {
        let auth = KeyboardInteractiveAuth::new("secret");
        assert_eq!(auth.answers(2), vec!["secret", "secret"]);
        assert!(auth.answers(0).is_empty());
    }

    #[test]
    fn test_round_cap_is_small() {
        assert!(MAX_PROMPT_ROUNDS >= 1);
        assert!(MAX_PROMPT_ROUNDS <= 5);
    }
}
