//! Password authentication for terminal sessions.
//!
//! A rejected password is `Ok(false)`. An `Err` means the exchange itself
//! broke off (the server hung up, the transport failed), and its text keeps
//! the underlying cause so the connect error is classified by it rather than
//! reported as a bad password.

use std::fmt;

use async_trait::async_trait;
use russh::client;

use crate::ssh::session::SshClientHandler;

use super::traits::AuthStrategy;

/// Password authentication strategy.
pub struct PasswordAuth {
    password: String,
}

impl PasswordAuth {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuth")
            .field("password", &"<redacted>")
            .finish()
    }
}

fn exchange_error(cause: impl fmt::Display) -> String {
    format!("Password exchange interrupted: {}", cause)
}

#[async_trait]
impl AuthStrategy for PasswordAuth {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        let result = handle
            .authenticate_password(username, &self.password)
            .await
            .map_err(exchange_error)?;

        Ok(result.success())
    }

    fn name(&self) -> &'static str {
        "password"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::error::{SessionError, classify_connect_error};

    #[test]
    fn test_name() {
        assert_eq!(PasswordAuth::new("hunter2").name(), "password");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", PasswordAuth::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    mod exchange_errors {
        use super::*;

        #[test]
        fn test_dropped_connection_is_not_a_bad_password() {
            assert_eq!(
                classify_connect_error(&exchange_error("Connection reset by peer")),
                SessionError::ConnectionFailed
            );
        }

        #[test]
        fn test_stalled_exchange_is_a_timeout() {
            assert_eq!(
                classify_connect_error(&exchange_error("operation timed out")),
                SessionError::ConnectionTimeout
            );
        }

        #[test]
        fn test_server_refusal_is_still_auth_failure() {
            assert_eq!(
                classify_connect_error(&exchange_error("Permission denied")),
                SessionError::AuthFailed
            );
        }
    }
}
