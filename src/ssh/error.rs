//! Error taxonomy for session creation and terminal attachment.
//!
//! Every failure that reaches a client is one of the [`SessionError`] variants.
//! The `Display` text of each variant is safe to show to an end user; the raw
//! transport error that caused it is logged server-side and never returned.
//!
//! # Classification Strategy
//!
//! Transport and authentication code reports failures as plain strings (the
//! russh error text, prefixed with the step that failed). [`classify_connect_error`]
//! maps those strings onto the stable taxonomy:
//!
//! 1. **Authentication failures**: the server rejected every credential we offered,
//!    or a key could not be decoded with the supplied passphrase.
//!
//! 2. **Connection refused**: nothing is listening on the target port.
//!
//! 3. **Connection timeout**: the TCP connect or handshake did not finish in time.
//!
//! 4. **Everything else** collapses into [`SessionError::ConnectionFailed`].
//!
//! # Priority
//!
//! Authentication patterns are checked first. An error like
//! "Connection timeout during authentication failed" is an authentication failure.

use thiserror::Error;

/// Credential validation failures, detected before any network I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Hostname must not be empty")]
    EmptyHostname,
    #[error("Username must not be empty")]
    EmptyUsername,
    #[error("Port must be between 1 and 65535")]
    InvalidPort,
    #[error("A password or private key is required")]
    NoCredentials,
}

/// User-facing error taxonomy for session creation and attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Authentication failed, check the username and credentials")]
    AuthFailed,
    #[error("Connection refused, check the host address and port")]
    ConnectionRefused,
    #[error("Connection timed out, check the network or host address")]
    ConnectionTimeout,
    #[error("Connection failed, check the address and credentials")]
    ConnectionFailed,
    #[error("The server has reached its connection limit, try again later")]
    Capacity,
    #[error("Missing session_id")]
    MissingSessionId,
    #[error("Session does not exist or has expired")]
    SessionNotFound,
    #[error("Session has expired, please reconnect")]
    SessionExpired,
    #[error("Session is already in use")]
    SessionInUse,
    #[error("Failed to start the terminal")]
    ShellStartFailed,
}

/// Authentication error patterns.
const AUTH_ERRORS: &[&str] = &[
    "authentication failed",
    "authentication rejected",
    "authentication methods failed",
    "permission denied",
    "publickey",
    "auth fail",
    "no authentication",
    "unable to decode private key",
];

/// Patterns for a port with nothing listening.
const REFUSED_ERRORS: &[&str] = &["connection refused", "econnrefused"];

/// Patterns for connect/handshake deadlines.
const TIMEOUT_ERRORS: &[&str] = &["timed out", "timeout", "etimedout"];

/// Classify a raw connection or authentication error into the user-facing taxonomy.
///
/// Matching is case-insensitive. Authentication patterns win over network
/// patterns; anything unrecognised becomes [`SessionError::ConnectionFailed`].
///
/// # Examples
///
/// ```rust,ignore
/// assert_eq!(classify_connect_error("Permission denied"), SessionError::AuthFailed);
/// assert_eq!(
///     classify_connect_error("Failed to connect: Connection refused (os error 111)"),
///     SessionError::ConnectionRefused
/// );
/// ```
pub(crate) fn classify_connect_error(error: &str) -> SessionError {
    let error_lower = error.to_lowercase();

    if AUTH_ERRORS.iter().any(|p| error_lower.contains(p)) {
        return SessionError::AuthFailed;
    }

    if REFUSED_ERRORS.iter().any(|p| error_lower.contains(p)) {
        return SessionError::ConnectionRefused;
    }

    if TIMEOUT_ERRORS.iter().any(|p| error_lower.contains(p)) {
        return SessionError::ConnectionTimeout;
    }

    SessionError::ConnectionFailed
}
