//! Configuration resolution for the terminal gateway.
//!
//! Every value is resolved with a two-tier priority system:
//!
//! 1. **Environment Variable** - Value from environment variable (a `.env` file is
//!    loaded by the binary before resolution)
//! 2. **Default** - Built-in default value
//!
//! Unparseable environment values fall back to the default.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QKSSH_ADDRESS` | 0.0.0.0 | Listen address |
//! | `QKSSH_PORT` | 3131 | Listen port |
//! | `QKSSH_TIMEOUT` | 10s | SSH connect and shell-open timeout in seconds |
//! | `QKSSH_MAXCONN` | 100 | Maximum concurrent sessions |
//! | `QKSSH_BUFFER` | 32768 | Bytes of shell output buffered per client |
//! | `QKSSH_DEBUG` | false | Enable debug logging |
//! | `QKSSH_SESSION_TIMEOUT` | 30s | Idle time before an unclaimed session is reaped |
//! | `QKSSH_CLEANUP_INTERVAL` | 30s | Reaper sweep period |

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default listen address
pub(crate) const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub(crate) const DEFAULT_PORT: u16 = 3131;

/// Default SSH connection timeout in seconds
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default maximum concurrent sessions
pub(crate) const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Default per-client output buffer in bytes
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Default idle threshold for sessions that were never attached, in seconds
pub(crate) const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30;

/// Default reaper period in seconds
pub(crate) const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 30;

/// SSH keepalive probe interval
pub(crate) const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Consecutive unanswered keepalives before the transport is declared dead
pub(crate) const KEEPALIVE_MAX: usize = 3;

pub(crate) const ADDRESS_ENV_VAR: &str = "QKSSH_ADDRESS";
pub(crate) const PORT_ENV_VAR: &str = "QKSSH_PORT";
pub(crate) const CONNECT_TIMEOUT_ENV_VAR: &str = "QKSSH_TIMEOUT";
pub(crate) const MAX_CONNECTIONS_ENV_VAR: &str = "QKSSH_MAXCONN";
pub(crate) const BUFFER_SIZE_ENV_VAR: &str = "QKSSH_BUFFER";
pub(crate) const DEBUG_ENV_VAR: &str = "QKSSH_DEBUG";
pub(crate) const SESSION_TIMEOUT_ENV_VAR: &str = "QKSSH_SESSION_TIMEOUT";
pub(crate) const CLEANUP_INTERVAL_ENV_VAR: &str = "QKSSH_CLEANUP_INTERVAL";

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub address: String,
    pub port: u16,
    /// Bound on SSH connect + authentication, and on shell channel negotiation
    pub connect_timeout: Duration,
    pub max_connections: usize,
    /// Shell output held for a slow client before the channel is throttled
    pub buffer_size: usize,
    pub debug: bool,
    /// How long an authenticated session may wait to be attached
    pub session_timeout: Duration,
    pub cleanup_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            debug: false,
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl Config {
    /// Resolve every setting from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            address: resolve_address(),
            port: resolve_env(PORT_ENV_VAR, DEFAULT_PORT),
            connect_timeout: Duration::from_secs(resolve_env(
                CONNECT_TIMEOUT_ENV_VAR,
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            max_connections: resolve_env(MAX_CONNECTIONS_ENV_VAR, DEFAULT_MAX_CONNECTIONS),
            buffer_size: resolve_env(BUFFER_SIZE_ENV_VAR, DEFAULT_BUFFER_SIZE).max(1),
            debug: resolve_flag(DEBUG_ENV_VAR),
            session_timeout: Duration::from_secs(resolve_env(
                SESSION_TIMEOUT_ENV_VAR,
                DEFAULT_SESSION_TIMEOUT_SECS,
            )),
            cleanup_interval: Duration::from_secs(
                resolve_env(CLEANUP_INTERVAL_ENV_VAR, DEFAULT_CLEANUP_INTERVAL_SECS).max(1),
            ),
        }
    }
}

/// Resolve the listen address: env var if non-empty, otherwise the default.
pub(crate) fn resolve_address() -> String {
    match env::var(ADDRESS_ENV_VAR) {
        Ok(address) if !address.trim().is_empty() => address.trim().to_string(),
        _ => DEFAULT_ADDRESS.to_string(),
    }
}

/// Resolve a numeric value with priority: env var -> default
pub(crate) fn resolve_env<T: FromStr>(var: &str, default: T) -> T {
    if let Ok(raw) = env::var(var)
        && let Ok(value) = raw.trim().parse::<T>()
    {
        return value;
    }

    default
}

/// Resolve a boolean flag; only `true` (any case) or `1` enable it.
pub(crate) fn resolve_flag(var: &str) -> bool {
    env::var(var)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}
