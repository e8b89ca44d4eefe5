//! SSH session management for browser terminals.
//!
//! # Module Structure
//!
//! - [`registry`]: Concurrent session map with capacity accounting
//! - [`establish`]: Validated, deadline-bounded connection setup
//! - [`shell`]: Pty/shell channel opening
//! - [`bridge`]: Client <-> shell byte pumps and teardown
//! - [`reaper`]: Periodic eviction of idle and torn-down sessions
//! - [`manager`]: Facade used by the web layer
//! - [`client`], [`auth`], [`session`]: russh connector and authentication
//! - [`protocol`]: Terminal wire format

pub mod auth;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod establish;
pub mod manager;
pub mod protocol;
pub mod reaper;
pub mod registry;
pub mod session;
pub mod shell;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::SshConnector;
pub use config::Config;
pub use error::{SessionError, ValidationError};
pub use manager::SessionManager;
pub use protocol::{ClientFrame, ServerMessage};
pub use types::{Credentials, SessionId, TerminalSize};
