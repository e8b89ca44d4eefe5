//! Transport and channel trait definitions.
//!
//! These traits are the seam between session bookkeeping and russh. The
//! registry, bridge and reaper only ever talk to these interfaces, which keeps
//! them testable with in-memory implementations.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Credentials, TerminalSize};

/// Pty parameters requested when a shell channel is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: &'static str,
    pub size: TerminalSize,
    pub echo: bool,
    /// Input and output baud rate advertised in the terminal modes
    pub baud: u32,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: "xterm-256color",
            size: TerminalSize::default(),
            echo: true,
            baud: 14_400,
        }
    }
}

/// A chunk of output produced by the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Stdout(Vec<u8>),
    /// Extended data (stderr) stream
    Stderr(Vec<u8>),
}

/// Write side of an interactive shell channel.
#[async_trait]
pub trait ChannelInput: Send + Sync {
    /// Send terminal input to the remote shell.
    async fn write(&self, data: &[u8]) -> Result<(), String>;

    /// Change the remote pty geometry. Pixel dimensions are always zero.
    async fn resize(&self, size: TerminalSize) -> Result<(), String>;

    /// Close the channel. Must tolerate being called on a closed channel.
    async fn close(&self);
}

/// Read side of an interactive shell channel.
#[async_trait]
pub trait ChannelOutput: Send {
    /// Next chunk of output, or `None` once the channel has closed.
    async fn recv(&mut self) -> Option<ChannelEvent>;
}

/// Both halves of a freshly opened shell channel.
pub struct ShellChannel {
    pub input: Arc<dyn ChannelInput>,
    pub output: Box<dyn ChannelOutput>,
}

/// An authenticated remote connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session channel, allocate a pty and start a shell on it.
    async fn open_shell(&self, pty: &PtyRequest) -> Result<ShellChannel, String>;

    /// End the connection. Must tolerate being called more than once.
    async fn disconnect(&self);
}

/// Opens and authenticates transports.
///
/// Errors are raw strings; callers classify them before anything reaches a
/// client.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Transport>, String>;
}
