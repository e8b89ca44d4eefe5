//! Interactive shell channels.
//!
//! This module provides the russh-backed halves of a shell channel and the
//! shell opener used by the bridge.
//!
//! # Architecture
//!
//! - `SshChannelInput`: wraps `russh::ChannelWriteHalf` so input and resizes can
//!   be sent while another task is blocked reading the channel.
//! - `SshChannelOutput`: wraps `russh::ChannelReadHalf` and yields stdout and
//!   stderr chunks until the remote closes.
//! - [`start_shell`]: opens one pty/shell channel for a registered session and
//!   attaches its input half to the registry entry.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::{ChannelMsg, ChannelReadHalf, ChannelWriteHalf, Pty, client};
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::registry::SessionRegistry;
use super::transport::{ChannelEvent, ChannelInput, ChannelOutput, PtyRequest, ShellChannel};
use super::types::TerminalSize;

/// Write handle for sending input to a shell channel.
pub struct SshChannelInput {
    write_half: ChannelWriteHalf<client::Msg>,
}

impl SshChannelInput {
    pub fn new(write_half: ChannelWriteHalf<client::Msg>) -> Self {
        Self { write_half }
    }
}

#[async_trait]
impl ChannelInput for SshChannelInput {
    async fn write(&self, data: &[u8]) -> Result<(), String> {
        self.write_half
            .data(data)
            .await
            .map_err(|e| format!("Failed to write to shell: {}", e))
    }

    async fn resize(&self, size: TerminalSize) -> Result<(), String> {
        self.write_half
            .window_change(size.cols, size.rows, 0, 0)
            .await
            .map_err(|e| format!("Failed to resize shell: {}", e))
    }

    async fn close(&self) {
        if let Err(e) = self.write_half.close().await {
            debug!("Shell channel already closed: {}", e);
        }
    }
}

/// Read handle yielding shell output.
pub struct SshChannelOutput {
    read_half: ChannelReadHalf,
    /// Output that arrived while the shell request was still pending
    pending: VecDeque<ChannelEvent>,
}

impl SshChannelOutput {
    pub fn new(read_half: ChannelReadHalf, pending: VecDeque<ChannelEvent>) -> Self {
        Self { read_half, pending }
    }
}

#[async_trait]
impl ChannelOutput for SshChannelOutput {
    async fn recv(&mut self) -> Option<ChannelEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        loop {
            match self.read_half.wait().await? {
                ChannelMsg::Data { data } => return Some(ChannelEvent::Stdout(data.to_vec())),
                ChannelMsg::ExtendedData { data, .. } => {
                    return Some(ChannelEvent::Stderr(data.to_vec()));
                }
                ChannelMsg::Eof | ChannelMsg::Close => return None,
                ChannelMsg::ExitStatus { exit_status } => {
                    debug!("Remote shell exited with status {}", exit_status);
                }
                _ => {}
            }
        }
    }
}

/// Terminal modes sent with the pty request.
pub(crate) fn terminal_modes(pty: &PtyRequest) -> [(Pty, u32); 3] {
    [
        (Pty::ECHO, u32::from(pty.echo)),
        (Pty::TTY_OP_ISPEED, pty.baud),
        (Pty::TTY_OP_OSPEED, pty.baud),
    ]
}

/// Request a pty and a shell on an open session channel and split it.
///
/// Waits for the server to confirm the shell request. Output that arrives
/// before the confirmation is kept and delivered first.
pub(crate) async fn request_shell(
    mut channel: russh::Channel<client::Msg>,
    pty: &PtyRequest,
) -> Result<ShellChannel, String> {
    channel
        .request_pty(
            false,
            pty.term,
            pty.size.cols,
            pty.size.rows,
            0,
            0,
            &terminal_modes(pty),
        )
        .await
        .map_err(|e| format!("Failed to request pty: {}", e))?;

    channel
        .request_shell(true)
        .await
        .map_err(|e| format!("Failed to request shell: {}", e))?;

    let mut pending = VecDeque::new();
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => break,
            Some(ChannelMsg::Failure) => return Err("Shell request rejected by server".to_string()),
            Some(ChannelMsg::Data { data }) => pending.push_back(ChannelEvent::Stdout(data.to_vec())),
            Some(ChannelMsg::ExtendedData { data, .. }) => {
                pending.push_back(ChannelEvent::Stderr(data.to_vec()));
            }
            Some(ChannelMsg::Close) | None => {
                return Err("Channel closed before the shell started".to_string());
            }
            Some(_) => {}
        }
    }

    let (read_half, write_half) = channel.split();
    Ok(ShellChannel {
        input: Arc::new(SshChannelInput::new(write_half)),
        output: Box::new(SshChannelOutput::new(read_half, pending)),
    })
}

/// Open the interactive shell for a session and attach it.
///
/// Fails with `SessionNotFound` for an unknown id and `ShellStartFailed` when
/// the channel cannot be negotiated within `timeout`. On success the input
/// half is stored in the registry entry, so teardown can close it, and both
/// halves are returned to the caller, which becomes the only reader.
pub(crate) async fn start_shell(
    registry: &SessionRegistry,
    session_id: &str,
    timeout: Duration,
) -> Result<ShellChannel, SessionError> {
    let transport = registry
        .transport(session_id)
        .ok_or(SessionError::SessionNotFound)?;

    let pty = PtyRequest::default();
    let shell = match tokio::time::timeout(timeout, transport.open_shell(&pty)).await {
        Ok(Ok(shell)) => shell,
        Ok(Err(e)) => {
            warn!("Failed to start shell for session {}: {}", session_id, e);
            return Err(SessionError::ShellStartFailed);
        }
        Err(_) => {
            warn!(
                "Shell for session {} did not start within {:?}",
                session_id, timeout
            );
            return Err(SessionError::ShellStartFailed);
        }
    };

    if let Err(e) = registry.attach_channel(session_id, shell.input.clone()) {
        shell.input.close().await;
        return Err(e);
    }

    info!(
        "Shell started for session {} ({}x{})",
        session_id, pty.size.cols, pty.size.rows
    );
    Ok(shell)
}
