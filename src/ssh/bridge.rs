//! Bidirectional bridge between a terminal client and a shell channel.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Starting -> Active -> Closing -> Closed
//!             \_________________________/
//!                 (rejection or open failure)
//! ```
//!
//! A bridge claims its session, opens the shell, announces `connected` and
//! then runs two pumps that share a [`CancellationToken`]:
//!
//! - **Output pump** (spawned task): shell stdout/stderr -> client binary units.
//!   Output is staged in a queue bounded by bytes; while the queue is full the
//!   pump stops reading the channel, so the SSH window throttles the remote.
//! - **Input pump** (the attach future): client units -> decoded input ->
//!   shell writes and window changes.
//!
//! Whichever side ends first cancels the other. Teardown marks the session
//! disconnected and leaves the entry for the reaper.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::protocol::{ClientFrame, ClientInput, ServerMessage, decode_client_frame};
use super::registry::SessionRegistry;
use super::shell::start_shell;
use super::transport::{ChannelEvent, ChannelInput, ChannelOutput};
use super::types::TerminalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    Idle,
    Starting,
    Active,
    Closing,
    Closed,
}

/// Attaches terminal clients to registered sessions.
#[derive(Clone)]
pub struct Bridge {
    registry: Arc<SessionRegistry>,
    shell_timeout: Duration,
    /// Bytes of shell output that may wait for a slow client
    buffer_size: usize,
}

impl Bridge {
    pub fn new(
        registry: Arc<SessionRegistry>,
        shell_timeout: Duration,
        buffer_size: usize,
    ) -> Self {
        Self {
            registry,
            shell_timeout,
            buffer_size: buffer_size.clamp(1, u32::MAX as usize),
        }
    }

    /// Run a client against a session until either side closes.
    ///
    /// Rejections (`SessionNotFound`, `SessionExpired`, `SessionInUse`,
    /// `ShellStartFailed`) are announced to the client with a single `error`
    /// unit before it is closed, and returned. A bridge that reached the
    /// active state returns `Ok(())` however it ended.
    pub async fn attach<Tx, Rx, E>(
        &self,
        session_id: &str,
        mut client_tx: Tx,
        client_rx: Rx,
        initial_size: Option<TerminalSize>,
    ) -> Result<(), SessionError>
    where
        Tx: Sink<ClientFrame> + Send + Unpin + 'static,
        Tx::Error: Display + Send,
        Rx: Stream<Item = Result<ClientFrame, E>> + Send + Unpin,
        E: Display + Send,
    {
        let mut state = BridgeState::Idle;
        transition(session_id, &mut state, BridgeState::Starting);

        if let Err(e) = self.registry.claim(session_id) {
            if e == SessionError::SessionExpired {
                self.registry.evict(session_id).await;
            }
            warn!("Rejected attach to session {}: {}", session_id, e);
            reject(&mut client_tx, e).await;
            transition(session_id, &mut state, BridgeState::Closed);
            return Err(e);
        }

        let shell = match start_shell(&self.registry, session_id, self.shell_timeout).await {
            Ok(shell) => shell,
            Err(e) => {
                reject(&mut client_tx, e).await;
                self.registry.evict(session_id).await;
                transition(session_id, &mut state, BridgeState::Closed);
                return Err(e);
            }
        };

        // Nothing may reach the client before this announcement
        if let Err(e) = client_tx.send(ServerMessage::Connected.to_frame()).await {
            debug!("Client for session {} left before connecting: {}", session_id, e);
            self.registry.disconnect(session_id).await;
            transition(session_id, &mut state, BridgeState::Closed);
            return Ok(());
        }
        transition(session_id, &mut state, BridgeState::Active);
        info!("Client attached to session {}", session_id);

        if let Some(size) = initial_size
            && let Err(e) = shell.input.resize(size).await
        {
            warn!("Initial resize failed for session {}: {}", session_id, e);
        }

        let cancel = CancellationToken::new();
        let forward = tokio::spawn(forward_output(
            session_id.to_string(),
            shell.output,
            client_tx,
            cancel.clone(),
            self.buffer_size,
        ));

        pump_input(session_id, shell.input.as_ref(), client_rx, &cancel).await;

        transition(session_id, &mut state, BridgeState::Closing);
        cancel.cancel();
        self.registry.disconnect(session_id).await;
        if let Err(e) = forward.await {
            warn!("Output pump for session {} panicked: {}", session_id, e);
        }

        transition(session_id, &mut state, BridgeState::Closed);
        info!("Client detached from session {}", session_id);
        Ok(())
    }
}

fn transition(session_id: &str, state: &mut BridgeState, next: BridgeState) {
    debug!("Session {} bridge {:?} -> {:?}", session_id, state, next);
    *state = next;
}

/// Send one `error` unit and close the client.
pub(crate) async fn reject<Tx>(client_tx: &mut Tx, error: SessionError)
where
    Tx: Sink<ClientFrame> + Unpin,
    Tx::Error: Display,
{
    let frame = ServerMessage::Error {
        message: error.to_string(),
    }
    .to_frame();

    if let Err(e) = client_tx.send(frame).await {
        debug!("Could not deliver error to client: {}", e);
    }
    if let Err(e) = client_tx.close().await {
        debug!("Could not close client: {}", e);
    }
}

/// Client -> shell. Returns when the client goes away, a write fails or the
/// bridge is cancelled.
async fn pump_input<Rx, E>(
    session_id: &str,
    input: &dyn ChannelInput,
    mut client_rx: Rx,
    cancel: &CancellationToken,
) where
    Rx: Stream<Item = Result<ClientFrame, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = client_rx.next() => frame,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                debug!("Client stream error on session {}: {}", session_id, e);
                break;
            }
            None => {
                debug!("Client closed session {}", session_id);
                break;
            }
        };

        match decode_client_frame(frame) {
            ClientInput::Resize(size) => {
                if let Err(e) = input.resize(size).await {
                    warn!("Resize failed for session {}: {}", session_id, e);
                }
            }
            ClientInput::Data(bytes) | ClientInput::Raw(bytes) => {
                let written = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = input.write(&bytes) => result,
                };
                if let Err(e) = written {
                    debug!("Shell input closed for session {}: {}", session_id, e);
                    break;
                }
            }
            ClientInput::Ignored(kind) => {
                debug!(
                    "Ignoring control message of type {:?} on session {}",
                    kind, session_id
                );
            }
        }
    }
}

/// Shell -> client. Closes the client when done and cancels the bridge.
async fn forward_output<Tx>(
    session_id: String,
    mut output: Box<dyn ChannelOutput>,
    mut client_tx: Tx,
    cancel: CancellationToken,
    buffer_size: usize,
) where
    Tx: Sink<ClientFrame> + Unpin,
    Tx::Error: Display,
{
    let budget = Arc::new(Semaphore::new(buffer_size));
    let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<(Vec<u8>, OwnedSemaphorePermit)>();

    let reader = async {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = output.recv() => event,
            };
            let bytes = match event {
                Some(ChannelEvent::Stdout(bytes)) | Some(ChannelEvent::Stderr(bytes)) => bytes,
                None => {
                    debug!("Shell channel closed for session {}", session_id);
                    break;
                }
            };
            if bytes.is_empty() {
                continue;
            }

            let cost = u32::try_from(bytes.len().min(buffer_size)).unwrap_or(u32::MAX);
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = budget.clone().acquire_many_owned(cost) => permit,
            };
            let Ok(permit) = permit else { break };

            if queue_tx.send((bytes, permit)).is_err() {
                break;
            }
        }
        drop(queue_tx);
    };

    let writer = async {
        while let Some((bytes, _permit)) = queue_rx.recv().await {
            let sent = tokio::select! {
                _ = cancel.cancelled() => break,
                result = client_tx.send(ClientFrame::Binary(bytes)) => result,
            };
            if let Err(e) = sent {
                debug!("Client write failed for session {}: {}", session_id, e);
                break;
            }
        }
        cancel.cancel();
    };

    tokio::join!(reader, writer);

    if let Err(e) = client_tx.close().await {
        debug!("Could not close client for session {}: {}", session_id, e);
    }
}
