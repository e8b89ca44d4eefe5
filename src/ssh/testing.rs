//! In-memory connector, transport and shell channels for tests.
//!
//! The mock shell echoes `echo <text>` command lines back as `<text>\r\n`,
//! which is enough to drive full create → attach → type → read scenarios
//! without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use super::transport::{
    ChannelEvent, ChannelInput, ChannelOutput, Connector, PtyRequest, ShellChannel, Transport,
};
use super::types::{Credentials, TerminalSize};

/// Valid password credentials.
pub(crate) fn credentials() -> Credentials {
    Credentials {
        hostname: "example.com".to_string(),
        port: 22,
        username: "root".to_string(),
        password: Some("hunter2".to_string()),
        ..Default::default()
    }
}

/// Poll `condition` until it holds, panicking after a few seconds.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition was not met in time");
}

/// How [`MockConnector::connect`] behaves.
#[derive(Clone)]
pub(crate) enum ConnectBehavior {
    Succeed,
    Fail(&'static str),
    /// Never completes; dropping the attempt is counted as a release
    Hang,
    /// Waits for a permit, then fails with "Connection refused"
    Gate(Arc<Semaphore>),
}

struct ShellHandle {
    output: mpsc::UnboundedSender<ChannelEvent>,
    hangup: CancellationToken,
}

/// Shared record of everything the mocks were asked to do.
#[derive(Default)]
pub(crate) struct Probe {
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    released: AtomicUsize,
    disconnects: AtomicUsize,
    channel_closes: AtomicUsize,
    pty_requests: Mutex<Vec<PtyRequest>>,
    writes: Mutex<Vec<Vec<u8>>>,
    resizes: Mutex<Vec<TerminalSize>>,
    shells: Mutex<Vec<ShellHandle>>,
}

impl Probe {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn channel_closes(&self) -> usize {
        self.channel_closes.load(Ordering::SeqCst)
    }

    pub(crate) fn pty_requests(&self) -> Vec<PtyRequest> {
        self.pty_requests.lock().unwrap().clone()
    }

    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn resizes(&self) -> Vec<TerminalSize> {
        self.resizes.lock().unwrap().clone()
    }

    /// Push output from the remote side of the most recent shell.
    pub(crate) fn emit(&self, event: ChannelEvent) {
        if let Some(shell) = self.shells.lock().unwrap().last() {
            let _ = shell.output.send(event);
        }
    }

    /// Close every shell from the remote side.
    pub(crate) fn hang_up(&self) {
        for shell in self.shells.lock().unwrap().iter() {
            shell.hangup.cancel();
        }
    }
}

/// Decrements the in-flight gauge when an attempt finishes or is dropped.
struct InFlight(Arc<Probe>);

impl InFlight {
    fn enter(probe: Arc<Probe>) -> Self {
        probe.attempts.fetch_add(1, Ordering::SeqCst);
        let now = probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(probe)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Counts a half-open connection being released.
struct PartialConnection(Arc<Probe>);

impl Drop for PartialConnection {
    fn drop(&mut self) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockConnector {
    behavior: ConnectBehavior,
    fail_shell: bool,
    pub(crate) probe: Arc<Probe>,
}

impl MockConnector {
    pub(crate) fn new(behavior: ConnectBehavior) -> Self {
        Self {
            behavior,
            fail_shell: false,
            probe: Arc::new(Probe::default()),
        }
    }

    /// Transports from this connector reject every shell request.
    pub(crate) fn failing_shell(mut self) -> Self {
        self.fail_shell = true;
        self
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _credentials: &Credentials) -> Result<Arc<dyn Transport>, String> {
        let _in_flight = InFlight::enter(self.probe.clone());

        match &self.behavior {
            ConnectBehavior::Succeed => Ok(Arc::new(MockTransport {
                probe: self.probe.clone(),
                fail_shell: self.fail_shell,
            })),
            ConnectBehavior::Fail(message) => Err(message.to_string()),
            ConnectBehavior::Hang => {
                let _partial = PartialConnection(self.probe.clone());
                std::future::pending::<()>().await;
                Err("unreachable".to_string())
            }
            ConnectBehavior::Gate(gate) => {
                let _permit = gate.acquire().await.map_err(|e| e.to_string())?;
                Err("Failed to connect: Connection refused".to_string())
            }
        }
    }
}

struct MockTransport {
    probe: Arc<Probe>,
    fail_shell: bool,
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_shell(&self, pty: &PtyRequest) -> Result<ShellChannel, String> {
        self.probe.pty_requests.lock().unwrap().push(pty.clone());
        if self.fail_shell {
            return Err("Shell request rejected by server".to_string());
        }

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let hangup = CancellationToken::new();
        self.probe.shells.lock().unwrap().push(ShellHandle {
            output: output_tx.clone(),
            hangup: hangup.clone(),
        });

        Ok(ShellChannel {
            input: Arc::new(MockInput {
                probe: self.probe.clone(),
                output: output_tx,
                hangup: hangup.clone(),
                line: Mutex::new(Vec::new()),
            }),
            output: Box::new(MockOutput {
                output: output_rx,
                hangup,
            }),
        })
    }

    async fn disconnect(&self) {
        self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
        self.probe.hang_up();
    }
}

struct MockInput {
    probe: Arc<Probe>,
    output: mpsc::UnboundedSender<ChannelEvent>,
    hangup: CancellationToken,
    line: Mutex<Vec<u8>>,
}

impl MockInput {
    /// Reply to complete `echo` lines the way a shell would.
    fn echo_lines(&self, data: &[u8]) {
        let mut line = self.line.lock().unwrap();
        for &byte in data {
            if byte != b'\n' && byte != b'\r' {
                line.push(byte);
                continue;
            }
            let command = String::from_utf8_lossy(&line).to_string();
            line.clear();
            if let Some(text) = command.strip_prefix("echo ") {
                let _ = self
                    .output
                    .send(ChannelEvent::Stdout(format!("{}\r\n", text).into_bytes()));
            }
        }
    }
}

#[async_trait]
impl ChannelInput for MockInput {
    async fn write(&self, data: &[u8]) -> Result<(), String> {
        if self.hangup.is_cancelled() {
            return Err("channel closed".to_string());
        }
        self.probe.writes.lock().unwrap().push(data.to_vec());
        self.echo_lines(data);
        Ok(())
    }

    async fn resize(&self, size: TerminalSize) -> Result<(), String> {
        if self.hangup.is_cancelled() {
            return Err("channel closed".to_string());
        }
        self.probe.resizes.lock().unwrap().push(size);
        Ok(())
    }

    async fn close(&self) {
        self.probe.channel_closes.fetch_add(1, Ordering::SeqCst);
        self.hangup.cancel();
    }
}

struct MockOutput {
    output: mpsc::UnboundedReceiver<ChannelEvent>,
    hangup: CancellationToken,
}

#[async_trait]
impl ChannelOutput for MockOutput {
    async fn recv(&mut self) -> Option<ChannelEvent> {
        tokio::select! {
            biased;
            Some(event) = self.output.recv() => Some(event),
            _ = self.hangup.cancelled() => None,
        }
    }
}
