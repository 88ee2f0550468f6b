//! Connection lifecycle manager.
//!
//! [`SerialLink`] is the session object that owns everything a live
//! link needs: the transport halves, the ingestion queue, the frame
//! decoder, the throughput meter and the phase machine. It runs as an
//! actor — [`SerialLink::run`] is spawned on the runtime and serves
//! the command surface (`connect` / `disconnect` / `send`) exposed by
//! the cloneable [`LinkHandle`], while the read pump runs as its own
//! task and the decode tick fires inside the actor loop.
//!
//! Decoded frames, link status text, the connected flag and the byte
//! rate are published over `tokio::sync::watch` channels; consumers
//! pick their own consumption policy.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decoder::{Frame, FrameDecoder};
use crate::error::LinkError;
use crate::state::LinkPhase;
use crate::throughput::{ByteCounter, ThroughputMeter};
use crate::transport::{LineConfig, PortOpener, SerialReader, SerialWriter};
use crate::wire::FrameFormat;

// ── LinkConfig ───────────────────────────────────────────────────

/// Configuration for a [`SerialLink`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Serial line parameters.
    pub line: LineConfig,
    /// Geometry/packing of the frames the device sends.
    pub format: FrameFormat,
    /// Wall-clock window after open during which every received byte
    /// is discarded as device boot noise.
    pub boot_purge: Duration,
    /// Per-attempt read timeout inside the purge window.
    pub purge_read_timeout: Duration,
    /// Period of the decode tick that drains the ingestion queue.
    pub decode_interval: Duration,
    /// Period of the bytes-per-window throughput publish.
    pub throughput_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            format: FrameFormat::default(),
            boot_purge: Duration::from_secs(1),
            purge_read_timeout: Duration::from_millis(50),
            decode_interval: Duration::from_millis(20),
            throughput_interval: Duration::from_secs(1),
        }
    }
}

// ── LinkStatus ───────────────────────────────────────────────────

/// Human-readable link status, published on every notable transition.
///
/// This is a message stream for a status line, not an authoritative
/// connection flag — a send failure is reported here while the link
/// stays up. Use [`LinkHandle::connected`] for the flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// No session and none requested yet.
    Idle,
    /// Acquiring and opening the serial device.
    Opening,
    /// Discarding device boot noise.
    Purging,
    /// Link is up; frames are flowing.
    Connected,
    /// Closed on explicit request.
    Disconnected,
    /// The session died while we intended to stay connected.
    ConnectionLost(String),
    /// A connect attempt failed before going live.
    OpenFailed(String),
    /// An outbound send was rejected or failed.
    SendFailed(String),
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "not connected"),
            Self::Opening => write!(f, "opening serial port"),
            Self::Purging => write!(f, "purging device boot noise"),
            Self::Connected => write!(f, "serial link up"),
            Self::Disconnected => write!(f, "serial link closed"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
            Self::OpenFailed(reason) => write!(f, "connect failed: {reason}"),
            Self::SendFailed(reason) => write!(f, "send failed: {reason}"),
        }
    }
}

// ── Command surface ──────────────────────────────────────────────

enum Command {
    Connect { reply: oneshot::Sender<Result<(), LinkError>> },
    Disconnect { reply: oneshot::Sender<()> },
    Send { data: Bytes, reply: oneshot::Sender<bool> },
}

/// Why the read pump stopped.
#[derive(Debug)]
enum PumpExit {
    /// The device closed the stream.
    Eof,
    /// A read failed.
    Error(std::io::Error),
    /// Teardown cancelled the pending read.
    Cancelled,
}

// ── LinkHandle ───────────────────────────────────────────────────

/// Cloneable handle to a running [`SerialLink`].
#[derive(Clone)]
pub struct LinkHandle {
    cmd_tx: mpsc::Sender<Command>,
    frame_rx: watch::Receiver<Option<Frame>>,
    status_rx: watch::Receiver<LinkStatus>,
    connected_rx: watch::Receiver<bool>,
    rate_rx: watch::Receiver<u64>,
}

impl LinkHandle {
    /// Open the device, purge boot noise and go live.
    ///
    /// A still-active prior session is torn down first.
    pub async fn connect(&self) -> Result<(), LinkError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Connect { reply: tx }).await?;
        rx.await.map_err(|_| LinkError::ChannelClosed)?
    }

    /// Tear the session down. Idempotent — safe to call when already
    /// disconnected.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Disconnect { reply: tx }).await?;
        rx.await.map_err(|_| LinkError::ChannelClosed)
    }

    /// Write `data` to the device. Returns `false` without touching
    /// the transport when disconnected or when `data` is empty.
    pub async fn send(&self, data: Bytes) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Send { data, reply: tx }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Latest decoded frame (store-latest semantics).
    pub fn frames(&self) -> watch::Receiver<Option<Frame>> {
        self.frame_rx.clone()
    }

    /// Human-readable status messages.
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.status_rx.clone()
    }

    /// Connected flag.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Bytes received in the most recent throughput window.
    pub fn throughput(&self) -> watch::Receiver<u64> {
        self.rate_rx.clone()
    }

    /// Snapshot of the connected flag.
    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }
}

// ── SerialLink ───────────────────────────────────────────────────

/// Resources of one live session.
struct Session {
    cancel: CancellationToken,
    writer: Option<Box<dyn SerialWriter>>,
    pump: Option<JoinHandle<()>>,
}

/// The link actor. Construct with [`SerialLink::new`], then spawn
/// [`run`](Self::run) on the runtime and drive it through the handle.
pub struct SerialLink {
    config: LinkConfig,
    opener: Box<dyn PortOpener>,
    phase: LinkPhase,
    /// Raw bytes between the read pump and the decode tick, drained in
    /// strict arrival order. Unbounded: the decode tick shares the
    /// actor loop with the queue's only consumer, so sustained growth
    /// means the whole actor has stalled.
    queue: Arc<Mutex<VecDeque<u8>>>,
    decoder: FrameDecoder,
    meter: ThroughputMeter,
    session: Option<Session>,
    cmd_rx: mpsc::Receiver<Command>,
    pump_tx: mpsc::Sender<PumpExit>,
    pump_rx: mpsc::Receiver<PumpExit>,
    frame_tx: watch::Sender<Option<Frame>>,
    status_tx: watch::Sender<LinkStatus>,
    connected_tx: watch::Sender<bool>,
    rate_tx: watch::Sender<u64>,
}

impl SerialLink {
    /// Create a link actor and its command handle.
    pub fn new(config: LinkConfig, opener: Box<dyn PortOpener>) -> (Self, LinkHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (pump_tx, pump_rx) = mpsc::channel(8);
        let (frame_tx, frame_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(LinkStatus::Idle);
        let (connected_tx, connected_rx) = watch::channel(false);
        let (rate_tx, rate_rx) = watch::channel(0);

        let decoder = FrameDecoder::new(config.format);
        let link = Self {
            config,
            opener,
            phase: LinkPhase::default(),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            decoder,
            meter: ThroughputMeter::new(),
            session: None,
            cmd_rx,
            pump_tx,
            pump_rx,
            frame_tx,
            status_tx,
            connected_tx,
            rate_tx,
        };
        let handle = LinkHandle { cmd_tx, frame_rx, status_rx, connected_rx, rate_rx };
        (link, handle)
    }

    /// Serve commands, pump exits and the periodic ticks until every
    /// handle is dropped.
    pub async fn run(mut self) {
        let mut decode_tick = tokio::time::interval(self.config.decode_interval);
        decode_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut rate_tick = tokio::time::interval(self.config.throughput_interval);
        rate_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        debug!("all link handles dropped; shutting down");
                        self.teardown().await;
                        break;
                    }
                },
                Some(exit) = self.pump_rx.recv() => self.handle_pump_exit(exit).await,
                _ = decode_tick.tick() => self.decode_pending(),
                _ = rate_tick.tick() => self.publish_rate(),
            }
        }
    }

    // ── Command handling ─────────────────────────────────────────

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { reply } => {
                let _ = reply.send(self.handle_connect().await);
            }
            Command::Disconnect { reply } => {
                self.handle_disconnect().await;
                let _ = reply.send(());
            }
            Command::Send { data, reply } => {
                let _ = reply.send(self.handle_send(&data).await);
            }
        }
    }

    async fn handle_connect(&mut self) -> Result<(), LinkError> {
        if self.session.is_some() {
            debug!("connect requested with an active session; disconnecting first");
            self.teardown().await;
        }

        // A misaligned width would produce frames shorter than
        // width * height, breaking the Frame length invariant.
        let format = self.config.format;
        if !format.is_row_aligned() {
            let e = LinkError::Format(format!(
                "width {} is not a whole number of {}-sample bytes",
                format.width,
                format.colors_per_byte()
            ));
            warn!("{e}");
            self.set_status(LinkStatus::OpenFailed(e.to_string()));
            return Err(e);
        }

        self.phase.begin_open()?;
        self.set_status(LinkStatus::Opening);

        let port = match self.opener.open(&self.config.line).await {
            Ok(port) => port,
            Err(e) => {
                warn!("open failed: {e}");
                self.phase.force_disconnect();
                self.set_status(LinkStatus::OpenFailed(e.to_string()));
                return Err(e);
            }
        };
        let (mut reader, mut writer) = port.split();

        self.phase.begin_purge()?;
        self.set_status(LinkStatus::Purging);
        match purge_boot_noise(
            reader.as_mut(),
            self.config.boot_purge,
            self.config.purge_read_timeout,
        )
        .await
        {
            Ok(discarded) => debug!(discarded, "boot purge complete"),
            Err(e) => {
                // Fatal for this attempt: release in order, each
                // failure logged, none blocking the next step.
                warn!("boot purge aborted: {e}");
                if let Err(close_err) = writer.close().await {
                    warn!("error closing writer after failed connect: {close_err}");
                }
                drop(reader);
                self.phase.force_disconnect();
                self.set_status(LinkStatus::OpenFailed(e.to_string()));
                return Err(e);
            }
        }

        // Fresh session state before going live.
        self.queue.lock().unwrap().clear();
        self.decoder.reset();
        self.meter.reset();
        self.rate_tx.send_replace(0);

        self.phase.complete_purge()?;
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(run_pump(
            reader,
            Arc::clone(&self.queue),
            self.meter.counter(),
            cancel.clone(),
            self.pump_tx.clone(),
        ));
        self.session = Some(Session {
            cancel,
            writer: Some(writer),
            pump: Some(pump),
        });
        self.connected_tx.send_replace(true);
        self.set_status(LinkStatus::Connected);
        info!(baud = self.config.line.baud_rate, "serial link connected");
        Ok(())
    }

    async fn handle_disconnect(&mut self) {
        self.teardown().await;
        self.set_status(LinkStatus::Disconnected);
        info!("serial link closed");
    }

    async fn handle_send(&mut self, data: &[u8]) -> bool {
        if !self.phase.is_connected() {
            self.set_status(LinkStatus::SendFailed("not connected".into()));
            return false;
        }
        if data.is_empty() {
            self.set_status(LinkStatus::SendFailed("data to send is empty".into()));
            return false;
        }
        let Some(writer) = self.session.as_mut().and_then(|s| s.writer.as_mut()) else {
            self.set_status(LinkStatus::SendFailed("write handle unavailable".into()));
            return false;
        };
        match writer.write_all(data).await {
            Ok(()) => true,
            Err(e) => {
                // A failed write reports but does not drop the link.
                warn!("send failed: {e}");
                self.set_status(LinkStatus::SendFailed(e.to_string()));
                false
            }
        }
    }

    // ── Pump exits ───────────────────────────────────────────────

    async fn handle_pump_exit(&mut self, exit: PumpExit) {
        if self.session.is_none() {
            // Exit notice from a session already torn down.
            return;
        }
        match exit {
            PumpExit::Cancelled => {}
            PumpExit::Eof => {
                warn!("device closed the stream while connected");
                self.teardown().await;
                self.set_status(LinkStatus::ConnectionLost("stream closed by device".into()));
            }
            PumpExit::Error(e) => {
                warn!("read pump failed: {e}");
                self.teardown().await;
                self.set_status(LinkStatus::ConnectionLost(e.to_string()));
            }
        }
    }

    // ── Periodic work ────────────────────────────────────────────

    /// Drain everything the pump has queued since the last tick.
    fn decode_pending(&mut self) {
        if !self.phase.is_connected() {
            return;
        }
        let mut pending = std::mem::take(&mut *self.queue.lock().unwrap());
        if pending.is_empty() {
            return;
        }
        for frame in self.decoder.drain(&mut pending) {
            self.frame_tx.send_replace(Some(frame));
        }
    }

    fn publish_rate(&self) {
        self.rate_tx.send_replace(self.meter.take_window());
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Best-effort resource release. Step failures are logged and
    /// never block the remaining steps.
    async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = self.phase.begin_teardown();

            // 1. Cancel the pending read.
            session.cancel.cancel();

            // 2. Close the write half.
            if let Some(mut writer) = session.writer.take() {
                if let Err(e) = writer.close().await {
                    warn!("error closing writer: {e}");
                }
            }

            // 3. The pump drops the reader when it exits.
            if let Some(pump) = session.pump.take() {
                if let Err(e) = pump.await {
                    warn!("read pump did not exit cleanly: {e}");
                }
            }
        }

        self.queue.lock().unwrap().clear();
        self.decoder.reset();
        self.meter.reset();
        self.rate_tx.send_replace(0);
        if self.phase.finish_teardown().is_err() {
            self.phase.force_disconnect();
        }
        self.connected_tx.send_replace(false);
    }

    fn set_status(&self, status: LinkStatus) {
        debug!(%status, "link status");
        self.status_tx.send_replace(status);
    }
}

// ── Read pump ────────────────────────────────────────────────────

/// Long-lived suspending read loop. Appends every received byte to
/// the ingestion queue in arrival order and feeds the byte counter;
/// never busy-polls. The loop condition is re-checked after every
/// read settles, so a cancellation causes prompt exit.
async fn run_pump(
    mut reader: Box<dyn SerialReader>,
    queue: Arc<Mutex<VecDeque<u8>>>,
    counter: ByteCounter,
    cancel: CancellationToken,
    events: mpsc::Sender<PumpExit>,
) {
    let reason = loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            result = reader.read_chunk() => result,
        };
        match result {
            Ok(Some(chunk)) => {
                counter.record(chunk.len() as u64);
                queue.lock().unwrap().extend(chunk.iter().copied());
            }
            Ok(None) => break PumpExit::Eof,
            Err(e) => break PumpExit::Error(e),
        }
    };
    // Dropping the reader here releases its half of the port.
    drop(reader);
    let _ = events.send(reason).await;
}

// ── Boot purge ───────────────────────────────────────────────────

/// Discard everything the device emits for `window`, racing each read
/// against a short timer. The losing read of a round is abandoned;
/// adapters tolerate that. End of stream inside the window is fatal
/// for the connection attempt.
async fn purge_boot_noise(
    reader: &mut dyn SerialReader,
    window: Duration,
    attempt: Duration,
) -> Result<u64, LinkError> {
    let deadline = tokio::time::Instant::now() + window;
    let mut discarded = 0u64;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(attempt.min(remaining), reader.read_chunk()).await {
            Err(_) => continue, // timer won this round
            Ok(Ok(Some(chunk))) => discarded += chunk.len() as u64,
            Ok(Ok(None)) => return Err(LinkError::StreamClosed),
            Ok(Err(e)) => return Err(e.into()),
        }
    }
    Ok(discarded)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryPort, SerialPort, memory_pair};
    use crate::wire::encode_frame;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Hands out prepared in-memory ports, one per connect attempt.
    struct MemoryOpener {
        ports: Mutex<VecDeque<MemoryPort>>,
    }

    impl MemoryOpener {
        fn new(ports: Vec<MemoryPort>) -> Self {
            Self { ports: Mutex::new(ports.into_iter().collect()) }
        }
    }

    #[async_trait]
    impl PortOpener for MemoryOpener {
        async fn open(
            &self,
            _line: &LineConfig,
        ) -> Result<Box<dyn crate::transport::SerialPort>, LinkError> {
            self.ports
                .lock()
                .unwrap()
                .pop_front()
                .map(|p| Box::new(p) as Box<dyn crate::transport::SerialPort>)
                .ok_or_else(|| LinkError::Open("no device available".into()))
        }
    }

    fn tiny_format() -> FrameFormat {
        FrameFormat::new(1, 7, 1)
    }

    fn test_config() -> LinkConfig {
        LinkConfig {
            format: tiny_format(),
            boot_purge: Duration::from_millis(100),
            purge_read_timeout: Duration::from_millis(10),
            decode_interval: Duration::from_millis(5),
            throughput_interval: Duration::from_millis(50),
            ..LinkConfig::default()
        }
    }

    fn start_link(ports: Vec<MemoryPort>) -> LinkHandle {
        let (link, handle) = SerialLink::new(test_config(), Box::new(MemoryOpener::new(ports)));
        tokio::spawn(link.run());
        handle
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn decodes_frames_end_to_end() {
        let (host, device) = memory_pair();
        let handle = start_link(vec![host]);
        let (_dev_read, mut dev_write) = Box::new(device).split();

        handle.connect().await.unwrap();
        assert!(handle.is_connected());

        let wire = encode_frame(&tiny_format(), &[1, 0, 1, 0, 0, 0, 0]);
        dev_write.write_all(&wire).await.unwrap();

        let mut frames = handle.frames();
        timeout(WAIT, frames.wait_for(|f| f.is_some()))
            .await
            .unwrap()
            .unwrap();
        let frame = frames.borrow().clone().unwrap();
        assert_eq!(frame.samples, vec![1, 0, 1, 0, 0, 0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn boot_noise_never_reaches_the_decoder() {
        let (host, device) = memory_pair();
        let handle = start_link(vec![host]);
        let (_dev_read, mut dev_write) = Box::new(device).split();

        // A complete valid frame sent before/while purging. If it
        // leaked into the queue it would decode as an all-ones frame.
        let noise = encode_frame(&tiny_format(), &[1; 7]);
        dev_write.write_all(&noise).await.unwrap();

        handle.connect().await.unwrap();

        let real = [0, 1, 0, 1, 0, 1, 0];
        dev_write
            .write_all(&encode_frame(&tiny_format(), &real))
            .await
            .unwrap();

        let mut frames = handle.frames();
        timeout(WAIT, frames.wait_for(|f| f.is_some()))
            .await
            .unwrap()
            .unwrap();
        // The first frame ever observed is the post-purge one.
        assert_eq!(frames.borrow().clone().unwrap().samples, real.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn eof_while_connected_reports_connection_lost() {
        let (host, device) = memory_pair();
        let handle = start_link(vec![host]);

        handle.connect().await.unwrap();
        drop(device); // device vanishes → reader sees end of stream

        let mut status = handle.status();
        timeout(WAIT, status.wait_for(|s| matches!(s, LinkStatus::ConnectionLost(_))))
            .await
            .unwrap()
            .unwrap();
        assert!(!handle.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn user_disconnect_is_not_reported_as_loss() {
        let (host, _device) = memory_pair();
        let handle = start_link(vec![host]);

        handle.connect().await.unwrap();
        handle.disconnect().await.unwrap();

        assert!(!handle.is_connected());
        assert_eq!(*handle.status().borrow(), LinkStatus::Disconnected);

        // Idempotent: a second disconnect is fine.
        handle.disconnect().await.unwrap();
        assert_eq!(*handle.status().borrow(), LinkStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn send_requires_a_live_connection() {
        let (host, _device) = memory_pair();
        let handle = start_link(vec![host]);

        assert!(!handle.send(Bytes::from_static(b"x")).await);
        assert!(matches!(
            &*handle.status().borrow(),
            LinkStatus::SendFailed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn send_rejects_empty_payload() {
        let (host, _device) = memory_pair();
        let handle = start_link(vec![host]);
        handle.connect().await.unwrap();

        assert!(!handle.send(Bytes::new()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn send_reaches_the_device() {
        let (host, device) = memory_pair();
        let handle = start_link(vec![host]);
        let (mut dev_read, _dev_write) = Box::new(device).split();

        handle.connect().await.unwrap();
        assert!(handle.send(Bytes::from_static(b"abc")).await);

        let chunk = timeout(WAIT, dev_read.read_chunk()).await.unwrap().unwrap();
        assert_eq!(chunk.unwrap().as_ref(), b"abc");
    }

    #[tokio::test(start_paused = true)]
    async fn open_failure_surfaces_and_returns_to_idle() {
        let handle = start_link(vec![]);

        let err = handle.connect().await.err().unwrap();
        assert!(matches!(err, LinkError::Open(_)));
        assert!(!handle.is_connected());
        assert!(matches!(
            &*handle.status().borrow(),
            LinkStatus::OpenFailed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn misaligned_width_is_rejected_at_connect() {
        let (host, _device) = memory_pair();
        let mut config = test_config();
        // 2 bits/sample packs 3 samples per byte; 10 is not a multiple.
        config.format = FrameFormat::new(2, 10, 2);
        let (link, handle) = SerialLink::new(config, Box::new(MemoryOpener::new(vec![host])));
        tokio::spawn(link.run());

        let err = handle.connect().await.err().unwrap();
        assert!(matches!(err, LinkError::Format(_)));
        assert!(!handle.is_connected());
        assert!(matches!(
            &*handle.status().borrow(),
            LinkStatus::OpenFailed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn eof_during_purge_aborts_the_attempt() {
        let (host, device) = memory_pair();
        drop(device); // stream closed before the purge window elapses
        let handle = start_link(vec![host]);

        let err = handle.connect().await.err().unwrap();
        assert!(matches!(err, LinkError::StreamClosed));
        assert!(!handle.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_after_disconnect_uses_a_fresh_port() {
        let (host_a, _device_a) = memory_pair();
        let (host_b, device_b) = memory_pair();
        let handle = start_link(vec![host_a, host_b]);
        let (_b_read, mut b_write) = Box::new(device_b).split();

        handle.connect().await.unwrap();
        handle.disconnect().await.unwrap();
        handle.connect().await.unwrap();
        assert!(handle.is_connected());

        // The second session decodes from the second port.
        b_write
            .write_all(&encode_frame(&tiny_format(), &[1; 7]))
            .await
            .unwrap();
        let mut frames = handle.frames();
        timeout(WAIT, frames.wait_for(|f| f.is_some()))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn throughput_window_publishes_received_bytes() {
        let (host, device) = memory_pair();
        let handle = start_link(vec![host]);
        let (_dev_read, mut dev_write) = Box::new(device).split();

        handle.connect().await.unwrap();
        let mut rate = handle.throughput();

        dev_write.write_all(&[0u8; 64]).await.unwrap();
        timeout(WAIT, rate.wait_for(|&r| r > 0)).await.unwrap().unwrap();
    }

    #[test]
    fn status_messages_are_human_readable() {
        assert_eq!(LinkStatus::Connected.to_string(), "serial link up");
        assert!(
            LinkStatus::ConnectionLost("read error".into())
                .to_string()
                .contains("connection lost")
        );
        assert!(
            LinkStatus::OpenFailed("no such device".into())
                .to_string()
                .contains("no such device")
        );
    }
}
