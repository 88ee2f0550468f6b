//! Transport adapters for the serial link.
//!
//! The core never touches a device directly; it consumes the traits in
//! this module. An adapter produces a [`SerialPort`] which splits into
//! independent reader and writer halves, mirroring the way the link is
//! actually used: a long-lived suspending read loop on one side and
//! occasional outbound writes on the other.
//!
//! Adapters must tolerate an abandoned read: the lifecycle manager
//! races reads against timers and cancellation, and the losing read
//! future is simply dropped.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LinkError;
use crate::wire::BAUD_RATE;

pub mod memory;
pub mod tcp;
#[cfg(target_os = "linux")]
pub mod tty;

pub use memory::{MemoryPort, memory_pair};
pub use tcp::{TcpOpener, TcpPort};
#[cfg(target_os = "linux")]
pub use tty::TtyOpener;

// ── LineConfig ───────────────────────────────────────────────────

/// Serial line parameters. The protocol fixes everything except the
/// receive buffer size: 8 data bits, no parity, 1 stop bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Line rate in bits per second.
    pub baud_rate: u32,
    /// Receive buffer size per read, in bytes.
    pub buffer_size: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            buffer_size: 4096,
        }
    }
}

// ── Traits ───────────────────────────────────────────────────────

/// Read half of an open port.
#[async_trait]
pub trait SerialReader: Send + 'static {
    /// Wait for the next chunk of bytes.
    ///
    /// Suspends until bytes arrive; `Ok(None)` signals end of stream.
    async fn read_chunk(&mut self) -> std::io::Result<Option<Bytes>>;
}

/// Write half of an open port.
#[async_trait]
pub trait SerialWriter: Send + 'static {
    /// Write all of `data` to the device.
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Flush and release the write half. Dropping the half after a
    /// failed close must still release the handle.
    async fn close(&mut self) -> std::io::Result<()>;
}

/// An open duplex port, ready to be split for concurrent use.
pub trait SerialPort: Send + 'static {
    fn split(self: Box<Self>) -> (Box<dyn SerialReader>, Box<dyn SerialWriter>);
}

/// Host-mediated device selection and open.
///
/// Implementations perform whatever selection the host environment
/// offers (a fixed tty path, a TCP endpoint, an in-memory pair) and
/// open it with the given line parameters.
#[async_trait]
pub trait PortOpener: Send + Sync + 'static {
    async fn open(&self, line: &LineConfig) -> Result<Box<dyn SerialPort>, LinkError>;
}
