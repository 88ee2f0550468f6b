//! In-memory duplex port pair.
//!
//! Backs the test suite and loopback experiments: two [`MemoryPort`]s
//! joined by byte channels, each side reading what the other writes.
//! End of stream is signalled by dropping the peer's write half.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{SerialPort, SerialReader, SerialWriter};

/// One end of an in-memory duplex byte link.
pub struct MemoryPort {
    rx: mpsc::UnboundedReceiver<Bytes>,
    tx: mpsc::UnboundedSender<Bytes>,
}

/// Create a connected pair of in-memory ports.
pub fn memory_pair() -> (MemoryPort, MemoryPort) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        MemoryPort { rx: a_rx, tx: a_tx },
        MemoryPort { rx: b_rx, tx: b_tx },
    )
}

impl SerialPort for MemoryPort {
    fn split(self: Box<Self>) -> (Box<dyn SerialReader>, Box<dyn SerialWriter>) {
        (
            Box::new(MemoryReader { rx: self.rx }),
            Box::new(MemoryWriter { tx: Some(self.tx) }),
        )
    }
}

struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

#[async_trait]
impl SerialReader for MemoryReader {
    async fn read_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        // None when every sender on the peer side is gone.
        Ok(self.rx.recv().await)
    }
}

struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
}

#[async_trait]
impl SerialWriter for MemoryWriter {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "writer closed")
        })?;
        tx.send(Bytes::copy_from_slice(data)).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer dropped")
        })
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.tx.take();
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
