//! TCP-backed port adapter.
//!
//! Lets the bridge speak to the device simulator (or a serial-over-TCP
//! gateway) with exactly the same lifecycle it uses against hardware.
//! Line parameters other than the buffer size have no meaning here and
//! are logged for reference only.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

use super::{LineConfig, PortOpener, SerialPort, SerialReader, SerialWriter};
use crate::error::LinkError;

/// A connected TCP stream presented as a serial port.
pub struct TcpPort {
    stream: TcpStream,
    buffer_size: usize,
}

impl TcpPort {
    pub fn new(stream: TcpStream, buffer_size: usize) -> Self {
        Self { stream, buffer_size }
    }
}

impl SerialPort for TcpPort {
    fn split(self: Box<Self>) -> (Box<dyn SerialReader>, Box<dyn SerialWriter>) {
        let (read, write) = self.stream.into_split();
        (
            Box::new(TcpReader { read, buffer_size: self.buffer_size }),
            Box::new(TcpWriter { write }),
        )
    }
}

struct TcpReader {
    read: OwnedReadHalf,
    buffer_size: usize,
}

#[async_trait]
impl SerialReader for TcpReader {
    async fn read_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; self.buffer_size];
        let n = self.read.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

struct TcpWriter {
    write: OwnedWriteHalf,
}

#[async_trait]
impl SerialWriter for TcpWriter {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.write.write_all(data).await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.write.shutdown().await
    }
}

// ── TcpOpener ────────────────────────────────────────────────────

/// Opens a [`TcpPort`] against a fixed remote address.
pub struct TcpOpener {
    addr: String,
}

impl TcpOpener {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl PortOpener for TcpOpener {
    async fn open(&self, line: &LineConfig) -> Result<Box<dyn SerialPort>, LinkError> {
        debug!(addr = %self.addr, baud = line.baud_rate, "opening TCP port");
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| LinkError::Open(format!("{}: {e}", self.addr)))?;
        stream.set_nodelay(true).ok();
        Ok(Box::new(TcpPort::new(stream, line.buffer_size)))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn tcp_port_reads_and_signals_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"hello").await.unwrap();
            // Dropping the socket closes the stream.
        });

        let opener = TcpOpener::new(addr.to_string());
        let port = opener.open(&LineConfig::default()).await.unwrap();
        let (mut read, _write) = port.split();

        let chunk = read.read_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.as_ref(), b"hello");

        server.await.unwrap();
        assert!(read.read_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        // Port 1 on localhost should refuse the connection.
        let opener = TcpOpener::new("127.0.0.1:1");
        let err = opener.open(&LineConfig::default()).await.err().unwrap();
        assert!(matches!(err, LinkError::Open(_)));
    }
}
