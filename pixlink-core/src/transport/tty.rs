//! Real serial port adapter (Linux).
//!
//! Opens a tty device node, configures raw 8N1 mode and the line rate
//! through termios, and presents the two cloned descriptors as the
//! reader/writer halves. Reads run on the blocking pool via
//! `tokio::fs::File`; an abandoned read parks a pool thread until the
//! device produces a byte or the descriptor is closed, which the
//! lifecycle manager tolerates by design of the adapter contract.

use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::{LineConfig, PortOpener, SerialPort, SerialReader, SerialWriter};
use crate::error::LinkError;

// ── termios setup ────────────────────────────────────────────────

fn baud_flag(baud: u32) -> Result<libc::speed_t, LinkError> {
    Ok(match baud {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        460_800 => libc::B460800,
        500_000 => libc::B500000,
        921_600 => libc::B921600,
        1_000_000 => libc::B1000000,
        other => return Err(LinkError::UnsupportedBaud(other)),
    })
}

fn configure_raw(fd: RawFd, baud: libc::speed_t) -> std::io::Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller and `tio`
    // is a valid termios struct for the duration of every call below.
    unsafe {
        let mut tio: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        libc::cfmakeraw(&mut tio);
        // 8 data bits, no parity, 1 stop bit.
        tio.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
        tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
        // Reads block until at least one byte is available.
        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;

        if libc::cfsetispeed(&mut tio, baud) != 0 || libc::cfsetospeed(&mut tio, baud) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        // Drop whatever accumulated while the line was unconfigured.
        libc::tcflush(fd, libc::TCIOFLUSH);
    }
    Ok(())
}

// ── TtyPort ──────────────────────────────────────────────────────

/// An open tty device in raw mode.
pub struct TtyPort {
    reader: tokio::fs::File,
    writer: tokio::fs::File,
    buffer_size: usize,
}

impl SerialPort for TtyPort {
    fn split(self: Box<Self>) -> (Box<dyn SerialReader>, Box<dyn SerialWriter>) {
        (
            Box::new(TtyReader { file: self.reader, buffer_size: self.buffer_size }),
            Box::new(TtyWriter { file: self.writer }),
        )
    }
}

struct TtyReader {
    file: tokio::fs::File,
    buffer_size: usize,
}

#[async_trait]
impl SerialReader for TtyReader {
    async fn read_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; self.buffer_size];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

struct TtyWriter {
    file: tokio::fs::File,
}

#[async_trait]
impl SerialWriter for TtyWriter {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all(data).await?;
        self.file.flush().await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.file.shutdown().await
    }
}

// ── TtyOpener ────────────────────────────────────────────────────

/// Opens a fixed tty device node, e.g. `/dev/ttyUSB0`.
pub struct TtyOpener {
    path: PathBuf,
}

impl TtyOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PortOpener for TtyOpener {
    async fn open(&self, line: &LineConfig) -> Result<Box<dyn SerialPort>, LinkError> {
        use std::os::unix::fs::OpenOptionsExt;

        let baud = baud_flag(line.baud_rate)?;
        debug!(path = %self.path.display(), baud = line.baud_rate, "opening tty");

        let path = self.path.clone();
        let buffer_size = line.buffer_size;
        // Open + termios are blocking syscalls.
        let port = tokio::task::spawn_blocking(move || -> std::io::Result<TtyPort> {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_NOCTTY)
                .open(&path)?;
            configure_raw(file.as_raw_fd(), baud)?;
            let write_half = file.try_clone()?;
            Ok(TtyPort {
                reader: tokio::fs::File::from_std(file),
                writer: tokio::fs::File::from_std(write_half),
                buffer_size,
            })
        })
        .await
        .map_err(|e| LinkError::Open(format!("tty open task failed: {e}")))?
        .map_err(|e| LinkError::Open(format!("{}: {e}", self.path.display())))?;

        Ok(Box::new(port))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bauds_map() {
        assert_eq!(baud_flag(1_000_000).unwrap(), libc::B1000000);
        assert_eq!(baud_flag(115_200).unwrap(), libc::B115200);
    }

    #[test]
    fn unknown_baud_rejected() {
        assert!(matches!(
            baud_flag(123_456),
            Err(LinkError::UnsupportedBaud(123_456))
        ));
    }

    #[tokio::test]
    async fn missing_device_reports_open_error() {
        let opener = TtyOpener::new("/dev/does-not-exist-pixlink");
        let err = opener.open(&LineConfig::default()).await.err().unwrap();
        assert!(matches!(err, LinkError::Open(_)));
    }
}
