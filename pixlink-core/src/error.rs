//! Domain-specific error types for the pixlink bridge.
//!
//! All fallible operations return `Result<T, LinkError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the serial link.
#[derive(Debug, Error)]
pub enum LinkError {
    // ── Transport acquisition ────────────────────────────────────
    /// The serial port could not be opened or rejected its line
    /// parameters.
    #[error("failed to open serial port: {0}")]
    Open(String),

    /// The requested baud rate has no termios encoding.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    /// The configured frame geometry cannot be carried by the wire
    /// format (width must be a whole number of packed bytes).
    #[error("invalid frame format: {0}")]
    Format(String),

    // ── Mid-session transport ────────────────────────────────────
    /// The underlying I/O layer reported an error.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The device closed the stream while we still expected bytes.
    #[error("serial stream closed unexpectedly")]
    StreamClosed,

    // ── Lifecycle ────────────────────────────────────────────────
    /// A lifecycle transition was requested from the wrong phase.
    #[error("invalid link state: {0}")]
    State(&'static str),

    /// The link actor is gone and can no longer accept commands.
    #[error("link channel closed")]
    ChannelClosed,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for LinkError {
    fn from(s: String) -> Self {
        LinkError::Other(s)
    }
}

impl From<&str> for LinkError {
    fn from(s: &str) -> Self {
        LinkError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for LinkError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        LinkError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = LinkError::UnsupportedBaud(921_600);
        assert!(e.to_string().contains("921600"));

        let e = LinkError::State("cannot purge: not in Opening phase");
        assert!(e.to_string().contains("Opening"));
    }

    #[test]
    fn from_string() {
        let e: LinkError = "something broke".into();
        assert!(matches!(e, LinkError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: LinkError = io_err.into();
        assert!(matches!(e, LinkError::Io(_)));
    }
}
