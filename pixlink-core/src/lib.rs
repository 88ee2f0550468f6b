//! # pixlink-core
//!
//! Core library for the PixLink serial-display bridge.
//!
//! This crate contains:
//! - **Wire**: the 7-bit framing protocol — command/data byte layout,
//!   control codes, frame geometry, and the reference encoder
//! - **Decoder**: `FrameDecoder`, the streaming byte-at-a-time frame
//!   reassembler with length validation
//! - **State**: `LinkPhase`, the connection lifecycle state machine
//! - **Link**: `SerialLink` / `LinkHandle`, the session actor tying
//!   transport, purge, decode, throughput, and send together
//! - **Throughput**: `ThroughputMeter` for bytes-per-window rates
//! - **Transport**: the `PortOpener`/`SerialPort` seam with in-memory,
//!   TCP, and Linux tty adapters
//! - **Error**: `LinkError` — typed, `thiserror`-based error hierarchy

pub mod decoder;
pub mod error;
pub mod link;
pub mod state;
pub mod throughput;
pub mod transport;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use decoder::{DecodeStats, Frame, FrameDecoder};
pub use error::LinkError;
pub use link::{LinkConfig, LinkHandle, LinkStatus, SerialLink};
pub use state::LinkPhase;
pub use throughput::{ByteCounter, ThroughputMeter};
pub use transport::{LineConfig, PortOpener, SerialPort, SerialReader, SerialWriter};
pub use wire::{
    BAUD_RATE, BITS_PER_COLOR, ControlCode, FrameFormat, SCREEN_HEIGHT, SCREEN_WIDTH,
    encode_frame,
};
