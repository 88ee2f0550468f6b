//! Streaming frame decoder.
//!
//! Consumes the raw byte stream one byte at a time and reconstructs
//! complete pixel frames according to the flag-bit framing protocol
//! (see [`crate::wire`]). Every anomaly is absorbed locally: a framing
//! error resets the decoder and decoding continues with the next byte —
//! nothing on this path is fatal.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::wire::{self, ControlCode, FrameFormat};

// ── Frame ────────────────────────────────────────────────────────

/// One complete decoded image: a fixed-length sequence of
/// pixel-intensity samples in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// One sample per pixel, row-major, already masked to the wire
    /// format's bit width.
    pub samples: Vec<u8>,
}

impl Frame {
    /// The sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        self.samples[y * self.width + x]
    }
}

// ── DecodeStats ──────────────────────────────────────────────────

/// Running counters over everything the decoder has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Frames finalized and handed to the sink.
    pub frames: u64,
    /// FRAME_END markers whose byte count did not match.
    pub length_mismatches: u64,
    /// Command bytes with an unsupported code.
    pub unknown_commands: u64,
}

// ── FrameDecoder ─────────────────────────────────────────────────

/// Incremental decoder for the serial framing protocol.
///
/// Invariant between bytes: `partial.len() == bytes_since_boundary *
/// colors_per_byte`. A reset clears both.
pub struct FrameDecoder {
    format: FrameFormat,
    /// Data bytes consumed since the last frame boundary.
    bytes_since_boundary: usize,
    /// Samples accumulated for the frame under construction.
    partial: Vec<u8>,
    stats: DecodeStats,
}

impl FrameDecoder {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            bytes_since_boundary: 0,
            partial: Vec::with_capacity(format.samples_per_frame()),
            stats: DecodeStats::default(),
        }
    }

    /// The format this decoder reconstructs.
    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Discard any partial frame and return to the boundary state.
    pub fn reset(&mut self) {
        self.bytes_since_boundary = 0;
        self.partial.clear();
    }

    /// Consume one wire byte; returns a completed frame when this byte
    /// finalizes one.
    pub fn ingest(&mut self, byte: u8) -> Option<Frame> {
        if wire::is_command(byte) {
            self.ingest_command(wire::payload(byte))
        } else {
            self.ingest_data(wire::payload(byte));
            None
        }
    }

    /// Drain an entire pending queue through the decoder in one pass.
    ///
    /// Iterative on purpose: a large burst must not grow the call
    /// stack. Frames come back in completion order, which equals
    /// arrival order since frames cannot overlap.
    pub fn drain(&mut self, pending: &mut VecDeque<u8>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(byte) = pending.pop_front() {
            if let Some(frame) = self.ingest(byte) {
                frames.push(frame);
            }
        }
        frames
    }

    // ── Internal ─────────────────────────────────────────────────

    fn ingest_command(&mut self, code: u8) -> Option<Frame> {
        match ControlCode::from_payload(code) {
            Some(ControlCode::Booted) => {
                debug!("device reports booted; resetting decoder");
                self.reset();
                None
            }
            Some(ControlCode::FrameStart) => {
                self.reset();
                None
            }
            Some(ControlCode::FrameEnd) => self.finish_frame(),
            None => {
                // Unsupported command: discard, no state change.
                self.stats.unknown_commands += 1;
                debug!(code, "unsupported command byte discarded");
                None
            }
        }
    }

    fn ingest_data(&mut self, packed: u8) {
        let bits = self.format.bits_per_color as usize;
        let mask = self.format.sample_mask();
        for i in 0..self.format.colors_per_byte() {
            self.partial.push((packed >> (bits * i)) & mask);
        }
        self.bytes_since_boundary += 1;
    }

    fn finish_frame(&mut self) -> Option<Frame> {
        let expected = self.format.data_bytes_per_frame();
        if self.bytes_since_boundary != expected {
            warn!(
                expected,
                actual = self.bytes_since_boundary,
                "frame length mismatch at FRAME_END; partial frame discarded"
            );
            self.stats.length_mismatches += 1;
            self.reset();
            return None;
        }

        let samples = std::mem::take(&mut self.partial);
        self.reset();
        self.stats.frames += 1;
        Some(Frame {
            width: self.format.width,
            height: self.format.height,
            samples,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
