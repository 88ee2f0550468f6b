//! Wire format of the serial framing protocol.
//!
//! Every byte on the link carries a flag in its most-significant bit:
//! `1` marks a **command** byte (low 7 bits select a control action),
//! `0` marks a **data** byte (low 7 bits pack multiple pixel samples).
//! Because the flag bit is reserved, a data byte carries 7 payload bits
//! and packs `7 / BITS_PER_COLOR` samples.

// ── Link constants ───────────────────────────────────────────────

/// Fixed line rate of the device.
pub const BAUD_RATE: u32 = 1_000_000;

/// Bit width of a single pixel sample on the wire.
pub const BITS_PER_COLOR: u8 = 2;

/// Native display width in pixels.
pub const SCREEN_WIDTH: usize = 96;

/// Native display height in pixels.
pub const SCREEN_HEIGHT: usize = 64;

/// Mask of the command/data flag bit.
pub const COMMAND_FLAG: u8 = 1 << 7;

/// Mask of the 7 payload bits.
pub const PAYLOAD_MASK: u8 = COMMAND_FLAG - 1;

// ── ControlCode ──────────────────────────────────────────────────

/// Control actions selected by the payload of a command byte.
///
/// Codes outside this set are valid on the wire but unsupported by the
/// decoder; they are counted and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlCode {
    /// Device finished booting. Informational; resets the decoder.
    Booted = 0x01,
    /// Marks the start of a frame; resets any partial frame.
    FrameStart = 0x02,
    /// Marks the end of a frame; finalizes it if the length matches.
    FrameEnd = 0x03,
}

impl ControlCode {
    /// Map a 7-bit command payload to a known control code.
    pub fn from_payload(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Booted),
            0x02 => Some(Self::FrameStart),
            0x03 => Some(Self::FrameEnd),
            _ => None,
        }
    }

    /// The full wire byte for this code (flag bit set).
    pub const fn to_wire(self) -> u8 {
        self as u8 | COMMAND_FLAG
    }
}

/// Whether a wire byte is a command byte.
pub const fn is_command(byte: u8) -> bool {
    byte & COMMAND_FLAG != 0
}

/// The 7 payload bits of a wire byte.
pub const fn payload(byte: u8) -> u8 {
    byte & PAYLOAD_MASK
}

// ── FrameFormat ──────────────────────────────────────────────────

/// Geometry and packing parameters of a decoded frame.
///
/// The link-native format is fixed at build time ([`FrameFormat::default`]);
/// carrying it as a value keeps the decoder, the simulator, and the tests
/// free to use small formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Bits per pixel sample.
    pub bits_per_color: u8,
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
}

impl FrameFormat {
    pub const fn new(bits_per_color: u8, width: usize, height: usize) -> Self {
        Self { bits_per_color, width, height }
    }

    /// Samples packed into the 7 payload bits of one data byte.
    pub const fn colors_per_byte(&self) -> usize {
        (7 / self.bits_per_color) as usize
    }

    /// Data bytes per display row.
    pub const fn bytes_per_row(&self) -> usize {
        self.width / self.colors_per_byte()
    }

    /// Data bytes the device sends between FRAME_START and FRAME_END.
    pub const fn data_bytes_per_frame(&self) -> usize {
        self.height * self.bytes_per_row()
    }

    /// Samples a completed frame holds.
    pub const fn samples_per_frame(&self) -> usize {
        self.data_bytes_per_frame() * self.colors_per_byte()
    }

    /// Mask for a single sample.
    pub const fn sample_mask(&self) -> u8 {
        (1 << self.bits_per_color) - 1
    }

    /// Whether the width is a whole number of packed bytes, so that a
    /// frame covers exactly `width * height` samples.
    pub const fn is_row_aligned(&self) -> bool {
        self.width % self.colors_per_byte() == 0
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::new(BITS_PER_COLOR, SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

// ── Encoding ─────────────────────────────────────────────────────

/// Encode one frame of samples into its wire representation:
/// FRAME_START, the packed data bytes, FRAME_END.
///
/// Sample *i* of a data byte occupies bits
/// `[i * bits_per_color, (i + 1) * bits_per_color)`. Samples are masked
/// to the format's bit width.
///
/// # Panics
///
/// Panics if `samples.len()` does not match the format.
pub fn encode_frame(format: &FrameFormat, samples: &[u8]) -> Vec<u8> {
    assert_eq!(samples.len(), format.samples_per_frame(), "sample count mismatch");

    let cpb = format.colors_per_byte();
    let mask = format.sample_mask();
    let mut out = Vec::with_capacity(format.data_bytes_per_frame() + 2);

    out.push(ControlCode::FrameStart.to_wire());
    for packed in samples.chunks(cpb) {
        let mut byte = 0u8;
        for (i, &sample) in packed.iter().enumerate() {
            byte |= (sample & mask) << (format.bits_per_color as usize * i);
        }
        out.push(byte);
    }
    out.push(ControlCode::FrameEnd.to_wire());
    out
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bit_separates_command_and_data() {
        assert!(is_command(ControlCode::FrameStart.to_wire()));
        assert!(!is_command(0b0101_0101));
        assert_eq!(payload(ControlCode::FrameEnd.to_wire()), 0x03);
    }

    #[test]
    fn unknown_codes_map_to_none() {
        assert_eq!(ControlCode::from_payload(0x00), None);
        assert_eq!(ControlCode::from_payload(0x04), None);
        assert_eq!(ControlCode::from_payload(0x7F), None);
    }

    #[test]
    fn default_format_geometry() {
        let f = FrameFormat::default();
        assert_eq!(f.colors_per_byte(), 3);
        assert_eq!(f.bytes_per_row(), 32);
        assert_eq!(f.data_bytes_per_frame(), 2048);
        assert_eq!(f.samples_per_frame(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert!(f.is_row_aligned());
    }

    #[test]
    fn one_bit_format_packs_seven_samples() {
        let f = FrameFormat::new(1, 7, 1);
        assert_eq!(f.colors_per_byte(), 7);
        assert_eq!(f.data_bytes_per_frame(), 1);
        assert_eq!(f.sample_mask(), 0b1);
    }

    #[test]
    fn encode_packs_low_bits_first() {
        let f = FrameFormat::new(1, 7, 1);
        // Samples [1,0,1,0,0,0,0] → payload 0b0000101 = 5.
        let bytes = encode_frame(&f, &[1, 0, 1, 0, 0, 0, 0]);
        assert_eq!(
            bytes,
            vec![
                ControlCode::FrameStart.to_wire(),
                0b0000_0101,
                ControlCode::FrameEnd.to_wire(),
            ]
        );
    }

    #[test]
    fn encode_masks_oversized_samples() {
        let f = FrameFormat::new(2, 3, 1);
        // 0xFF masked to 2 bits = 0b11 in every slot → 0b00111111.
        let bytes = encode_frame(&f, &[0xFF, 0xFF, 0xFF]);
        assert_eq!(bytes[1], 0b0011_1111);
        // Data bytes never carry the command flag.
        assert!(!is_command(bytes[1]));
    }
}
