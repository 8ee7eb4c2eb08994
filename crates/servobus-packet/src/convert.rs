//! Numeric conversion helpers.
//!
//! Multi-byte register values travel as individual bytes whose order depends
//! on the servo family. The [`Endian`] mode selects how 16-bit words map to
//! wire bytes; 32-bit values are always two words, low word first. Devices
//! encode negative quantities as sign-and-magnitude rather than two's
//! complement, with the sign carried in a designated bit.

/// Byte order used for 16-bit words on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Low byte first. Used by the STS and SMS servo families.
    #[default]
    Little,
    /// High byte first. Used by the SCS servo family.
    Big,
}

/// Split a word into wire order.
pub fn word_to_bytes(value: u16, endian: Endian) -> [u8; 2] {
    match endian {
        Endian::Little => [value as u8, (value >> 8) as u8],
        Endian::Big => [(value >> 8) as u8, value as u8],
    }
}

/// Assemble a word from two bytes in wire order.
pub fn word_from_bytes(b0: u8, b1: u8, endian: Endian) -> u16 {
    match endian {
        Endian::Little => u16::from(b0) | (u16::from(b1) << 8),
        Endian::Big => u16::from(b1) | (u16::from(b0) << 8),
    }
}

/// Split a double word into wire order, low word first.
pub fn dword_to_bytes(value: u32, endian: Endian) -> [u8; 4] {
    let lo = word_to_bytes(lo_word(value), endian);
    let hi = word_to_bytes(hi_word(value), endian);
    [lo[0], lo[1], hi[0], hi[1]]
}

/// Assemble a double word from four bytes in wire order.
pub fn dword_from_bytes(bytes: [u8; 4], endian: Endian) -> u32 {
    let lo = word_from_bytes(bytes[0], bytes[1], endian);
    let hi = word_from_bytes(bytes[2], bytes[3], endian);
    dword_from_words(lo, hi)
}

/// Low word of a double word.
pub fn lo_word(value: u32) -> u16 {
    (value & 0xFFFF) as u16
}

/// High word of a double word.
pub fn hi_word(value: u32) -> u16 {
    ((value >> 16) & 0xFFFF) as u16
}

/// Combine two words into a double word.
pub fn dword_from_words(low: u16, high: u16) -> u32 {
    u32::from(low) | (u32::from(high) << 16)
}

/// Decode a sign-and-magnitude register value. `sign_bit` is the bit index
/// that carries the sign.
pub fn decode_signed(raw: u32, sign_bit: u32) -> i32 {
    let mask = 1u32 << sign_bit;
    if raw & mask != 0 {
        -((raw & !mask) as i32)
    } else {
        raw as i32
    }
}

/// Encode a value as sign-and-magnitude with the sign at `sign_bit`.
pub fn encode_signed(value: i32, sign_bit: u32) -> u32 {
    if value < 0 {
        (-value as u32) | (1u32 << sign_bit)
    } else {
        value as u32
    }
}
