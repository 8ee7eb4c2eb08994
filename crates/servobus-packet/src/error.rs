//! Packet error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding bus packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Packet would exceed the maximum wire size.
    #[error("packet too long: {len} bytes, maximum {max}")]
    Oversize {
        /// Total packet length that was requested.
        len: usize,
        /// Maximum allowed packet length.
        max: usize,
    },

    /// A complete frame arrived but its checksum does not match.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },
}
