//! Frame checksum and the resynchronizing status decoder.
//!
//! Every packet on the bus, in either direction, uses the same layout:
//!
//! ```text
//! +------+------+------+------+--------------+-----------------+----------+
//! | 0xFF | 0xFF |  id  | len  | inst / fault | params[0..n]    | checksum |
//! +------+------+------+------+--------------+-----------------+----------+
//! ```
//!
//! - `len` counts the instruction/fault byte, the parameters and the
//!   checksum, so `len = n + 2` and the total frame size is `len + 4`.
//! - `checksum` is the bitwise complement of the 8-bit sum of every byte
//!   from `id` through the last parameter.
//!
//! The decoder accumulates raw bytes from the channel and realigns itself
//! on the two-byte header, so a transaction can recover from line noise,
//! partial frames left over from an aborted exchange, or a stray header
//! pair inside another packet's payload.

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::error::PacketError;
use crate::status::{FaultFlags, StatusPacket};

/// Checksum over a byte span: complement of the wrapping 8-bit sum.
pub fn checksum(data: &[u8]) -> u8 {
    let mut sum = 0u8;
    for &byte in data {
        sum = sum.wrapping_add(byte);
    }
    !sum
}

/// Accumulating decoder for inbound status packets.
///
/// Bytes are fed in as they arrive via [`push`](FrameDecoder::push);
/// [`try_decode`](FrameDecoder::try_decode) extracts at most one complete
/// status packet per call.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        FrameDecoder {
            buffer: BytesMut::with_capacity(MAX_PACKET_LEN),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete status packet from the buffer.
    ///
    /// Returns `Ok(Some(packet))` if a complete packet was decoded,
    /// `Ok(None)` if more data is needed, or `Err` if a complete frame
    /// failed its checksum. A frame that errors is consumed, so decoding
    /// may continue with whatever follows it.
    pub fn try_decode(&mut self) -> Result<Option<StatusPacket>, PacketError> {
        loop {
            if self.buffer.len() < MIN_PACKET_LEN {
                return Ok(None);
            }

            // Align the header pair to the start of the buffer.
            let Some(start) = find_header(&self.buffer) else {
                // No header anywhere. A trailing 0xFF may still pair with
                // the next byte to arrive, so keep it.
                let garbage = self.buffer.len() - 1;
                log::trace!("decoder: discarding {} unframed bytes", garbage);
                self.buffer.advance(garbage);
                return Ok(None);
            };
            if start > 0 {
                log::trace!("decoder: discarding {} bytes before header", start);
                self.buffer.advance(start);
                continue;
            }

            // Field sanity at offset 0. A violation means this header pair
            // is stray bytes inside some other frame: drop a single byte
            // and rescan.
            let id = self.buffer[PKT_ID];
            let length = self.buffer[PKT_LENGTH] as usize;
            let status = self.buffer[PKT_ERROR];
            if id > MAX_DEVICE_ID || length > MAX_PACKET_LEN || status > MAX_STATUS_VALUE {
                self.buffer.advance(1);
                continue;
            }

            let total = length + 4;
            if self.buffer.len() < total {
                return Ok(None);
            }

            let expected = checksum(&self.buffer[PKT_ID..total - 1]);
            let actual = self.buffer[total - 1];
            if expected != actual {
                self.buffer.advance(total);
                return Err(PacketError::ChecksumMismatch { expected, actual });
            }

            let packet = StatusPacket {
                id,
                faults: FaultFlags::new(status),
                params: self.buffer[PKT_PARAMETER0..total - 1].to_vec(),
            };
            self.buffer.advance(total);
            return Ok(Some(packet));
        }
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Position of the first header pair, if any.
fn find_header(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(2)
        .position(|pair| pair == [HEADER_BYTE, HEADER_BYTE])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a status frame by hand; inbound frames share the instruction
    /// layout with the fault byte in the instruction slot.
    fn make_status(id: u8, fault: u8, params: &[u8]) -> Vec<u8> {
        let mut frame = vec![HEADER_BYTE, HEADER_BYTE, id, (params.len() + 2) as u8, fault];
        frame.extend_from_slice(params);
        frame.push(checksum(&frame[PKT_ID..]));
        frame
    }

    #[test]
    fn test_checksum_known_value() {
        // id 1, length 2, ping: the worked example from the wire format.
        assert_eq!(checksum(&[0x01, 0x02, 0x01]), 0xFB);
    }

    #[test]
    fn test_decode_status() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&make_status(0x03, 0x00, &[0xD0, 0x07]));

        let packet = decoder.try_decode().unwrap().expect("complete frame");
        assert_eq!(packet.id, 0x03);
        assert!(!packet.faults.any());
        assert_eq!(packet.params, vec![0xD0, 0x07]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_decode_fault_bits() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&make_status(0x01, FAULT_OVERHEAT | FAULT_OVERLOAD, &[]));

        let packet = decoder.try_decode().unwrap().expect("complete frame");
        assert!(packet.faults.overheat());
        assert!(packet.faults.overload());
        assert!(!packet.faults.voltage());
    }

    #[test]
    fn test_decode_partial() {
        let mut decoder = FrameDecoder::new();
        let frame = make_status(0x01, 0x00, &[0x11, 0x22, 0x33]);

        decoder.push(&frame[..4]);
        assert_eq!(decoder.try_decode().unwrap(), None);

        decoder.push(&frame[4..7]);
        assert_eq!(decoder.try_decode().unwrap(), None);

        decoder.push(&frame[7..]);
        let packet = decoder.try_decode().unwrap().expect("complete frame");
        assert_eq!(packet.params, vec![0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_decode_resyncs_past_garbage() {
        let mut decoder = FrameDecoder::new();
        let mut data = vec![0x12, 0x34, 0x00, 0xFF, 0x56];
        data.extend_from_slice(&make_status(0x02, 0x00, &[0x99]));
        decoder.push(&data);

        let packet = decoder.try_decode().unwrap().expect("complete frame");
        assert_eq!(packet.id, 0x02);
        assert_eq!(packet.params, vec![0x99]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_decode_garbage_only_keeps_tail() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x01, 0x02, 0x03, 0x04, 0x05, 0xFF]);
        assert_eq!(decoder.try_decode().unwrap(), None);
        // The trailing byte survives in case it is half of a header.
        assert_eq!(decoder.buffered_len(), 1);

        // The other header half plus the rest of a frame completes it.
        let frame = make_status(0x01, 0x00, &[]);
        decoder.push(&frame[1..]);
        assert!(decoder.try_decode().unwrap().is_some());
    }

    #[test]
    fn test_decode_stray_header_discards_one_byte() {
        // Three 0xFF in a row: the pair at offset 0 sees id 0xFF, which is
        // invalid, so exactly one byte is dropped and the real frame parses.
        let mut decoder = FrameDecoder::new();
        let mut data = vec![HEADER_BYTE];
        data.extend_from_slice(&make_status(0x01, 0x00, &[0x42]));
        decoder.push(&data);

        let packet = decoder.try_decode().unwrap().expect("complete frame");
        assert_eq!(packet.id, 0x01);
        assert_eq!(packet.params, vec![0x42]);
    }

    #[test]
    fn test_decode_checksum_mismatch_consumes_frame() {
        let mut decoder = FrameDecoder::new();
        let mut bad = make_status(0x01, 0x00, &[0x10, 0x20]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        decoder.push(&bad);
        decoder.push(&make_status(0x02, 0x00, &[]));

        assert!(matches!(
            decoder.try_decode(),
            Err(PacketError::ChecksumMismatch { .. })
        ));
        // The bad frame is gone; the next one decodes normally.
        let packet = decoder.try_decode().unwrap().expect("complete frame");
        assert_eq!(packet.id, 0x02);
    }

    #[test]
    fn test_checksum_detects_param_bit_flips() {
        let frame = make_status(0x01, 0x00, &[0x55, 0xAA]);
        for byte in PKT_PARAMETER0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                let mut decoder = FrameDecoder::new();
                decoder.push(&corrupted);
                assert!(
                    matches!(
                        decoder.try_decode(),
                        Err(PacketError::ChecksumMismatch { .. })
                    ),
                    "flip of byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_corruption_never_yields_original() {
        // Any single-bit flip outside the header either errors, stalls
        // waiting for bytes that never come, or resyncs into nothing. It
        // must never reproduce the original packet.
        let frame = make_status(0x01, 0x00, &[0x55, 0xAA]);
        let mut clean = FrameDecoder::new();
        clean.push(&frame);
        let original = clean.try_decode().unwrap().expect("complete frame");

        for byte in PKT_ID..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                let mut decoder = FrameDecoder::new();
                decoder.push(&corrupted);
                if let Ok(Some(packet)) = decoder.try_decode() {
                    assert_ne!(packet, original, "flip of byte {} bit {}", byte, bit);
                }
            }
        }
    }

    #[test]
    fn test_decode_multiple_frames() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&make_status(0x01, 0x00, &[0x01]));
        decoder.push(&make_status(0x02, 0x00, &[0x02]));

        let first = decoder.try_decode().unwrap().expect("first frame");
        assert_eq!(first.id, 0x01);
        let second = decoder.try_decode().unwrap().expect("second frame");
        assert_eq!(second.id, 0x02);
        assert_eq!(decoder.try_decode().unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0xFF, 0xFF, 0x01]);
        assert_eq!(decoder.buffered_len(), 3);
        decoder.clear();
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.try_decode().unwrap(), None);
    }
}
