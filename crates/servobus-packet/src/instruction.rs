//! Instruction packet encoding.

use crate::constants::*;
use crate::error::PacketError;
use crate::frame::checksum;

/// Instructions the master can issue to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Probe a device for reachability.
    Ping,
    /// Read a span of the register map.
    Read,
    /// Write a span of the register map, applied immediately.
    Write,
    /// Stage a register write, applied by a later [`Instruction::Action`].
    RegWrite,
    /// Apply all staged register writes.
    Action,
    /// Restore factory register defaults.
    Reset,
    /// Recalibrate the position offset against a reference position.
    Calibrate,
    /// Read the same register span from several devices in one exchange.
    SyncRead,
    /// Write per-device payloads to the same register span in one packet.
    SyncWrite,
}

impl Instruction {
    /// Wire opcode for this instruction.
    pub fn opcode(self) -> u8 {
        match self {
            Instruction::Ping => INST_PING,
            Instruction::Read => INST_READ,
            Instruction::Write => INST_WRITE,
            Instruction::RegWrite => INST_REG_WRITE,
            Instruction::Action => INST_ACTION,
            Instruction::Reset => INST_RESET,
            Instruction::Calibrate => INST_CALIBRATE,
            Instruction::SyncRead => INST_SYNC_READ,
            Instruction::SyncWrite => INST_SYNC_WRITE,
        }
    }
}

/// Encode a complete instruction packet.
///
/// The length field counts the instruction byte, the parameters and the
/// checksum. Packets that would exceed [`MAX_PACKET_LEN`] are rejected
/// without truncation.
pub fn encode_instruction(
    id: u8,
    instruction: Instruction,
    params: &[u8],
) -> Result<Vec<u8>, PacketError> {
    let total = params.len() + MIN_PACKET_LEN;
    if total > MAX_PACKET_LEN {
        return Err(PacketError::Oversize {
            len: total,
            max: MAX_PACKET_LEN,
        });
    }

    let mut packet = Vec::with_capacity(total);
    packet.push(HEADER_BYTE);
    packet.push(HEADER_BYTE);
    packet.push(id);
    packet.push((params.len() + 2) as u8);
    packet.push(instruction.opcode());
    packet.extend_from_slice(params);
    // Checksum covers everything after the two header bytes.
    packet.push(checksum(&packet[PKT_ID..]));
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ping() {
        let packet = encode_instruction(0x01, Instruction::Ping, &[]).unwrap();
        assert_eq!(packet, vec![0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
    }

    #[test]
    fn test_encode_read() {
        // Read 2 bytes starting at register 0x38.
        let packet = encode_instruction(0x01, Instruction::Read, &[0x38, 0x02]).unwrap();
        assert_eq!(packet[2], 0x01);
        assert_eq!(packet[3], 0x04); // 2 params + 2
        assert_eq!(packet[4], INST_READ);
        assert_eq!(&packet[5..7], &[0x38, 0x02]);
        assert_eq!(packet.len(), 8);
        // Verify the trailing checksum against a recomputation.
        assert_eq!(packet[7], checksum(&packet[2..7]));
    }

    #[test]
    fn test_encode_length_field() {
        let packet = encode_instruction(0x05, Instruction::Write, &[0x2A, 0xD0, 0x07]).unwrap();
        assert_eq!(packet[PKT_LENGTH] as usize, 3 + 2);
        assert_eq!(packet.len(), 3 + MIN_PACKET_LEN);
    }

    #[test]
    fn test_encode_oversize() {
        // 244 parameters is the largest payload that still fits.
        let params = vec![0u8; MAX_PACKET_LEN - MIN_PACKET_LEN];
        assert!(encode_instruction(0x01, Instruction::Write, &params).is_ok());

        let params = vec![0u8; MAX_PACKET_LEN - MIN_PACKET_LEN + 1];
        let err = encode_instruction(0x01, Instruction::Write, &params).unwrap_err();
        assert_eq!(
            err,
            PacketError::Oversize {
                len: MAX_PACKET_LEN + 1,
                max: MAX_PACKET_LEN,
            }
        );
    }

    #[test]
    fn test_opcodes() {
        assert_eq!(Instruction::Ping.opcode(), 0x01);
        assert_eq!(Instruction::SyncRead.opcode(), 0x82);
        assert_eq!(Instruction::SyncWrite.opcode(), 0x83);
        assert_eq!(Instruction::Reset.opcode(), 0x0A);
        assert_eq!(Instruction::Calibrate.opcode(), 0x0B);
    }
}
