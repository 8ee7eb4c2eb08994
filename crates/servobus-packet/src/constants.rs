//! Protocol constants
//!
//! These constants define the packet layout, addressing rules, instruction
//! codes and device fault bits used on the servo bus.

// ============================================================================
// Packet Layout
// ============================================================================

/// Header byte; every packet starts with two of these.
pub const HEADER_BYTE: u8 = 0xFF;
/// Byte offset of the device address field.
pub const PKT_ID: usize = 2;
/// Byte offset of the length field.
pub const PKT_LENGTH: usize = 3;
/// Byte offset of the instruction field (outbound packets).
pub const PKT_INSTRUCTION: usize = 4;
/// Byte offset of the fault field (inbound status packets).
pub const PKT_ERROR: usize = 4;
/// Byte offset of the first parameter.
pub const PKT_PARAMETER0: usize = 5;

// ============================================================================
// Size Limits
// ============================================================================

/// Maximum total packet size in bytes.
pub const MAX_PACKET_LEN: usize = 250;
/// Minimum total packet size in bytes (zero parameters).
pub const MIN_PACKET_LEN: usize = 6;
/// Upper bound on the instruction/fault field; bit 7 is never set in a
/// well-formed frame.
pub const MAX_STATUS_VALUE: u8 = 0x7F;

// ============================================================================
// Addressing
// ============================================================================

/// Highest individually addressable device id.
pub const MAX_DEVICE_ID: u8 = 0xFD;
/// Broadcast address; every device accepts the packet, none replies.
pub const BROADCAST_ID: u8 = 0xFE;

// ============================================================================
// Instruction Codes (master → device)
// ============================================================================

/// Reachability probe; the device answers with an empty status packet.
pub const INST_PING: u8 = 0x01;
/// Read a span of the register map.
pub const INST_READ: u8 = 0x02;
/// Write a span of the register map, applied immediately.
pub const INST_WRITE: u8 = 0x03;
/// Stage a register write to be applied by a later ACTION.
pub const INST_REG_WRITE: u8 = 0x04;
/// Apply all staged register writes.
pub const INST_ACTION: u8 = 0x05;
/// Restore factory register defaults.
pub const INST_RESET: u8 = 0x0A;
/// Recalibrate the position offset against a reference position.
pub const INST_CALIBRATE: u8 = 0x0B;
/// Read the same register span from several devices in one exchange.
pub const INST_SYNC_READ: u8 = 0x82;
/// Write per-device payloads to the same register span in one packet.
pub const INST_SYNC_WRITE: u8 = 0x83;

// ============================================================================
// Device Fault Bits (status packet byte 4)
// ============================================================================

/// Supply voltage outside the configured limits.
pub const FAULT_VOLTAGE: u8 = 0x01;
/// Position reading outside the configured angle limits.
pub const FAULT_ANGLE: u8 = 0x02;
/// Internal temperature above the configured limit.
pub const FAULT_OVERHEAT: u8 = 0x04;
/// Phase current above the configured limit.
pub const FAULT_OVERCURRENT: u8 = 0x08;
/// Output load above the configured limit.
pub const FAULT_OVERLOAD: u8 = 0x20;
