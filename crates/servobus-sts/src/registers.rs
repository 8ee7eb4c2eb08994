//! Register map of the STS/SMS servo families.
//!
//! Multi-byte registers are named by their low-byte address and read or
//! written as 16-bit values. EPROM registers persist across power
//! cycles and are writable only while the lock register is cleared;
//! SRAM registers reset on power-up.

// ============================================================================
// EPROM (read only)
// ============================================================================

/// Model number, two bytes.
pub const MODEL: u8 = 3;

// ============================================================================
// EPROM (read/write)
// ============================================================================

/// Device ID on the bus.
pub const ID: u8 = 5;
/// Baud rate selector, one of the `BAUD_*` indices.
pub const BAUD_RATE: u8 = 6;
/// Lower position limit, two bytes.
pub const MIN_ANGLE_LIMIT: u8 = 9;
/// Upper position limit, two bytes.
pub const MAX_ANGLE_LIMIT: u8 = 11;
/// Clockwise dead zone width.
pub const CW_DEAD: u8 = 26;
/// Counter-clockwise dead zone width.
pub const CCW_DEAD: u8 = 27;
/// Position offset calibration, two bytes.
pub const OFS: u8 = 31;
/// Operating mode: 0 position servo, 1 continuous wheel.
pub const MODE: u8 = 33;

// ============================================================================
// SRAM (read/write)
// ============================================================================

/// Torque output switch.
pub const TORQUE_ENABLE: u8 = 40;
/// Motion acceleration. Start of the 7-byte motion command window.
pub const GOAL_ACC: u8 = 41;
/// Target position, two bytes.
pub const GOAL_POSITION: u8 = 42;
/// Motion time, two bytes.
pub const GOAL_TIME: u8 = 44;
/// Target speed, two bytes.
pub const GOAL_SPEED: u8 = 46;
/// EPROM write lock: 1 locked, 0 writable.
pub const LOCK: u8 = 55;

// ============================================================================
// SRAM (read only)
// ============================================================================

/// Current position, two bytes, sign-magnitude.
pub const PRESENT_POSITION: u8 = 56;
/// Current speed, two bytes, sign-magnitude.
pub const PRESENT_SPEED: u8 = 58;
/// Current load, two bytes.
pub const PRESENT_LOAD: u8 = 60;
/// Supply voltage.
pub const PRESENT_VOLTAGE: u8 = 62;
/// Internal temperature.
pub const PRESENT_TEMPERATURE: u8 = 63;
/// Nonzero while a motion is in progress.
pub const MOVING: u8 = 66;
/// Motor current, two bytes.
pub const PRESENT_CURRENT: u8 = 69;

// ============================================================================
// Baud rate selector values
// ============================================================================

pub const BAUD_1M: u8 = 0;
pub const BAUD_500K: u8 = 1;
pub const BAUD_250K: u8 = 2;
pub const BAUD_128K: u8 = 3;
pub const BAUD_115200: u8 = 4;
pub const BAUD_76800: u8 = 5;
pub const BAUD_57600: u8 = 6;
pub const BAUD_38400: u8 = 7;
