//! Motion and status operations for STS/SMS servos.
//!
//! [`StsControl`] extends the bus engine with the register semantics of
//! this servo family: the 7-byte motion command window starting at the
//! acceleration register, sign-magnitude position and speed values, and
//! the EPROM write lock.

use servobus_driver::{Bus, GroupWrite, Port, TransferError};
use servobus_packet::{
    decode_signed, encode_signed, hi_word, lo_word, word_to_bytes, Endian, FaultFlags,
    BROADCAST_ID,
};

use crate::registers;

/// Position and speed registers carry sign-magnitude values with the
/// sign in bit 15.
const SIGN_BIT: u32 = 15;

/// A group write shaped for the motion command window, ready for
/// [`StsControl::stage_position`].
pub fn position_group() -> GroupWrite {
    GroupWrite::new(registers::GOAL_ACC, 7)
}

/// Motion command image: acceleration, goal position, running time
/// (unused, zero), goal speed.
fn position_params(position: i16, speed: u16, acc: u8, endian: Endian) -> [u8; 7] {
    let raw = encode_signed(i32::from(position), SIGN_BIT) as u16;
    let pos = word_to_bytes(raw, endian);
    let spd = word_to_bytes(speed, endian);
    [acc, pos[0], pos[1], 0, 0, spd[0], spd[1]]
}

/// Wheel-mode command image: acceleration, then a signed speed in the
/// goal speed slot.
fn wheel_params(speed: i16, acc: u8, endian: Endian) -> [u8; 7] {
    let raw = encode_signed(i32::from(speed), SIGN_BIT) as u16;
    let spd = word_to_bytes(raw, endian);
    [acc, 0, 0, 0, 0, spd[0], spd[1]]
}

fn to_signed(raw: u16) -> i16 {
    decode_signed(u32::from(raw), SIGN_BIT) as i16
}

/// STS/SMS family operations over a [`Bus`].
pub trait StsControl {
    /// Probe a device and read its model number.
    fn read_model(&mut self, id: u8) -> Result<(u16, FaultFlags), TransferError>;

    /// Command a move to `position` at `speed` with acceleration `acc`,
    /// applied immediately.
    fn write_position(
        &mut self,
        id: u8,
        position: i16,
        speed: u16,
        acc: u8,
    ) -> Result<FaultFlags, TransferError>;

    /// Stage a move that the next [`commit`](StsControl::commit)
    /// applies.
    fn reg_write_position(
        &mut self,
        id: u8,
        position: i16,
        speed: u16,
        acc: u8,
    ) -> Result<FaultFlags, TransferError>;

    /// Apply all staged moves on every device at once.
    fn commit(&mut self) -> Result<(), TransferError>;

    /// Add a move for `id` to a [`position_group`] aggregation. Returns
    /// `false` if the ID is already a member or not addressable.
    fn stage_position(
        &self,
        group: &mut GroupWrite,
        id: u8,
        position: i16,
        speed: u16,
        acc: u8,
    ) -> bool;

    /// Current position.
    fn read_position(&mut self, id: u8) -> Result<(i16, FaultFlags), TransferError>;

    /// Current speed.
    fn read_speed(&mut self, id: u8) -> Result<(i16, FaultFlags), TransferError>;

    /// Current position and speed from one transaction.
    fn read_position_speed(&mut self, id: u8) -> Result<((i16, i16), FaultFlags), TransferError>;

    /// Whether a commanded motion is still in progress.
    fn read_moving(&mut self, id: u8) -> Result<(bool, FaultFlags), TransferError>;

    /// Switch the device to continuous wheel mode.
    fn wheel_mode(&mut self, id: u8) -> Result<FaultFlags, TransferError>;

    /// Command a wheel-mode rotation speed; negative reverses.
    fn write_wheel_speed(
        &mut self,
        id: u8,
        speed: i16,
        acc: u8,
    ) -> Result<FaultFlags, TransferError>;

    /// Lock the EPROM registers against writes.
    fn lock_eprom(&mut self, id: u8) -> Result<FaultFlags, TransferError>;

    /// Unlock the EPROM registers for writing.
    fn unlock_eprom(&mut self, id: u8) -> Result<FaultFlags, TransferError>;
}

impl<P: Port> StsControl for Bus<P> {
    fn read_model(&mut self, id: u8) -> Result<(u16, FaultFlags), TransferError> {
        self.ping(id)?;
        self.read_u16(id, registers::MODEL)
    }

    fn write_position(
        &mut self,
        id: u8,
        position: i16,
        speed: u16,
        acc: u8,
    ) -> Result<FaultFlags, TransferError> {
        let params = position_params(position, speed, acc, self.endian());
        self.write(id, registers::GOAL_ACC, &params)
    }

    fn reg_write_position(
        &mut self,
        id: u8,
        position: i16,
        speed: u16,
        acc: u8,
    ) -> Result<FaultFlags, TransferError> {
        let params = position_params(position, speed, acc, self.endian());
        self.reg_write(id, registers::GOAL_ACC, &params)
    }

    fn commit(&mut self) -> Result<(), TransferError> {
        self.action(BROADCAST_ID)?;
        Ok(())
    }

    fn stage_position(
        &self,
        group: &mut GroupWrite,
        id: u8,
        position: i16,
        speed: u16,
        acc: u8,
    ) -> bool {
        group.add(id, &position_params(position, speed, acc, self.endian()))
    }

    fn read_position(&mut self, id: u8) -> Result<(i16, FaultFlags), TransferError> {
        let (raw, faults) = self.read_u16(id, registers::PRESENT_POSITION)?;
        Ok((to_signed(raw), faults))
    }

    fn read_speed(&mut self, id: u8) -> Result<(i16, FaultFlags), TransferError> {
        let (raw, faults) = self.read_u16(id, registers::PRESENT_SPEED)?;
        Ok((to_signed(raw), faults))
    }

    fn read_position_speed(&mut self, id: u8) -> Result<((i16, i16), FaultFlags), TransferError> {
        let (raw, faults) = self.read_u32(id, registers::PRESENT_POSITION)?;
        let position = to_signed(lo_word(raw));
        let speed = to_signed(hi_word(raw));
        Ok(((position, speed), faults))
    }

    fn read_moving(&mut self, id: u8) -> Result<(bool, FaultFlags), TransferError> {
        let (raw, faults) = self.read_u8(id, registers::MOVING)?;
        Ok((raw != 0, faults))
    }

    fn wheel_mode(&mut self, id: u8) -> Result<FaultFlags, TransferError> {
        self.write_u8(id, registers::MODE, 1)
    }

    fn write_wheel_speed(
        &mut self,
        id: u8,
        speed: i16,
        acc: u8,
    ) -> Result<FaultFlags, TransferError> {
        let params = wheel_params(speed, acc, self.endian());
        self.write(id, registers::GOAL_ACC, &params)
    }

    fn lock_eprom(&mut self, id: u8) -> Result<FaultFlags, TransferError> {
        self.write_u8(id, registers::LOCK, 1)
    }

    fn unlock_eprom(&mut self, id: u8) -> Result<FaultFlags, TransferError> {
        self.write_u8(id, registers::LOCK, 0)
    }
}
