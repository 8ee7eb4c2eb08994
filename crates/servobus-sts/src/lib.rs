//! Control layer for STS/SMS series serial bus servos.
//!
//! Builds the register semantics of this servo family on top of the
//! generic bus engine: motion commands through the 7-byte window at the
//! acceleration register, sign-magnitude positions and speeds, staged
//! moves applied by a broadcast action, and the EPROM write lock.
//!
//! ```rust,ignore
//! use servobus_driver::{Bus, SerialPort};
//! use servobus_sts::StsControl;
//!
//! let mut bus = Bus::new(SerialPort::new("/dev/ttyUSB0"));
//! bus.open()?;
//! bus.write_position(1, 2048, 1000, 50)?;
//! let (position, _) = bus.read_position(1)?;
//! ```

mod control;
pub mod registers;

pub use control::*;
