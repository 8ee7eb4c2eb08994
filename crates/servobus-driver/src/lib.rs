//! Master-side driver for a multidrop half-duplex servo bus.
//!
//! The [`Bus`] engine serializes complete request/response transactions
//! over a [`Port`]: claim the wire, send one instruction packet, then
//! poll for the matching status packet within a baud-derived time
//! budget. [`GroupRead`] and [`GroupWrite`] batch a register window
//! across many devices into a single broadcast transaction.
//!
//! ```rust,ignore
//! use servobus_driver::{Bus, SerialPort};
//!
//! let mut bus = Bus::new(SerialPort::new("/dev/ttyUSB0"));
//! bus.open()?;
//! let faults = bus.ping(1)?;
//! let (position, _) = bus.read_u16(1, 56)?;
//! ```

mod bus;
mod error;
mod group_read;
mod group_write;
mod port;
mod serial;
pub mod testing;

pub use bus::*;
pub use error::*;
pub use group_read::*;
pub use group_write::*;
pub use port::*;
pub use serial::*;
