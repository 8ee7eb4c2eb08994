//! Servo Bus Wire Format
//!
//! This crate provides the packet layer for a multidrop, half-duplex serial
//! servo bus: one master, up to 253 addressable devices, a broadcast
//! address, and a single fixed frame layout in both directions.
//!
//! # Protocol Overview
//!
//! Every frame is `[0xFF, 0xFF, id, len, code, params.., checksum]` where
//! `code` is an instruction opcode on the way out and a device fault byte on
//! the way back. The checksum is the complement of the 8-bit sum of the
//! bytes between the header and the checksum itself.
//!
//! Instruction packets are built with [`encode_instruction`]; inbound bytes
//! are accumulated in a [`FrameDecoder`], which realigns on the header pair
//! after line noise and rejects frames whose checksum does not match.
//!
//! # Example
//!
//! ```rust,ignore
//! use servobus_packet::{encode_instruction, FrameDecoder, Instruction};
//!
//! // Probe device 1.
//! let packet = encode_instruction(1, Instruction::Ping, &[])?;
//!
//! // Feed back whatever the channel produced.
//! let mut decoder = FrameDecoder::new();
//! decoder.push(&received);
//! if let Some(status) = decoder.try_decode()? {
//!     println!("device {} faults: {}", status.id, status.faults);
//! }
//! ```

mod constants;
mod convert;
mod error;
mod frame;
mod instruction;
mod status;

pub use constants::*;
pub use convert::*;
pub use error::*;
pub use frame::*;
pub use instruction::*;
pub use status::*;
