//! Transfer error types.

use servobus_packet::PacketError;
use thiserror::Error;

/// Errors produced by bus transactions.
///
/// Device-side fault bits are not errors; they travel alongside successful
/// results as [`FaultFlags`](servobus_packet::FaultFlags). Every variant
/// here is terminal for the transaction that produced it; retry policy
/// belongs to the caller.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Another transaction currently owns the port.
    #[error("port is busy with another transaction")]
    PortBusy,

    /// The instruction packet would exceed the wire size limit. Nothing was
    /// written.
    #[error("instruction packet too long: {len} bytes, maximum {max}")]
    TxFormat {
        /// Total packet length that was requested.
        len: usize,
        /// Maximum allowed packet length.
        max: usize,
    },

    /// The channel accepted fewer bytes than the packet holds.
    #[error("short write: {written} of {len} packet bytes accepted")]
    TxFailed {
        /// Bytes the channel actually accepted.
        written: usize,
        /// Total packet length.
        len: usize,
    },

    /// Reading from the channel failed.
    #[error("channel read failed: {0}")]
    RxFailed(#[source] std::io::Error),

    /// A status packet has started to arrive but is not complete yet.
    #[error("status packet reception in progress")]
    RxWaiting,

    /// The response window elapsed without a single byte arriving.
    #[error("timed out waiting for a status packet")]
    RxTimeout,

    /// Bytes arrived but never formed a valid status packet within the
    /// response window.
    #[error("received data did not form a valid status packet")]
    RxCorrupt,

    /// The operation cannot be performed on the addressed target.
    #[error("operation not available for this target")]
    NotAvailable,

    /// Channel setup or I/O error outside the framed exchange.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PacketError> for TransferError {
    fn from(err: PacketError) -> Self {
        match err {
            PacketError::Oversize { len, max } => TransferError::TxFormat { len, max },
            PacketError::ChecksumMismatch { .. } => TransferError::RxCorrupt,
        }
    }
}
