//! Channel abstraction.
//!
//! The engine talks to the bus through the [`Port`] trait: a half-duplex
//! byte pipe plus the monotonic clock used for receive budgets. The real
//! implementation is [`SerialPort`](crate::SerialPort); tests use
//! [`MockPort`](crate::testing::MockPort).

use std::io;
use std::time::Duration;

/// A half-duplex byte channel with a monotonic clock.
///
/// Implementations are driven from a single thread; reads must never block
/// and writes report how many bytes the channel accepted.
pub trait Port {
    /// Open the channel with its current configuration.
    fn open(&mut self) -> io::Result<()>;

    /// Close the channel. Closing an already closed channel is a no-op.
    fn close(&mut self);

    /// True while the channel is open.
    fn is_open(&self) -> bool;

    /// Discard any unread bytes buffered on the channel.
    fn clear_input(&mut self);

    /// Write bytes, returning how many the channel accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read up to `max` already-buffered bytes without blocking. An empty
    /// result means nothing is pending.
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Monotonic time since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Configured baud rate.
    fn baud(&self) -> u32;

    /// Wire time of one byte at the configured baud rate: ten bit times
    /// (start, eight data, stop).
    fn byte_duration(&self) -> Duration {
        Duration::from_nanos(10_000_000_000 / u64::from(self.baud()))
    }
}
