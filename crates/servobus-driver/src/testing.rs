//! Scripted channel for tests.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::port::Port;

/// An in-memory [`Port`] with scripted replies and a virtual clock.
///
/// Bytes staged with [`stage_reply`](MockPort::stage_reply) become readable
/// after the next write, the way a device answers the request that was just
/// put on the wire. This also keeps staged bytes safe from the engine's
/// pre-send input flush. One staged entry surfaces per write, so a test
/// scripts one entry per expected transaction.
///
/// The clock is virtual: it advances by `auto_advance` on every read poll
/// and by [`advance`](MockPort::advance), making timeout behavior exact in
/// tests.
#[derive(Debug)]
pub struct MockPort {
    open: bool,
    baud: u32,
    clock: Duration,
    auto_advance: Duration,
    rx: VecDeque<u8>,
    staged: VecDeque<Vec<u8>>,
    tx: Vec<u8>,
    write_limit: Option<usize>,
    fail_reads: bool,
}

impl MockPort {
    /// Create an open mock port at 1 Mbaud.
    pub fn new() -> Self {
        MockPort {
            open: true,
            baud: 1_000_000,
            clock: Duration::ZERO,
            auto_advance: Duration::from_micros(100),
            rx: VecDeque::new(),
            staged: VecDeque::new(),
            tx: Vec::new(),
            write_limit: None,
            fail_reads: false,
        }
    }

    /// Stage bytes that become readable after the next write.
    pub fn stage_reply(&mut self, data: &[u8]) {
        self.staged.push_back(data.to_vec());
    }

    /// Make bytes readable immediately, bypassing the staging queue.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// All bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Drain and return the bytes written so far.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Move the virtual clock forward.
    pub fn advance(&mut self, delta: Duration) {
        self.clock += delta;
    }

    /// Set how far the clock moves on each read poll.
    pub fn set_auto_advance(&mut self, delta: Duration) {
        self.auto_advance = delta;
    }

    /// Cap the number of bytes accepted per write. `None` accepts all.
    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.write_limit = limit;
    }

    /// Make subsequent reads fail with an I/O error.
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Change the simulated baud rate.
    pub fn set_baud(&mut self, baud: u32) {
        self.baud = baud;
    }
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for MockPort {
    fn open(&mut self) -> io::Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn clear_input(&mut self) {
        // Staged replies model future bus traffic, not buffered bytes, so
        // they survive the flush.
        self.rx.clear();
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port not open"));
        }
        let take = self.write_limit.unwrap_or(data.len()).min(data.len());
        self.tx.extend_from_slice(&data[..take]);
        if let Some(reply) = self.staged.pop_front() {
            self.rx.extend(reply);
        }
        Ok(take)
    }

    fn read(&mut self, max: usize) -> io::Result<Vec<u8>> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port not open"));
        }
        if self.fail_reads {
            return Err(io::Error::other("scripted read failure"));
        }
        self.clock += self.auto_advance;
        let take = self.rx.len().min(max);
        Ok(self.rx.drain(..take).collect())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn now(&self) -> Duration {
        self.clock
    }

    fn baud(&self) -> u32 {
        self.baud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_reply_surfaces_after_write() {
        let mut port = MockPort::new();
        port.stage_reply(&[0xAA, 0xBB]);

        // Nothing readable until the request goes out.
        assert_eq!(port.read(16).unwrap(), Vec::<u8>::new());
        port.write(&[0x01]).unwrap();
        assert_eq!(port.read(16).unwrap(), vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_staged_reply_survives_flush() {
        let mut port = MockPort::new();
        port.push_rx(&[0x11]);
        port.stage_reply(&[0x22]);

        port.clear_input();
        port.write(&[0x01]).unwrap();
        assert_eq!(port.read(16).unwrap(), vec![0x22]);
    }

    #[test]
    fn test_clock_advances_per_poll() {
        let mut port = MockPort::new();
        port.set_auto_advance(Duration::from_millis(1));
        assert_eq!(port.now(), Duration::ZERO);
        port.read(16).unwrap();
        port.read(16).unwrap();
        assert_eq!(port.now(), Duration::from_millis(2));
    }

    #[test]
    fn test_write_limit() {
        let mut port = MockPort::new();
        port.set_write_limit(Some(3));
        assert_eq!(port.write(&[1, 2, 3, 4, 5]).unwrap(), 3);
        assert_eq!(port.written(), &[1, 2, 3]);
    }
}
