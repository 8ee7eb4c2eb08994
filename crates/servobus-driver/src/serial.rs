//! Serial channel implementation.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use crate::port::Port;

/// Default baud rate for servo buses.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// A [`Port`] backed by a system serial device.
///
/// The device is configured for 8 data bits, no parity, one stop bit.
/// Reads are non-blocking: only bytes already buffered by the OS driver
/// are returned.
pub struct SerialPort {
    path: String,
    baud: u32,
    handle: Option<Box<dyn serialport::SerialPort>>,
    origin: Instant,
}

impl SerialPort {
    /// Create an unopened port on `path` at [`DEFAULT_BAUD_RATE`].
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_baud(path, DEFAULT_BAUD_RATE)
    }

    /// Create an unopened port on `path` at `baud`.
    pub fn with_baud(path: impl Into<String>, baud: u32) -> Self {
        SerialPort {
            path: path.into(),
            baud,
            handle: None,
            origin: Instant::now(),
        }
    }

    /// Device path this port attaches to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Change the baud rate, reconfiguring the device if it is open.
    pub fn set_baud_rate(&mut self, baud: u32) -> io::Result<()> {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_baud_rate(baud).map_err(io::Error::from)?;
        }
        self.baud = baud;
        Ok(())
    }
}

impl Port for SerialPort {
    fn open(&mut self) -> io::Result<()> {
        let handle = serialport::new(self.path.as_str(), self.baud)
            .timeout(Duration::ZERO)
            .open()
            .map_err(io::Error::from)?;
        log::debug!("opened {} at {} baud", self.path, self.baud);
        self.handle = Some(handle);
        Ok(())
    }

    fn close(&mut self) {
        if self.handle.take().is_some() {
            log::debug!("closed {}", self.path);
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn clear_input(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if let Err(err) = handle.clear(serialport::ClearBuffer::Input) {
                log::warn!("failed to clear input on {}: {}", self.path, err);
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.handle.as_mut() {
            Some(handle) => handle.write(data),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "port not open")),
        }
    }

    fn read(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let handle = match self.handle.as_mut() {
            Some(handle) => handle,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "port not open")),
        };
        let pending = handle.bytes_to_read().map_err(io::Error::from)? as usize;
        let take = pending.min(max);
        if take == 0 {
            return Ok(Vec::new());
        }
        let mut buffer = vec![0u8; take];
        let n = handle.read(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        match self.handle.as_mut() {
            Some(handle) => Ok(handle.bytes_to_read().map_err(io::Error::from)? as usize),
            None => Ok(0),
        }
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn baud(&self) -> u32 {
        self.baud
    }
}
