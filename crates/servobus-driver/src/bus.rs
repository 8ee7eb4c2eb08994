//! Bus transaction engine.
//!
//! Every operation is one complete transaction on the shared half-duplex
//! wire:
//!
//! 1. claim the port (fail fast if another transaction holds it),
//! 2. flush stale input and write one instruction packet,
//! 3. unless the target was the broadcast address, poll for the matching
//!    status packet within a baud-derived time budget, discarding
//!    well-formed packets from other devices.
//!
//! The claim is released on every terminal outcome, success or failure.
//! Split operations ([`Bus::read_tx`] / [`Bus::read_rx`] and the sync-read
//! pair) keep the claim across the two halves.

use std::io;
use std::time::Duration;

use servobus_packet::{
    dword_from_bytes, dword_to_bytes, encode_instruction, word_from_bytes, word_to_bytes,
    Endian, FaultFlags, FrameDecoder, Instruction, StatusPacket, BROADCAST_ID, MAX_PACKET_LEN,
    MIN_PACKET_LEN,
};

use crate::error::TransferError;
use crate::port::Port;

/// Response latency allowance added to every receive budget. USB serial
/// adapters commonly hold received bytes for up to their latency timer
/// before surfacing them.
pub const LATENCY_TIMER: Duration = Duration::from_millis(50);

/// Transaction engine for a single servo bus.
///
/// One `Bus` owns one channel. 16-bit register values are packed according
/// to the [`Endian`] mode, which defaults to [`Endian::Little`] (STS/SMS
/// families) and can be switched per instance for SCS-family devices.
pub struct Bus<P: Port> {
    port: P,
    endian: Endian,
    busy: bool,
    decoder: FrameDecoder,
    latency: Duration,
    /// Receive window armed by a split-read transmit: (start, budget).
    pending: Option<(Duration, Duration)>,
}

impl<P: Port> Bus<P> {
    /// Create an engine over `port` in [`Endian::Little`] mode.
    pub fn new(port: P) -> Self {
        Self::with_endian(port, Endian::Little)
    }

    /// Create an engine over `port` with an explicit byte-order mode.
    pub fn with_endian(port: P, endian: Endian) -> Self {
        Bus {
            port,
            endian,
            busy: false,
            decoder: FrameDecoder::new(),
            latency: LATENCY_TIMER,
            pending: None,
        }
    }

    /// Byte order used for 16-bit register values.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the byte order used for 16-bit register values.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Response latency allowance included in every receive budget.
    pub fn latency_timer(&self) -> Duration {
        self.latency
    }

    /// Change the response latency allowance.
    pub fn set_latency_timer(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Open the underlying channel.
    pub fn open(&mut self) -> io::Result<()> {
        self.port.open()
    }

    /// Close the underlying channel.
    pub fn close(&mut self) {
        self.port.close();
    }

    /// Shared access to the underlying channel.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Exclusive access to the underlying channel.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the engine, returning the channel.
    pub fn into_port(self) -> P {
        self.port
    }

    // ========================================================================
    // Core transaction
    // ========================================================================

    /// One complete transaction: send the instruction and, unless `id` is
    /// the broadcast address, wait for the matching status packet.
    ///
    /// Broadcast targets return `Ok(None)` immediately after the write;
    /// no device replies to a broadcast.
    pub fn transfer(
        &mut self,
        id: u8,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<Option<StatusPacket>, TransferError> {
        if id > BROADCAST_ID {
            return Err(TransferError::NotAvailable);
        }
        self.send(id, instruction, params)?;
        if id == BROADCAST_ID {
            self.busy = false;
            return Ok(None);
        }

        // A read reply carries the requested payload; everything else
        // acknowledges with a minimum-size packet.
        let expected = match instruction {
            Instruction::Read if params.len() >= 2 => params[1] as usize,
            _ => 0,
        };
        let start = self.port.now();
        let budget = self.receive_budget(expected + MIN_PACKET_LEN);
        self.receive(id, start, budget).map(Some)
    }

    /// Claim the port and put one instruction packet on the wire. On
    /// success the claim is still held; the caller releases it or follows
    /// up with a receive.
    fn send(
        &mut self,
        id: u8,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<(), TransferError> {
        if self.busy {
            log::debug!("rejecting {:?} to {}: port busy", instruction, id);
            return Err(TransferError::PortBusy);
        }
        self.busy = true;

        let packet = match encode_instruction(id, instruction, params) {
            Ok(packet) => packet,
            Err(err) => {
                self.busy = false;
                return Err(err.into());
            }
        };

        // Stale bytes from an earlier exchange must not leak into this one.
        self.port.clear_input();
        log::trace!("tx {:?} to {}: {:02X?}", instruction, id, packet);
        match self.port.write(&packet) {
            Ok(written) if written == packet.len() => Ok(()),
            Ok(written) => {
                self.busy = false;
                Err(TransferError::TxFailed {
                    written,
                    len: packet.len(),
                })
            }
            Err(err) => {
                self.busy = false;
                Err(TransferError::Io(err))
            }
        }
    }

    /// Poll for one status packet from `id` within `budget` measured from
    /// `start`. Well-formed packets from other devices are discarded
    /// without extending the window. Releases the port claim on every
    /// outcome.
    fn receive(
        &mut self,
        id: u8,
        start: Duration,
        budget: Duration,
    ) -> Result<StatusPacket, TransferError> {
        self.decoder.clear();
        let mut received = 0usize;
        loop {
            let chunk = match self.port.read(MAX_PACKET_LEN) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.busy = false;
                    return Err(TransferError::RxFailed(err));
                }
            };
            if !chunk.is_empty() {
                received += chunk.len();
                self.decoder.push(&chunk);
                loop {
                    match self.decoder.try_decode() {
                        Ok(Some(packet)) if packet.id == id => {
                            self.busy = false;
                            log::trace!(
                                "rx from {}: faults [{}], {} param bytes",
                                packet.id,
                                packet.faults,
                                packet.params.len()
                            );
                            return Ok(packet);
                        }
                        Ok(Some(packet)) => {
                            log::debug!(
                                "discarding status from {} while waiting for {}",
                                packet.id,
                                id
                            );
                        }
                        Ok(None) => break,
                        Err(err) => {
                            self.busy = false;
                            log::debug!("receive from {} failed: {}", id, err);
                            return Err(err.into());
                        }
                    }
                }
            }
            if self.port.now().saturating_sub(start) >= budget {
                self.busy = false;
                log::debug!(
                    "receive from {} timed out after {:?} ({} bytes seen)",
                    id,
                    budget,
                    received
                );
                return Err(if received == 0 {
                    TransferError::RxTimeout
                } else {
                    TransferError::RxCorrupt
                });
            }
        }
    }

    /// Receive budget for `packet_length` wire bytes: transmission time
    /// plus a three-byte margin plus the latency allowance.
    fn receive_budget(&self, packet_length: usize) -> Duration {
        let byte = self.port.byte_duration();
        byte * (packet_length as u32) + byte * 3 + self.latency
    }

    /// Transaction against one individually addressed device.
    fn exchange(
        &mut self,
        id: u8,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<StatusPacket, TransferError> {
        if id >= BROADCAST_ID {
            return Err(TransferError::NotAvailable);
        }
        match self.transfer(id, instruction, params)? {
            Some(status) => Ok(status),
            // transfer only short-circuits for broadcast, rejected above.
            None => Err(TransferError::NotAvailable),
        }
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    /// Probe a device. A reply is required, so the broadcast address is
    /// not a valid target.
    pub fn ping(&mut self, id: u8) -> Result<FaultFlags, TransferError> {
        let status = self.exchange(id, Instruction::Ping, &[])?;
        Ok(status.faults)
    }

    /// Read `len` bytes of the register map starting at `addr`.
    ///
    /// The reply must carry exactly `len` parameter bytes; anything else
    /// counts as a corrupt response.
    pub fn read(&mut self, id: u8, addr: u8, len: u8) -> Result<(Vec<u8>, FaultFlags), TransferError> {
        let status = self.exchange(id, Instruction::Read, &[addr, len])?;
        if status.params.len() != len as usize {
            log::debug!(
                "read reply from {}: {} bytes, wanted {}",
                id,
                status.params.len(),
                len
            );
            return Err(TransferError::RxCorrupt);
        }
        Ok((status.params, status.faults))
    }

    /// Read a single register byte.
    pub fn read_u8(&mut self, id: u8, addr: u8) -> Result<(u8, FaultFlags), TransferError> {
        let (data, faults) = self.read(id, addr, 1)?;
        Ok((data[0], faults))
    }

    /// Read a 16-bit register value in the configured byte order.
    pub fn read_u16(&mut self, id: u8, addr: u8) -> Result<(u16, FaultFlags), TransferError> {
        let endian = self.endian;
        let (data, faults) = self.read(id, addr, 2)?;
        Ok((word_from_bytes(data[0], data[1], endian), faults))
    }

    /// Read a 32-bit register value in the configured byte order.
    pub fn read_u32(&mut self, id: u8, addr: u8) -> Result<(u32, FaultFlags), TransferError> {
        let endian = self.endian;
        let (data, faults) = self.read(id, addr, 4)?;
        Ok((
            dword_from_bytes([data[0], data[1], data[2], data[3]], endian),
            faults,
        ))
    }

    /// Write `data` to the register map starting at `addr`, applied
    /// immediately. Broadcast writes reach every device and report no
    /// faults.
    pub fn write(&mut self, id: u8, addr: u8, data: &[u8]) -> Result<FaultFlags, TransferError> {
        let params = write_params(addr, data);
        Ok(acked(self.transfer(id, Instruction::Write, &params)?))
    }

    /// Write a single register byte.
    pub fn write_u8(&mut self, id: u8, addr: u8, value: u8) -> Result<FaultFlags, TransferError> {
        self.write(id, addr, &[value])
    }

    /// Write a 16-bit register value in the configured byte order.
    pub fn write_u16(&mut self, id: u8, addr: u8, value: u16) -> Result<FaultFlags, TransferError> {
        let bytes = word_to_bytes(value, self.endian);
        self.write(id, addr, &bytes)
    }

    /// Write a 32-bit register value in the configured byte order.
    pub fn write_u32(&mut self, id: u8, addr: u8, value: u32) -> Result<FaultFlags, TransferError> {
        let bytes = dword_to_bytes(value, self.endian);
        self.write(id, addr, &bytes)
    }

    /// Write without waiting for an acknowledgement, releasing the port as
    /// soon as the packet is on the wire.
    pub fn write_only(&mut self, id: u8, addr: u8, data: &[u8]) -> Result<(), TransferError> {
        if id > BROADCAST_ID {
            return Err(TransferError::NotAvailable);
        }
        let params = write_params(addr, data);
        self.send(id, Instruction::Write, &params)?;
        self.busy = false;
        Ok(())
    }

    /// Stage a write that a later [`action`](Bus::action) applies.
    pub fn reg_write(&mut self, id: u8, addr: u8, data: &[u8]) -> Result<FaultFlags, TransferError> {
        let params = write_params(addr, data);
        Ok(acked(self.transfer(id, Instruction::RegWrite, &params)?))
    }

    /// Stage a write without waiting for an acknowledgement.
    pub fn reg_write_only(&mut self, id: u8, addr: u8, data: &[u8]) -> Result<(), TransferError> {
        if id > BROADCAST_ID {
            return Err(TransferError::NotAvailable);
        }
        let params = write_params(addr, data);
        self.send(id, Instruction::RegWrite, &params)?;
        self.busy = false;
        Ok(())
    }

    /// Apply all staged writes on `id`, typically the broadcast address so
    /// every device moves on the same instant.
    pub fn action(&mut self, id: u8) -> Result<FaultFlags, TransferError> {
        Ok(acked(self.transfer(id, Instruction::Action, &[])?))
    }

    /// Restore factory register defaults. Addressed to one device; the
    /// broadcast address is rejected.
    pub fn reset(&mut self, id: u8) -> Result<FaultFlags, TransferError> {
        let status = self.exchange(id, Instruction::Reset, &[])?;
        Ok(status.faults)
    }

    /// Recalibrate the position offset so the current position reads as
    /// `position`. Addressed to one device; the broadcast address is
    /// rejected.
    pub fn calibrate(&mut self, id: u8, position: u16) -> Result<FaultFlags, TransferError> {
        let params = word_to_bytes(position, self.endian);
        let status = self.exchange(id, Instruction::Calibrate, &params)?;
        Ok(status.faults)
    }

    // ========================================================================
    // Split transactions
    // ========================================================================

    /// Send a read instruction without receiving. The port stays claimed
    /// and the receive window starts now; complete the transaction with
    /// [`read_rx`](Bus::read_rx).
    pub fn read_tx(&mut self, id: u8, addr: u8, len: u8) -> Result<(), TransferError> {
        if id >= BROADCAST_ID {
            return Err(TransferError::NotAvailable);
        }
        self.send(id, Instruction::Read, &[addr, len])?;
        let start = self.port.now();
        let budget = self.receive_budget(len as usize + MIN_PACKET_LEN);
        self.pending = Some((start, budget));
        Ok(())
    }

    /// Receive the reply to an earlier [`read_tx`](Bus::read_tx). The
    /// window armed at transmit time still applies; calling this without a
    /// preceding transmit waits a fresh minimum window.
    pub fn read_rx(&mut self, id: u8, len: u8) -> Result<(Vec<u8>, FaultFlags), TransferError> {
        let (start, budget) = match self.pending.take() {
            Some(window) => window,
            None => {
                let start = self.port.now();
                (start, self.receive_budget(len as usize + MIN_PACKET_LEN))
            }
        };
        let status = self.receive(id, start, budget)?;
        if status.params.len() != len as usize {
            return Err(TransferError::RxCorrupt);
        }
        Ok((status.params, status.faults))
    }

    // ========================================================================
    // Sync primitives (used by the group aggregators)
    // ========================================================================

    /// Broadcast one sync-read instruction for `data_len` bytes at
    /// `start_addr` from every device in `ids`. The port stays claimed;
    /// follow with [`sync_read_rx`](Bus::sync_read_rx).
    pub fn sync_read_tx(
        &mut self,
        start_addr: u8,
        data_len: u8,
        ids: &[u8],
    ) -> Result<(), TransferError> {
        let mut params = Vec::with_capacity(ids.len() + 2);
        params.push(start_addr);
        params.push(data_len);
        params.extend_from_slice(ids);
        self.send(BROADCAST_ID, Instruction::SyncRead, &params)
    }

    /// Accumulate the aggregated reply block of a sync read: `count`
    /// status packets of `data_len` payload bytes each.
    ///
    /// Returns the raw bytes once they are all present, or whatever
    /// arrived when the window closed. `RxTimeout` only if nothing at all
    /// arrived. Releases the port claim on every outcome.
    pub fn sync_read_rx(&mut self, data_len: u8, count: usize) -> Result<Vec<u8>, TransferError> {
        let wait = (MIN_PACKET_LEN + data_len as usize) * count;
        let start = self.port.now();
        let budget = self.receive_budget(wait);
        let mut raw: Vec<u8> = Vec::with_capacity(wait);
        loop {
            let chunk = match self.port.read(wait - raw.len()) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.busy = false;
                    return Err(TransferError::RxFailed(err));
                }
            };
            raw.extend_from_slice(&chunk);
            if raw.len() >= wait {
                break;
            }
            if self.port.now().saturating_sub(start) >= budget {
                if raw.is_empty() {
                    self.busy = false;
                    log::debug!("sync read timed out with nothing received");
                    return Err(TransferError::RxTimeout);
                }
                log::debug!(
                    "sync read window closed with {} of {} bytes",
                    raw.len(),
                    wait
                );
                break;
            }
        }
        self.busy = false;
        Ok(raw)
    }

    /// Broadcast one sync-write block: per-device payloads for `data_len`
    /// bytes at `start_addr`, concatenated as `id` followed by payload.
    /// Fire-and-forget; no device replies.
    pub fn sync_write(
        &mut self,
        start_addr: u8,
        data_len: u8,
        block: &[u8],
    ) -> Result<(), TransferError> {
        let mut params = Vec::with_capacity(block.len() + 2);
        params.push(start_addr);
        params.push(data_len);
        params.extend_from_slice(block);
        self.transfer(BROADCAST_ID, Instruction::SyncWrite, &params)?;
        Ok(())
    }
}

/// Parameter image of a write: target address followed by the payload.
fn write_params(addr: u8, data: &[u8]) -> Vec<u8> {
    let mut params = Vec::with_capacity(data.len() + 1);
    params.push(addr);
    params.extend_from_slice(data);
    params
}

/// Faults from an acknowledged exchange; broadcasts produce none.
fn acked(status: Option<StatusPacket>) -> FaultFlags {
    match status {
        Some(status) => status.faults,
        None => FaultFlags::NONE,
    }
}
