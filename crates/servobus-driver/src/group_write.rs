//! Aggregated register writes across multiple devices.
//!
//! A [`GroupWrite`] collects per-device payloads for one register window
//! and emits them as a single broadcast sync-write instruction, so every
//! device latches its new values from the same packet.

use servobus_packet::BROADCAST_ID;

use crate::bus::Bus;
use crate::error::TransferError;
use crate::port::Port;

/// One sync-write aggregation: per-device payloads for a fixed register
/// window, sent in a single fire-and-forget bus transaction.
///
/// Members keep their insertion order in the emitted block.
pub struct GroupWrite {
    start_addr: u8,
    data_len: u8,
    members: Vec<(u8, Vec<u8>)>,
    /// Serialized parameter block, rebuilt on the next transmit after a
    /// membership or payload change.
    block: Vec<u8>,
    dirty: bool,
}

impl GroupWrite {
    /// Aggregation over `data_len` register bytes starting at `start_addr`.
    pub fn new(start_addr: u8, data_len: u8) -> Self {
        GroupWrite {
            start_addr,
            data_len,
            members: Vec::new(),
            block: Vec::new(),
            dirty: false,
        }
    }

    /// First register address of the window.
    pub fn start_addr(&self) -> u8 {
        self.start_addr
    }

    /// Width of the window in bytes.
    pub fn data_len(&self) -> u8 {
        self.data_len
    }

    /// Number of member devices.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the aggregation has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a device with its payload. Returns `false` if the ID is
    /// already a member, is not an individual device address, or the
    /// payload exceeds the window width.
    pub fn add(&mut self, id: u8, data: &[u8]) -> bool {
        if id >= BROADCAST_ID
            || data.len() > usize::from(self.data_len)
            || self.members.iter().any(|(m, _)| *m == id)
        {
            return false;
        }
        self.members.push((id, data.to_vec()));
        self.dirty = true;
        true
    }

    /// Replace the payload of an existing member. Returns `false` if the
    /// ID is not a member or the payload exceeds the window width.
    pub fn update(&mut self, id: u8, data: &[u8]) -> bool {
        if data.len() > usize::from(self.data_len) {
            return false;
        }
        match self.members.iter_mut().find(|(m, _)| *m == id) {
            Some((_, payload)) => {
                *payload = data.to_vec();
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Remove a device from the aggregation.
    pub fn remove(&mut self, id: u8) {
        self.members.retain(|(m, _)| *m != id);
        self.dirty = true;
    }

    /// Remove all member devices.
    pub fn clear(&mut self) {
        self.members.clear();
        self.dirty = true;
    }

    /// Broadcast the sync-write block for the current membership.
    pub fn tx<P: Port>(&mut self, bus: &mut Bus<P>) -> Result<(), TransferError> {
        if self.members.is_empty() {
            return Err(TransferError::NotAvailable);
        }
        if self.dirty || self.block.is_empty() {
            self.block.clear();
            self.block
                .reserve(self.members.len() * (usize::from(self.data_len) + 1));
            for (id, payload) in &self.members {
                self.block.push(*id);
                self.block.extend_from_slice(payload);
            }
            self.dirty = false;
        }
        bus.sync_write(self.start_addr, self.data_len, &self.block)
    }
}
