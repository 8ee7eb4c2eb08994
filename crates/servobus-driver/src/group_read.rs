//! Aggregated register reads across multiple devices.
//!
//! A [`GroupRead`] names a register window and a set of device IDs. One
//! broadcast sync-read instruction solicits a reply from every member;
//! the replies arrive back-to-back in one receive window and are
//! demultiplexed by device ID, so member results are independent of the
//! order devices answered in.

use servobus_packet::{
    checksum, dword_from_bytes, word_from_bytes, Endian, FaultFlags, BROADCAST_ID, HEADER_BYTE,
    MAX_STATUS_VALUE, MIN_PACKET_LEN,
};

use crate::bus::Bus;
use crate::error::TransferError;
use crate::port::Port;

struct Member {
    id: u8,
    reply: Option<Reply>,
}

struct Reply {
    faults: FaultFlags,
    data: Vec<u8>,
}

/// One sync-read aggregation: a fixed register window read from a set of
/// devices in a single bus transaction.
///
/// Membership is edited between transactions with [`add`](GroupRead::add)
/// and [`remove`](GroupRead::remove); [`tx_rx`](GroupRead::tx_rx) runs the
/// transaction and the `data_*` accessors expose per-member results.
pub struct GroupRead {
    start_addr: u8,
    data_len: u8,
    members: Vec<Member>,
    /// Serialized member list, rebuilt on the next transmit after a
    /// membership change.
    param: Vec<u8>,
    dirty: bool,
    raw: Vec<u8>,
    endian: Endian,
}

impl GroupRead {
    /// Aggregation over `data_len` register bytes starting at `start_addr`.
    pub fn new(start_addr: u8, data_len: u8) -> Self {
        GroupRead {
            start_addr,
            data_len,
            members: Vec::new(),
            param: Vec::new(),
            dirty: false,
            raw: Vec::new(),
            endian: Endian::Little,
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

    /// Add a device to the aggregation. Returns `false` if the ID is
    /// already a member or is not an individual device address.
    pub fn add(&mut self, id: u8) -> bool {
        if id >= BROADCAST_ID || self.members.iter().any(|m| m.id == id) {
            return false;
        }
        self.members.push(Member { id, reply: None });
        self.dirty = true;
        true
    }

    /// Remove a device from the aggregation. Returns `false` if the ID
    /// was not a member.
    pub fn remove(&mut self, id: u8) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id != id);
        self.dirty = true;
        self.members.len() != before
    }

    /// Remove all member devices.
    pub fn clear(&mut self) {
        self.members.clear();
        self.dirty = true;
    }

    /// Broadcast the sync-read instruction for the current membership.
    /// The port stays claimed for [`rx`](GroupRead::rx).
    pub fn tx<P: Port>(&mut self, bus: &mut Bus<P>) -> Result<(), TransferError> {
        if self.members.is_empty() {
            return Err(TransferError::NotAvailable);
        }
        if self.dirty || self.param.is_empty() {
            self.param = self.members.iter().map(|m| m.id).collect();
            self.dirty = false;
        }
        for member in &mut self.members {
            member.reply = None;
        }
        self.raw.clear();
        bus.sync_read_tx(self.start_addr, self.data_len, &self.param)
    }

    /// Collect the aggregated reply block and demultiplex it per member.
    ///
    /// `Err(RxTimeout)` only when nothing arrived at all. A partial block
    /// returns `Ok(())` with the missing members simply unavailable;
    /// check [`all_received`](GroupRead::all_received).
    pub fn rx<P: Port>(&mut self, bus: &mut Bus<P>) -> Result<(), TransferError> {
        if self.members.is_empty() {
            return Err(TransferError::NotAvailable);
        }
        self.endian = bus.endian();
        self.raw = bus.sync_read_rx(self.data_len, self.members.len())?;
        self.demux();
        if !self.all_received() {
            let replied = self.members.iter().filter(|m| m.reply.is_some()).count();
            log::debug!(
                "group read at {}: {} of {} members replied",
                self.start_addr,
                replied,
                self.members.len()
            );
        }
        Ok(())
    }

    /// Run the whole aggregation: transmit, then receive and demultiplex.
    pub fn tx_rx<P: Port>(&mut self, bus: &mut Bus<P>) -> Result<(), TransferError> {
        self.tx(bus)?;
        self.rx(bus)
    }

    /// Whether every member produced a valid reply in the last
    /// transaction.
    pub fn all_received(&self) -> bool {
        self.members.iter().all(|m| m.reply.is_some())
    }

    /// Whether `len` bytes at `addr` are available for `id`: the member
    /// replied and the range lies inside the window.
    pub fn is_available(&self, id: u8, addr: u8, len: u8) -> bool {
        if addr < self.start_addr {
            return false;
        }
        let end = u16::from(addr) + u16::from(len);
        if end > u16::from(self.start_addr) + u16::from(self.data_len) {
            return false;
        }
        self.reply(id).is_some()
    }

    /// Fault flags reported by `id` in the last transaction.
    pub fn fault(&self, id: u8) -> Option<FaultFlags> {
        self.reply(id).map(|r| r.faults)
    }

    /// The full register window read from `id`.
    pub fn data(&self, id: u8) -> Option<&[u8]> {
        self.reply(id).map(|r| r.data.as_slice())
    }

    /// One register byte read from `id`.
    pub fn data_u8(&self, id: u8, addr: u8) -> Option<u8> {
        self.slice(id, addr, 1).map(|d| d[0])
    }

    /// A 16-bit value read from `id`, in the byte order the bus used.
    pub fn data_u16(&self, id: u8, addr: u8) -> Option<u16> {
        self.slice(id, addr, 2)
            .map(|d| word_from_bytes(d[0], d[1], self.endian))
    }

    /// A 32-bit value read from `id`, low word first.
    pub fn data_u32(&self, id: u8, addr: u8) -> Option<u32> {
        let endian = self.endian;
        self.slice(id, addr, 4)
            .map(|d| dword_from_bytes([d[0], d[1], d[2], d[3]], endian))
    }

    fn reply(&self, id: u8) -> Option<&Reply> {
        self.members
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.reply.as_ref())
    }

    fn slice(&self, id: u8, addr: u8, len: u8) -> Option<&[u8]> {
        if !self.is_available(id, addr, len) {
            return None;
        }
        let off = usize::from(addr - self.start_addr);
        self.data(id).map(|d| &d[off..off + usize::from(len)])
    }

    /// Scan the raw block once per member for a fully valid status record
    /// carrying that member's ID. Validation covers the header pair, the
    /// length field, the fault byte and the checksum; the first record
    /// that passes wins, so reply order does not matter.
    fn demux(&mut self) {
        let total = usize::from(self.data_len) + MIN_PACKET_LEN;
        for member in &mut self.members {
            member.reply = extract_record(&self.raw, member.id, total).map(|(faults, data)| Reply {
                faults: FaultFlags::from(faults),
                data,
            });
        }
    }
}

/// Find the first complete, checksum-valid status record for `id` in
/// `raw`. `total` is the full record size on the wire.
fn extract_record(raw: &[u8], id: u8, total: usize) -> Option<(u8, Vec<u8>)> {
    let data_len = total - MIN_PACKET_LEN;
    let mut at = 0usize;
    while at + total <= raw.len() {
        let record = &raw[at..at + total];
        if record[0] != HEADER_BYTE || record[1] != HEADER_BYTE || record[2] != id {
            at += 1;
            continue;
        }
        let sum = checksum(&record[2..total - 1]);
        if usize::from(record[3]) != data_len + 2
            || record[4] > MAX_STATUS_VALUE
            || sum != record[total - 1]
        {
            // Looked like our record but failed validation; resume the
            // scan one byte past this header.
            at += 1;
            continue;
        }
        return Some((record[4], record[5..total - 1].to_vec()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u8, fault: u8, data: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xFF, 0xFF, id, (data.len() + 2) as u8, fault];
        frame.extend_from_slice(data);
        frame.push(checksum(&frame[2..]));
        frame
    }

    #[test]
    fn test_extract_record_order_independent() {
        let mut raw = record(2, 0x00, &[0x10, 0x20]);
        raw.extend_from_slice(&record(1, 0x00, &[0x30, 0x40]));
        assert_eq!(extract_record(&raw, 1, 8), Some((0x00, vec![0x30, 0x40])));
        assert_eq!(extract_record(&raw, 2, 8), Some((0x00, vec![0x10, 0x20])));
        assert_eq!(extract_record(&raw, 3, 8), None);
    }

    #[test]
    fn test_extract_record_skips_corrupt_copy() {
        // First candidate for ID 1 has a broken checksum; a clean record
        // for the same ID later in the block must still be found.
        let mut bad = record(1, 0x00, &[0xAA, 0xBB]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        let mut raw = bad;
        raw.extend_from_slice(&record(1, 0x04, &[0xCC, 0xDD]));
        assert_eq!(extract_record(&raw, 1, 8), Some((0x04, vec![0xCC, 0xDD])));
    }

    #[test]
    fn test_extract_record_ignores_leading_garbage() {
        let mut raw = vec![0x00, 0xFF, 0x07];
        raw.extend_from_slice(&record(5, 0x00, &[0x01]));
        assert_eq!(extract_record(&raw, 5, 7), Some((0x00, vec![0x01])));
    }

    #[test]
    fn test_extract_record_rejects_truncated_tail() {
        let mut raw = record(9, 0x00, &[0x01, 0x02]);
        raw.truncate(raw.len() - 1);
        assert_eq!(extract_record(&raw, 9, 8), None);
    }

    #[test]
    fn test_membership_rules() {
        let mut group = GroupRead::new(56, 2);
        assert!(group.add(1));
        assert!(!group.add(1));
        assert!(!group.add(BROADCAST_ID));
        assert!(group.add(2));
        assert_eq!(group.len(), 2);
        group.remove(1);
        assert_eq!(group.len(), 1);
        group.clear();
        assert!(group.is_empty());
    }

    #[test]
    fn test_is_available_window_bounds() {
        let mut group = GroupRead::new(56, 4);
        group.add(1);
        group.members[0].reply = Some(Reply {
            faults: FaultFlags::NONE,
            data: vec![1, 2, 3, 4],
        });
        assert!(group.is_available(1, 56, 2));
        assert!(group.is_available(1, 58, 2));
        assert!(!group.is_available(1, 55, 2));
        assert!(!group.is_available(1, 59, 2));
        assert!(!group.is_available(2, 56, 2));
    }
}
