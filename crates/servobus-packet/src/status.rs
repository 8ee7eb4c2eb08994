//! Status packet types.
//!
//! Every status packet carries the responding device's address, a fault byte
//! and an optional parameter payload. Fault bits describe device-side
//! conditions (voltage, temperature, load, ...) and are reported alongside a
//! successful transfer; they never abort the transaction that carried them.

use crate::constants::{
    FAULT_ANGLE, FAULT_OVERCURRENT, FAULT_OVERHEAT, FAULT_OVERLOAD, FAULT_VOLTAGE,
};

/// Fault bits reported by a device in its status packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultFlags(u8);

impl FaultFlags {
    /// No faults reported.
    pub const NONE: FaultFlags = FaultFlags(0);

    /// Wrap a raw fault byte.
    pub fn new(bits: u8) -> Self {
        FaultFlags(bits)
    }

    /// Raw fault byte as received.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if any fault bit is set.
    pub fn any(self) -> bool {
        self.0 != 0
    }

    /// Supply voltage outside the configured limits.
    pub fn voltage(self) -> bool {
        self.0 & FAULT_VOLTAGE != 0
    }

    /// Position reading outside the configured angle limits.
    pub fn angle(self) -> bool {
        self.0 & FAULT_ANGLE != 0
    }

    /// Internal temperature above the configured limit.
    pub fn overheat(self) -> bool {
        self.0 & FAULT_OVERHEAT != 0
    }

    /// Phase current above the configured limit.
    pub fn overcurrent(self) -> bool {
        self.0 & FAULT_OVERCURRENT != 0
    }

    /// Output load above the configured limit.
    pub fn overload(self) -> bool {
        self.0 & FAULT_OVERLOAD != 0
    }
}

impl From<u8> for FaultFlags {
    fn from(bits: u8) -> Self {
        FaultFlags(bits)
    }
}

impl std::fmt::Display for FaultFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.any() {
            return write!(f, "none");
        }
        let mut first = true;
        let mut put = |f: &mut std::fmt::Formatter<'_>, name: &str| -> std::fmt::Result {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}", name)
        };
        if self.voltage() {
            put(f, "voltage")?;
        }
        if self.angle() {
            put(f, "angle")?;
        }
        if self.overheat() {
            put(f, "overheat")?;
        }
        if self.overcurrent() {
            put(f, "overcurrent")?;
        }
        if self.overload() {
            put(f, "overload")?;
        }
        Ok(())
    }
}

/// A decoded status packet from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    /// Address of the responding device.
    pub id: u8,
    /// Fault bits reported by the device.
    pub faults: FaultFlags,
    /// Parameter payload, empty for plain acknowledgements.
    pub params: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_predicates() {
        let faults = FaultFlags::new(FAULT_VOLTAGE | FAULT_OVERLOAD);
        assert!(faults.any());
        assert!(faults.voltage());
        assert!(faults.overload());
        assert!(!faults.overheat());
        assert!(!faults.angle());
        assert!(!faults.overcurrent());
        assert!(!FaultFlags::NONE.any());
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(FaultFlags::NONE.to_string(), "none");
        assert_eq!(FaultFlags::new(FAULT_OVERHEAT).to_string(), "overheat");
        assert_eq!(
            FaultFlags::new(FAULT_VOLTAGE | FAULT_OVERCURRENT).to_string(),
            "voltage, overcurrent"
        );
    }
}
